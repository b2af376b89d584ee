//! Error types for the assembler.
//!
//! Leaf errors (`ExpressionError`, `InstructionError`) carry no position; the
//! parser and the generation pass wrap them into `AsmError` together with the
//! line of the offending statement.

use crate::opcode::{Opcode, OperandShape};
use std::path::PathBuf;
use thiserror::Error;

/// Failure while evaluating an expression or binding an identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    #[error("identifier '{0}' not found")]
    UndefinedIdentifier(String),

    #[error("identifier '{0}' is already defined")]
    AlreadyDefined(String),

    #[error("value {0} does not fit into a 16-bit word")]
    OutOfRange(i64),
}

/// Operand combination rejected by the instruction builder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstructionError {
    #[error("{opcode} expects operands '{expected}', found '{found}'")]
    OperandMismatch {
        opcode: Opcode,
        expected: OperandShape,
        found: OperandShape,
    },

    #[error("{0} requires an immediate value")]
    MissingImmediate(Opcode),

    #[error("{0} does not take an immediate value")]
    UnexpectedImmediate(Opcode),
}

/// Main error type of an assembly run.
#[derive(Error, Debug)]
pub enum AsmError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: {source}")]
    Expression {
        line: usize,
        #[source]
        source: ExpressionError,
    },

    #[error("line {line}: {source}")]
    Instruction {
        line: usize,
        #[source]
        source: InstructionError,
    },

    #[error("non-monotonic address: {address:#06x} is below already written {reached:#06x}")]
    NonMonotonicAddress { address: u32, reached: u32 },

    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write error: {0}")]
    Write(#[from] std::io::Error),
}

impl AsmError {
    /// Create a syntax error.
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        AsmError::Syntax {
            line,
            message: message.into(),
        }
    }

    /// Wrap an expression error with the line it belongs to.
    pub fn expression(line: usize, source: ExpressionError) -> Self {
        AsmError::Expression { line, source }
    }

    /// Wrap an instruction error with the line it belongs to.
    pub fn instruction(line: usize, source: InstructionError) -> Self {
        AsmError::Instruction { line, source }
    }

    /// Create an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AsmError::Io {
            path: path.into(),
            source,
        }
    }

    /// Source line of this error, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            AsmError::Syntax { line, .. }
            | AsmError::Expression { line, .. }
            | AsmError::Instruction { line, .. } => Some(*line),
            AsmError::NonMonotonicAddress { .. } | AsmError::Io { .. } | AsmError::Write(_) => {
                None
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, AsmError>;
