//! Validated instructions and their machine encoding.
//!
//! Bit layout, identical for every opcode:
//!
//! ```text
//! word 0:  15..8 opcode   7..4 dest register   3..0 source register
//! word 1:  immediate (only if the opcode requires one)
//! ```
//!
//! Unused register fields are zero. Relative immediates store the target
//! minus the address of the instruction itself.

use crate::codegen::WordListener;
use crate::context::Context;
use crate::error::{AsmError, InstructionError, Result};
use crate::expression::{Expression, to_word};
use crate::opcode::{ImmediateMode, Opcode, OperandShape};
use crate::register::Register;
use std::fmt;

/// Register operands, one variant per operand shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operands {
    None,
    Dest(Register),
    DestSource { dest: Register, source: Register },
}

impl Operands {
    pub fn shape(&self) -> OperandShape {
        match self {
            Operands::None => OperandShape::None,
            Operands::Dest(_) => OperandShape::Dest,
            Operands::DestSource { .. } => OperandShape::DestSource,
        }
    }

    /// (dest, source) register fields.
    fn fields(&self) -> (u16, u16) {
        match self {
            Operands::None => (0, 0),
            Operands::Dest(dest) => (dest.index(), 0),
            Operands::DestSource { dest, source } => (dest.index(), source.index()),
        }
    }
}

/// A primitive instruction whose operands match its opcode.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    opcode: Opcode,
    operands: Operands,
    immediate: Option<Expression>,
    line: usize,
    description: Option<String>,
}

impl Instruction {
    pub fn builder(opcode: Opcode) -> InstructionBuilder {
        InstructionBuilder::new(opcode)
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn operands(&self) -> Operands {
        self.operands
    }

    pub fn immediate(&self) -> Option<&Expression> {
        self.immediate.as_ref()
    }

    /// Source line, 0 if unknown.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Description of the macro this instruction was expanded from.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub(crate) fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Number of machine words this instruction occupies.
    #[inline]
    pub fn word_count(&self) -> u32 {
        self.opcode.word_count()
    }

    /// Deliver the machine words of this instruction to `listener`.
    ///
    /// The immediate is evaluated now, against `context`, whose current
    /// instruction address must be the address of this instruction.
    pub fn encode<L>(&self, context: &Context, listener: &mut L) -> Result<()>
    where
        L: WordListener + ?Sized,
    {
        let (dest, source) = self.operands.fields();
        listener.accept((u16::from(self.opcode.number()) << 8) | (dest << 4) | source)?;

        if let Some(immediate) = &self.immediate {
            let value = immediate
                .evaluate(context)
                .map_err(|e| AsmError::expression(self.line, e))?;
            let value = match self.opcode.immediate() {
                ImmediateMode::Relative => value.wrapping_sub(i64::from(context.instr_addr())),
                ImmediateMode::Absolute | ImmediateMode::None => value,
            };
            let word = to_word(value).map_err(|e| AsmError::expression(self.line, e))?;
            listener.accept(word)?;
        }
        Ok(())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        match self.operands {
            Operands::None => {}
            Operands::Dest(dest) => write!(f, " {}", dest)?,
            Operands::DestSource { dest, source } => write!(f, " {}, {}", dest, source)?,
        }
        if let Some(immediate) = &self.immediate {
            let separator = if self.operands == Operands::None { " " } else { ", " };
            write!(f, "{}{}", separator, immediate)?;
        }
        Ok(())
    }
}

/// Collects operands and checks them against the opcode's declared shape.
#[derive(Debug, Clone)]
pub struct InstructionBuilder {
    opcode: Opcode,
    dest: Option<Register>,
    source: Option<Register>,
    immediate: Option<Expression>,
    line: usize,
}

impl InstructionBuilder {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            dest: None,
            source: None,
            immediate: None,
            line: 0,
        }
    }

    pub fn dest(mut self, register: Register) -> Self {
        self.dest = Some(register);
        self
    }

    pub fn source(mut self, register: Register) -> Self {
        self.source = Some(register);
        self
    }

    pub fn immediate(mut self, expression: Expression) -> Self {
        self.immediate = Some(expression);
        self
    }

    pub fn constant(self, value: i64) -> Self {
        self.immediate(Expression::constant(value))
    }

    pub fn line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    pub fn build(self) -> std::result::Result<Instruction, InstructionError> {
        let opcode = self.opcode;
        let operands = match (opcode.shape(), self.dest, self.source) {
            (OperandShape::None, None, None) => Operands::None,
            (OperandShape::Dest, Some(dest), None) => Operands::Dest(dest),
            (OperandShape::DestSource, Some(dest), Some(source)) => {
                Operands::DestSource { dest, source }
            }
            (expected, dest, source) => {
                let found = match (dest, source) {
                    (None, None) => OperandShape::None,
                    (Some(_), Some(_)) => OperandShape::DestSource,
                    _ => OperandShape::Dest,
                };
                return Err(InstructionError::OperandMismatch {
                    opcode,
                    expected,
                    found,
                });
            }
        };

        match (opcode.immediate().is_required(), self.immediate.is_some()) {
            (true, false) => return Err(InstructionError::MissingImmediate(opcode)),
            (false, true) => return Err(InstructionError::UnexpectedImmediate(opcode)),
            _ => {}
        }

        Ok(Instruction {
            opcode,
            operands,
            immediate: self.immediate,
            line: self.line,
            description: None,
        })
    }
}
