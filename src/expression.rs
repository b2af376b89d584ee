//! Immutable expression trees and their evaluation.

use crate::context::Context;
use crate::error::ExpressionError;
use std::fmt;

/// Binary operators, in the order of increasing binding strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Or,
    And,
    Xor,
    Add,
    Sub,
    Mul,
}

impl Operation {
    fn apply(self, a: i64, b: i64) -> i64 {
        match self {
            Operation::Or => a | b,
            Operation::And => a & b,
            Operation::Xor => a ^ b,
            Operation::Add => a.wrapping_add(b),
            Operation::Sub => a.wrapping_sub(b),
            Operation::Mul => a.wrapping_mul(b),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Or => "or",
            Operation::And => "and",
            Operation::Xor => "xor",
            Operation::Add => "+",
            Operation::Sub => "-",
            Operation::Mul => "*",
        }
    }
}

/// Value-producing expression node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Constant(i64),
    Identifier(String),
    Negate(Box<Expression>),
    Complement(Box<Expression>),
    Binary {
        op: Operation,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

impl Expression {
    pub fn constant(value: i64) -> Self {
        Expression::Constant(value)
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Expression::Identifier(name.into())
    }

    pub fn binary(op: Operation, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Evaluate against the given context.
    pub fn evaluate(&self, context: &Context) -> Result<i64, ExpressionError> {
        match self {
            Expression::Constant(value) => Ok(*value),
            Expression::Identifier(name) => context.get(name),
            Expression::Negate(inner) => Ok(inner.evaluate(context)?.wrapping_neg()),
            Expression::Complement(inner) => Ok(!inner.evaluate(context)?),
            Expression::Binary { op, left, right } => {
                Ok(op.apply(left.evaluate(context)?, right.evaluate(context)?))
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(value) => write!(f, "{}", value),
            Expression::Identifier(name) => f.write_str(name),
            Expression::Negate(inner) => write!(f, "-{}", inner),
            Expression::Complement(inner) => write!(f, "~{}", inner),
            Expression::Binary { op, left, right } => {
                write!(f, "({} {} {})", left, op.as_str(), right)
            }
        }
    }
}

/// Convert an evaluated value into a 16-bit machine word.
///
/// Accepts both the signed and the unsigned 16-bit range.
pub fn to_word(value: i64) -> Result<u16, ExpressionError> {
    if (-0x8000..=0xffff).contains(&value) {
        Ok(value as u16)
    } else {
        Err(ExpressionError::OutOfRange(value))
    }
}
