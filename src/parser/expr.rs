//! Expression grammar.
//!
//! ```text
//! expression := and   ( "or"  and   )*
//! and        := xor   ( "and" xor   )*
//! xor        := sum   ( "xor" sum   )*
//! sum        := prod  ( ("+" | "-") prod )*
//! prod       := unary ( "*" unary )*
//! unary      := ("-" | "~") unary | primary
//! primary    := number | identifier | "(" expression ")"
//! ```

use super::{Parser, is_identifier};
use crate::error::{AsmError, Result};
use crate::expression::{Expression, Operation};
use crate::tokenizer::Token;

/// Maximum nesting of parentheses and unary operators. Deeper input is
/// rejected instead of overflowing the stack.
const MAX_DEPTH: usize = 64;

/// Maximum number of binary operators in one expression. Operator chains
/// build a left-leaning tree, so this bounds its depth as well.
const MAX_OPERATORS: usize = 256;

/// Parse a numeric literal: `0x` hex, `0b` binary, otherwise decimal.
pub fn parse_integer(word: &str, line: usize) -> Result<i64> {
    let lower = word.to_ascii_lowercase();
    let (digits, radix) = if let Some(hex) = lower.strip_prefix("0x") {
        (hex, 16)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        (bin, 2)
    } else {
        (lower.as_str(), 10)
    };

    let malformed = || AsmError::syntax(line, format!("malformed number '{}'", word));
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(malformed());
    }
    i64::from_str_radix(digits, radix).map_err(|_| malformed())
}

impl Parser {
    /// Parse an expression without evaluating it.
    pub fn parse_expression(&mut self) -> Result<Expression> {
        if self.depth == 0 {
            self.operators = 0;
        }
        let mut left = self.parse_and()?;
        while self.is_next_word("or") {
            let right = self.parse_and()?;
            left = self.binary(Operation::Or, left, right)?;
        }
        Ok(left)
    }

    fn binary(
        &mut self,
        op: Operation,
        left: Expression,
        right: Expression,
    ) -> Result<Expression> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(self.error("expression nested too deeply"));
        }
        Ok(Expression::binary(op, left, right))
    }

    fn parse_and(&mut self) -> Result<Expression> {
        let mut left = self.parse_xor()?;
        while self.is_next_word("and") {
            let right = self.parse_xor()?;
            left = self.binary(Operation::And, left, right)?;
        }
        Ok(left)
    }

    fn parse_xor(&mut self) -> Result<Expression> {
        let mut left = self.parse_sum()?;
        while self.is_next_word("xor") {
            let right = self.parse_sum()?;
            left = self.binary(Operation::Xor, left, right)?;
        }
        Ok(left)
    }

    fn parse_sum(&mut self) -> Result<Expression> {
        let mut left = self.parse_product()?;
        loop {
            let op = if self.is_next('+') {
                Operation::Add
            } else if self.is_next('-') {
                Operation::Sub
            } else {
                return Ok(left);
            };
            let right = self.parse_product()?;
            left = self.binary(op, left, right)?;
        }
    }

    fn parse_product(&mut self) -> Result<Expression> {
        let mut left = self.parse_unary()?;
        while self.is_next('*') {
            let right = self.parse_unary()?;
            left = self.binary(Operation::Mul, left, right)?;
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        self.depth += 1;
        let result = if self.depth > MAX_DEPTH {
            Err(self.error("expression nested too deeply"))
        } else {
            self.parse_unary_inner()
        };
        self.depth -= 1;
        result
    }

    fn parse_unary_inner(&mut self) -> Result<Expression> {
        match self.next_token() {
            Token::Char('-') => Ok(Expression::Negate(Box::new(self.parse_unary()?))),
            Token::Char('~') => Ok(Expression::Complement(Box::new(self.parse_unary()?))),
            Token::Char('(') => {
                let inner = self.parse_expression()?;
                self.consume(')')?;
                Ok(inner)
            }
            Token::Word(word) if word.starts_with(|c: char| c.is_ascii_digit()) => {
                Ok(Expression::Constant(parse_integer(&word, self.line())?))
            }
            Token::Word(word) if is_identifier(&word) => Ok(Expression::Identifier(word)),
            token => Err(self.error(format!("expected expression, found {}", token))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    fn eval(source: &str) -> i64 {
        let expression = Parser::new(source).parse_expression().unwrap();
        expression.evaluate(&Context::new()).unwrap()
    }

    fn parse_error(source: &str) -> AsmError {
        Parser::new(source).parse_expression().unwrap_err()
    }

    #[test]
    fn test_literals() {
        assert_eq!(eval("42"), 42);
        assert_eq!(eval("0x1F"), 31);
        assert_eq!(eval("0XfF"), 255);
        assert_eq!(eval("0b101"), 5);
        assert_eq!(eval("0B11"), 3);
    }

    #[test]
    fn test_malformed_literals() {
        for literal in ["1f", "0x", "0b12", "0xg", "12_3"] {
            let err = parse_error(literal);
            assert!(
                err.to_string().contains("malformed number"),
                "{literal}: {err}"
            );
        }
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("2 + 3 * 4"), 14);
        assert_eq!(eval("(2 + 3) * 4"), 20);
        assert_eq!(eval("10 - 4 - 3"), 3);
        assert_eq!(eval("1 or 6 and 3"), 3);
        assert_eq!(eval("12 and 10 xor 6"), 12 & (10 ^ 6));
        assert_eq!(eval("1 + 1 XOR 3"), 1);
        assert_eq!(eval("-2 * 3"), -6);
        assert_eq!(eval("~0"), -1);
        assert_eq!(eval("- -5"), 5);
    }

    #[test]
    fn test_tree_shape() {
        let expression = Parser::new("a + b * c").parse_expression().unwrap();
        assert_eq!(expression.to_string(), "(a + (b * c))");
    }

    #[test]
    fn test_identifiers_are_not_evaluated() {
        let expression = Parser::new("later + 1").parse_expression().unwrap();
        let mut context = Context::new();
        assert!(expression.evaluate(&context).is_err());
        context.define("later", 9).unwrap();
        assert_eq!(expression.evaluate(&context), Ok(10));
    }

    #[test]
    fn test_const_folding() {
        let program = Parser::new(".const X 2+3*4\n.const Y X+1\nldi r0, Y")
            .parse_program()
            .unwrap();
        assert_eq!(program.context().get("X"), Ok(14));
        assert_eq!(program.context().get("Y"), Ok(15));
    }

    #[test]
    fn test_missing_operand() {
        assert!(
            parse_error("1 +")
                .to_string()
                .contains("expected expression")
        );
        assert!(parse_error("(1 + 2").to_string().contains("expected ')'"));
    }

    #[test]
    fn test_nesting_limit() {
        let shallow = format!("{}1{}", "(".repeat(20), ")".repeat(20));
        assert_eq!(eval(&shallow), 1);

        let deep = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert!(parse_error(&deep).to_string().contains("nested too deeply"));

        let unary = format!("{}1", "-".repeat(200));
        assert!(parse_error(&unary).to_string().contains("nested too deeply"));
    }

    #[test]
    fn test_operator_chain_limit() {
        let chain = |n: usize| vec!["1"; n].join("+");
        assert_eq!(eval(&chain(200)), 200);

        let err = parse_error(&chain(5000));
        assert!(err.to_string().contains("nested too deeply"));

        // the budget covers the whole operand, parentheses included
        let grouped = format!("({}) * ({})", chain(200), chain(200));
        assert!(parse_error(&grouped).to_string().contains("nested too deeply"));
    }

    #[test]
    fn test_operator_budget_is_per_expression() {
        let source = format!(
            ".const A {}\n.const B A + {}\nldi r0, B",
            vec!["1"; 200].join("+"),
            vec!["1"; 200].join("+")
        );
        let program = Parser::new(&source).parse_program().unwrap();
        assert_eq!(program.context().get("B"), Ok(400));
    }
}
