use crate::error::ExpressionError;
use std::collections::HashMap;

/// Symbol environment of one assembly run.
///
/// Holds every identifier bound so far (labels, constants, RAM names) and the
/// address of the instruction currently being encoded.
#[derive(Debug, Clone, Default)]
pub struct Context {
    identifiers: HashMap<String, i64>,
    instr_addr: u32,
}

impl Context {
    pub fn new() -> Self {
        Self {
            identifiers: HashMap::with_capacity(64),
            instr_addr: 0,
        }
    }

    /// Bind `name` to `value`. Identifiers are never rebound.
    pub fn define(&mut self, name: &str, value: i64) -> Result<(), ExpressionError> {
        if self.identifiers.contains_key(name) {
            return Err(ExpressionError::AlreadyDefined(name.to_string()));
        }
        self.identifiers.insert(name.to_string(), value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<i64, ExpressionError> {
        self.identifiers
            .get(name)
            .copied()
            .ok_or_else(|| ExpressionError::UndefinedIdentifier(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.identifiers.contains_key(name)
    }

    /// Address of the instruction currently being generated.
    #[inline]
    pub fn instr_addr(&self) -> u32 {
        self.instr_addr
    }

    #[inline]
    pub fn set_instr_addr(&mut self, addr: u32) {
        self.instr_addr = addr;
    }

    /// All identifiers sorted by name.
    pub fn symbols(&self) -> Vec<(&str, i64)> {
        let mut symbols: Vec<_> = self
            .identifiers
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
            .collect();
        symbols.sort_unstable_by(|a, b| a.0.cmp(b.0));
        symbols
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_get() {
        let mut context = Context::new();
        assert!(context.define("LOOP", 10).is_ok());
        assert_eq!(context.get("LOOP"), Ok(10));
        assert!(context.contains("LOOP"));
        assert!(!context.contains("loop"));
    }

    #[test]
    fn test_no_rebinding() {
        let mut context = Context::new();
        context.define("x", 1).unwrap();
        assert_eq!(
            context.define("x", 2),
            Err(ExpressionError::AlreadyDefined("x".to_string()))
        );
        assert_eq!(
            context.define("x", 1),
            Err(ExpressionError::AlreadyDefined("x".to_string()))
        );
        assert_eq!(context.get("x"), Ok(1));
    }

    #[test]
    fn test_undefined() {
        let context = Context::new();
        assert_eq!(
            context.get("missing"),
            Err(ExpressionError::UndefinedIdentifier("missing".to_string()))
        );
    }

    #[test]
    fn test_symbols_sorted() {
        let mut context = Context::new();
        context.define("b", 2).unwrap();
        context.define("a", 1).unwrap();
        context.define("c", 3).unwrap();
        assert_eq!(context.symbols(), vec![("a", 1), ("b", 2), ("c", 3)]);
        assert_eq!(context.len(), 3);
    }
}
