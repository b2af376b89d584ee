//! Line-oriented parser: turns source text into a [`ResolvedProgram`].
//!
//! Each statement is `[label:] (mnemonic operands | .meta operands) [; comment]`.
//! Mnemonics are looked up as primitive opcodes first and as registered macros
//! second. The operand methods (`parse_reg`, `consume`, `parse_expression`, ...)
//! are public so macros can read their own arguments.

mod expr;

pub use expr::parse_integer;

use crate::error::{AsmError, Result};
use crate::expression::to_word;
use crate::instruction::Instruction;
use crate::macros::{Macro, default_macros};
use crate::opcode::{Opcode, OperandShape};
use crate::program::{Program, ResolvedProgram};
use crate::register::Register;
use crate::tokenizer::{Token, Tokenizer};
use std::rc::Rc;
use tracing::trace;

/// Recursive descent parser with a per-instance macro registry.
pub struct Parser {
    tokens: Tokenizer,
    macros: Vec<Rc<dyn Macro>>,
    ram_base: u32,
    depth: usize,
    operators: usize,
}

/// Labels and identifiers start with a letter or `_`.
fn is_identifier(word: &str) -> bool {
    word.chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
}

impl Parser {
    /// Parser with the built-in macros registered.
    pub fn new(source: &str) -> Self {
        Self {
            tokens: Tokenizer::new(source),
            macros: default_macros(),
            ram_base: 0,
            depth: 0,
            operators: 0,
        }
    }

    /// Parser that only knows the primitive opcodes.
    pub fn without_macros(source: &str) -> Self {
        Self {
            macros: Vec::new(),
            ..Self::new(source)
        }
    }

    /// First RAM address handed out by `.word`, `.long` and `.data`.
    pub fn with_ram_base(mut self, ram_base: u32) -> Self {
        self.ram_base = ram_base;
        self
    }

    /// Register a macro. Macros registered earlier win on name clashes, and
    /// primitive opcodes always win over macros.
    pub fn add_macro(&mut self, m: impl Macro + 'static) {
        self.macros.push(Rc::new(m));
    }

    pub fn macros(&self) -> &[Rc<dyn Macro>] {
        &self.macros
    }

    fn find_macro(&self, name: &str) -> Option<Rc<dyn Macro>> {
        self.macros
            .iter()
            .find(|m| m.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Parse the whole input (first pass).
    pub fn parse_program(mut self) -> Result<ResolvedProgram> {
        let mut program = Program::with_ram_base(self.ram_base);

        loop {
            match self.next_token() {
                Token::Word(word) => {
                    self.parse_statement(&mut program, word)?;
                    self.end_of_statement()?;
                }
                Token::Eol => {}
                Token::Eof => break,
                token => return Err(self.error(format!("unexpected {}", token))),
            }
        }

        program.freeze()
    }

    fn end_of_statement(&mut self) -> Result<()> {
        match self.next_token() {
            Token::Eol | Token::Eof => Ok(()),
            token => Err(self.error(format!("expected end of line, found {}", token))),
        }
    }

    fn parse_statement(&mut self, program: &mut Program, word: String) -> Result<()> {
        if word.starts_with('.') {
            return self.parse_meta_command(program, &word);
        }

        let mut mnemonic = word;
        if Opcode::from_mnemonic(&mnemonic).is_none() && self.find_macro(&mnemonic).is_none() {
            let line = self.line();
            if !self.is_next(':') {
                return Err(self.error(format!("unknown mnemonic '{}'", mnemonic)));
            }
            if !is_identifier(&mnemonic) {
                return Err(self.error(format!("'{}' is not a valid label", mnemonic)));
            }
            program.set_pending_label(mnemonic, line);

            match self.next_token() {
                Token::Word(next) if next.starts_with('.') => {
                    return Err(self.error("meta command can not be labeled"));
                }
                Token::Word(next) => mnemonic = next,
                Token::Eol | Token::Eof => {
                    self.push_back();
                    return Ok(());
                }
                token => return Err(self.error(format!("expected mnemonic, found {}", token))),
            }
        }

        if let Some(opcode) = Opcode::from_mnemonic(&mnemonic) {
            self.parse_instruction(program, opcode)
        } else if let Some(m) = self.find_macro(&mnemonic) {
            trace!(name = m.name(), line = self.line(), "expanding macro");
            let result = m.parse_macro(program, self);
            // a description never outlives its own expansion
            program.clear_pending_macro_description();
            result
        } else {
            Err(self.error(format!("unknown mnemonic '{}'", mnemonic)))
        }
    }

    fn parse_meta_command(&mut self, program: &mut Program, command: &str) -> Result<()> {
        let line = self.line();
        match command.to_ascii_lowercase().as_str() {
            ".word" => {
                let name = self.parse_identifier()?;
                program.add_ram(&name, 1, line)?;
            }
            ".long" => {
                let name = self.parse_identifier()?;
                program.add_ram(&name, 2, line)?;
            }
            ".const" => {
                let name = self.parse_identifier()?;
                let value = self
                    .parse_expression()?
                    .evaluate(program.context())
                    .map_err(|e| AsmError::expression(line, e))?;
                program.define_constant(&name, value, line)?;
            }
            ".data" => {
                let name = self.parse_identifier()?;
                let mut values = Vec::new();
                loop {
                    let value = self
                        .parse_expression()?
                        .evaluate(program.context())
                        .and_then(to_word)
                        .map_err(|e| AsmError::expression(self.line(), e))?;
                    values.push(value);
                    if !self.is_next(',') {
                        break;
                    }
                    // the list may continue on the next line
                    while self.next_token() == Token::Eol {}
                    self.push_back();
                }
                program.add_data(&name, &values, line)?;
            }
            _ => return Err(self.error(format!("unknown meta command '{}'", command))),
        }
        Ok(())
    }

    fn parse_instruction(&mut self, program: &mut Program, opcode: Opcode) -> Result<()> {
        let line = self.line();
        let mut builder = Instruction::builder(opcode).line(line);

        let registers = match opcode.shape() {
            OperandShape::None => false,
            OperandShape::Dest => {
                builder = builder.dest(self.parse_reg()?);
                true
            }
            OperandShape::DestSource => {
                builder = builder.dest(self.parse_reg()?);
                self.consume(',')?;
                builder = builder.source(self.parse_reg()?);
                true
            }
        };

        if opcode.immediate().is_required() {
            if registers {
                self.consume(',')?;
            }
            builder = builder.immediate(self.parse_expression()?);
        }

        let instruction = builder
            .build()
            .map_err(|e| AsmError::instruction(line, e))?;
        program.add(instruction)
    }

    // ------------------------------------------------------------------
    // Operand API, shared with macros
    // ------------------------------------------------------------------

    /// Line of the most recently read token.
    pub fn line(&self) -> usize {
        self.tokens.line()
    }

    pub fn next_token(&mut self) -> Token {
        self.tokens.next_token()
    }

    /// Un-read the last token.
    pub fn push_back(&mut self) {
        self.tokens.push_back();
    }

    /// Syntax error at the current line.
    pub fn error(&self, message: impl Into<String>) -> AsmError {
        AsmError::syntax(self.line(), message)
    }

    /// Read the character `c` or fail.
    pub fn consume(&mut self, c: char) -> Result<()> {
        match self.next_token() {
            Token::Char(found) if found == c => Ok(()),
            token => Err(self.error(format!("expected '{}', found {}", c, token))),
        }
    }

    /// Consume `c` if it is the next token.
    pub fn is_next(&mut self, c: char) -> bool {
        if self.next_token() == Token::Char(c) {
            true
        } else {
            self.push_back();
            false
        }
    }

    /// Consume the word `word` (ignoring case) if it is the next token.
    pub fn is_next_word(&mut self, word: &str) -> bool {
        match self.next_token() {
            Token::Word(found) if found.eq_ignore_ascii_case(word) => true,
            _ => {
                self.push_back();
                false
            }
        }
    }

    pub fn parse_word(&mut self) -> Result<String> {
        match self.next_token() {
            Token::Word(word) => Ok(word),
            token => Err(self.error(format!("expected word, found {}", token))),
        }
    }

    /// A word usable as a label or constant name.
    pub fn parse_identifier(&mut self) -> Result<String> {
        let word = self.parse_word()?;
        if is_identifier(&word) {
            Ok(word)
        } else {
            Err(self.error(format!("'{}' is not a valid identifier", word)))
        }
    }

    pub fn parse_reg(&mut self) -> Result<Register> {
        match self.next_token() {
            Token::Word(word) => Register::parse_register(&word)
                .ok_or_else(|| self.error(format!("expected register, found '{}'", word))),
            token => Err(self.error(format!("expected register, found {}", token))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::HexCodeGen;
    use crate::error::ExpressionError;
    use crate::macros::MacroArguments;
    use crate::program::ResolvedProgram;

    fn parse(source: &str) -> ResolvedProgram {
        Parser::new(source).parse_program().unwrap()
    }

    fn parse_err(source: &str) -> AsmError {
        Parser::new(source).parse_program().unwrap_err()
    }

    fn rendered(program: &ResolvedProgram) -> Vec<String> {
        program
            .instructions()
            .iter()
            .map(|slot| slot.instruction.to_string())
            .collect()
    }

    #[test]
    fn test_all_shapes() {
        let program = parse("nop\nlsl r7\nmov r3, sp\nldi r1, 5\nld r0, bp\njmp 0\n");
        assert_eq!(
            rendered(&program),
            vec!["NOP", "LSL R7", "MOV R3, SP", "LDI R1, 5", "LD R0, BP", "JMP 0"]
        );
    }

    #[test]
    fn test_mnemonics_are_case_insensitive() {
        let program = parse("NoP\nLdI R1, 1");
        assert_eq!(rendered(&program), vec!["NOP", "LDI R1, 1"]);
    }

    #[test]
    fn test_labels() {
        let program = parse("start: nop\n\nfirst:\nsecond: ; comment\n  ldi r0, start\n");
        let context = program.context();
        assert_eq!(context.get("start"), Ok(0));
        assert_eq!(context.get("first"), Ok(1));
        assert_eq!(context.get("second"), Ok(1));
    }

    #[test]
    fn test_labels_are_case_sensitive() {
        let program = parse("Loop: nop\nloop: nop");
        assert_eq!(program.context().get("Loop"), Ok(0));
        assert_eq!(program.context().get("loop"), Ok(1));
    }

    #[test]
    fn test_unknown_mnemonic() {
        let err = parse_err("nop\nfoo r1");
        assert_eq!(err.line(), Some(2));
        assert!(err.to_string().contains("unknown mnemonic 'foo'"));

        let err = parse_err("here: foo r1");
        assert!(err.to_string().contains("unknown mnemonic 'foo'"));
    }

    #[test]
    fn test_invalid_label() {
        let err = parse_err("1abc: nop");
        assert!(err.to_string().contains("not a valid label"));
    }

    #[test]
    fn test_labeled_meta_command() {
        let err = parse_err("x: .word y");
        assert!(err.to_string().contains("meta command can not be labeled"));
    }

    #[test]
    fn test_duplicate_label() {
        let err = parse_err("a: nop\na: nop");
        assert!(matches!(
            err,
            AsmError::Expression {
                line: 2,
                source: ExpressionError::AlreadyDefined(_)
            }
        ));
    }

    #[test]
    fn test_trailing_label_fails() {
        let err = parse_err("nop\nend:\n");
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn test_operand_errors() {
        assert!(parse_err("mov r1 r2").to_string().contains("expected ','"));
        assert!(parse_err("ldi r1").to_string().contains("expected ','"));
        assert!(parse_err("lsl 5").to_string().contains("expected register"));
        assert!(parse_err("mov r1, r16").to_string().contains("expected register"));
        assert!(
            parse_err("nop r1")
                .to_string()
                .contains("expected end of line")
        );
    }

    #[test]
    fn test_meta_commands() {
        let program = Parser::new(
            ".word a\n.LONG b\n.const k 7\n.data table 1, k,\n   0xffff, -1\n.word c\nnop",
        )
        .with_ram_base(0x20)
        .parse_program()
        .unwrap();
        let context = program.context();
        assert_eq!(context.get("a"), Ok(0x20));
        assert_eq!(context.get("b"), Ok(0x21));
        assert_eq!(context.get("k"), Ok(7));
        assert_eq!(context.get("table"), Ok(0x23));
        assert_eq!(context.get("c"), Ok(0x27));

        let values: Vec<u16> = program.data().iter().map(|d| d.value).collect();
        assert_eq!(values, vec![1, 7, 0xffff, 0xffff]);
        assert_eq!(program.instructions()[0].address, 0);
    }

    #[test]
    fn test_unknown_meta_command() {
        let err = parse_err(".org 10");
        assert!(err.to_string().contains("unknown meta command"));
    }

    #[test]
    fn test_const_must_be_known() {
        let err = parse_err(".const a later\nlater: nop");
        assert!(matches!(
            err,
            AsmError::Expression {
                line: 1,
                source: ExpressionError::UndefinedIdentifier(_)
            }
        ));
    }

    #[test]
    fn test_data_value_out_of_range() {
        let err = parse_err(".data d 1, 0x10000");
        assert!(matches!(
            err,
            AsmError::Expression {
                source: ExpressionError::OutOfRange(0x10000),
                ..
            }
        ));
    }

    #[test]
    fn test_without_macros() {
        let err = Parser::without_macros("inc r1").parse_program().unwrap_err();
        assert!(err.to_string().contains("unknown mnemonic 'inc'"));
    }

    struct Twice;

    impl Macro for Twice {
        fn name(&self) -> &'static str {
            "TWICE"
        }

        fn arguments(&self) -> MacroArguments {
            MacroArguments::Dest
        }

        fn description(&self) -> &'static str {
            "doubles a register"
        }

        fn parse_macro(&self, program: &mut Program, parser: &mut Parser) -> Result<()> {
            let line = parser.line();
            let reg = parser.parse_reg()?;
            crate::macros::emit(
                program,
                Instruction::builder(Opcode::Add).dest(reg).source(reg),
                line,
            )
        }
    }

    /// Shadows the NOP opcode; must never be used.
    struct FakeNop;

    impl Macro for FakeNop {
        fn name(&self) -> &'static str {
            "NOP"
        }

        fn arguments(&self) -> MacroArguments {
            MacroArguments::None
        }

        fn description(&self) -> &'static str {
            "never expanded"
        }

        fn parse_macro(&self, _program: &mut Program, parser: &mut Parser) -> Result<()> {
            Err(parser.error("macro shadowed an opcode"))
        }
    }

    #[test]
    fn test_custom_macro() {
        let mut parser = Parser::without_macros("twice r4\nnop");
        parser.add_macro(Twice);
        parser.add_macro(FakeNop);
        assert_eq!(parser.macros().len(), 2);

        let program = parser.parse_program().unwrap();
        assert_eq!(rendered(&program), vec!["ADD R4, R4", "NOP"]);

        // the shadowed mnemonic still encodes as the opcode
        let mut codegen = HexCodeGen::hex();
        codegen.run(&program).unwrap();
        assert_eq!(codegen.visitor().address(), 2);
        let image = String::from_utf8(codegen.into_inner().finish().unwrap()).unwrap();
        assert_eq!(image, "v2.0 raw\n244\n0\n");
    }

    /// Describes itself but emits nothing.
    struct Marker;

    impl Macro for Marker {
        fn name(&self) -> &'static str {
            "MARK"
        }

        fn arguments(&self) -> MacroArguments {
            MacroArguments::None
        }

        fn description(&self) -> &'static str {
            "expands to nothing"
        }

        fn parse_macro(&self, program: &mut Program, _parser: &mut Parser) -> Result<()> {
            program.set_pending_macro_description("MARK");
            Ok(())
        }
    }

    #[test]
    fn test_empty_expansion_leaves_no_description() {
        let mut parser = Parser::new("mark
nop
inc r0");
        parser.add_macro(Marker);

        let program = parser.parse_program().unwrap();
        let slots = program.instructions();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].instruction.description(), None);
        assert_eq!(slots[1].instruction.description(), Some("INC R0"));
    }
}
