//! Macros: mnemonics that expand into one or more primitive instructions.
//!
//! A macro reads its operands through the parser's operand API and appends
//! the expanded instructions to the program like hand-written ones, so they
//! take part in normal address assignment and label binding.

use crate::error::{AsmError, Result};
use crate::instruction::{Instruction, InstructionBuilder};
use crate::opcode::Opcode;
use crate::parser::Parser;
use crate::program::Program;
use crate::register::Register;
use std::fmt;
use std::rc::Rc;

/// Operands a macro expects (for help output).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroArguments {
    None,
    Dest,
    Source,
    Address,
}

impl fmt::Display for MacroArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacroArguments::None => Ok(()),
            MacroArguments::Dest => write!(f, "Rd"),
            MacroArguments::Source => write!(f, "Rs"),
            MacroArguments::Address => write!(f, "addr"),
        }
    }
}

/// A named expansion rule.
pub trait Macro {
    /// Mnemonic, matched ignoring case.
    fn name(&self) -> &'static str;

    fn arguments(&self) -> MacroArguments;

    fn description(&self) -> &'static str;

    /// Parse the operands following the mnemonic and append the expansion.
    fn parse_macro(&self, program: &mut Program, parser: &mut Parser) -> Result<()>;
}

/// The built-in macro set, in registration order.
pub fn default_macros() -> Vec<Rc<dyn Macro>> {
    vec![
        Rc::new(Inc),
        Rc::new(Dec),
        Rc::new(Push),
        Rc::new(Pop),
        Rc::new(SCall),
        Rc::new(SRet),
    ]
}

/// Build and append one instruction of an expansion.
pub fn emit(program: &mut Program, builder: InstructionBuilder, line: usize) -> Result<()> {
    let instruction = builder
        .line(line)
        .build()
        .map_err(|e| AsmError::instruction(line, e))?;
    program.add(instruction)
}

/// `INC Rd` → `ADDI Rd, 1`
pub struct Inc;

impl Macro for Inc {
    fn name(&self) -> &'static str {
        "INC"
    }

    fn arguments(&self) -> MacroArguments {
        MacroArguments::Dest
    }

    fn description(&self) -> &'static str {
        "increases the given register by one"
    }

    fn parse_macro(&self, program: &mut Program, parser: &mut Parser) -> Result<()> {
        let line = parser.line();
        let reg = parser.parse_reg()?;
        program.set_pending_macro_description(format!("{} {}", self.name(), reg));
        emit(program, Instruction::builder(Opcode::Addi).dest(reg).constant(1), line)
    }
}

/// `DEC Rd` → `SUBI Rd, 1`
pub struct Dec;

impl Macro for Dec {
    fn name(&self) -> &'static str {
        "DEC"
    }

    fn arguments(&self) -> MacroArguments {
        MacroArguments::Dest
    }

    fn description(&self) -> &'static str {
        "decreases the given register by one"
    }

    fn parse_macro(&self, program: &mut Program, parser: &mut Parser) -> Result<()> {
        let line = parser.line();
        let reg = parser.parse_reg()?;
        program.set_pending_macro_description(format!("{} {}", self.name(), reg));
        emit(program, Instruction::builder(Opcode::Subi).dest(reg).constant(1), line)
    }
}

/// `PUSH Rs` → `SUBI SP, 1` ; `ST SP, Rs`
pub struct Push;

impl Macro for Push {
    fn name(&self) -> &'static str {
        "PUSH"
    }

    fn arguments(&self) -> MacroArguments {
        MacroArguments::Source
    }

    fn description(&self) -> &'static str {
        "copies the value in the given register to the stack, decreases the stack pointer by one"
    }

    fn parse_macro(&self, program: &mut Program, parser: &mut Parser) -> Result<()> {
        let line = parser.line();
        let reg = parser.parse_reg()?;
        program.set_pending_macro_description(format!("{} {}", self.name(), reg));
        emit(
            program,
            Instruction::builder(Opcode::Subi)
                .dest(Register::Sp)
                .constant(1),
            line,
        )?;
        emit(
            program,
            Instruction::builder(Opcode::St).dest(Register::Sp).source(reg),
            line,
        )
    }
}

/// `POP Rd` → `LD Rd, SP` ; `ADDI SP, 1`
pub struct Pop;

impl Macro for Pop {
    fn name(&self) -> &'static str {
        "POP"
    }

    fn arguments(&self) -> MacroArguments {
        MacroArguments::Dest
    }

    fn description(&self) -> &'static str {
        "copies the value from the stack to the given register, increases the stack pointer by one"
    }

    fn parse_macro(&self, program: &mut Program, parser: &mut Parser) -> Result<()> {
        let line = parser.line();
        let reg = parser.parse_reg()?;
        program.set_pending_macro_description(format!("{} {}", self.name(), reg));
        emit(
            program,
            Instruction::builder(Opcode::Ld).dest(reg).source(Register::Sp),
            line,
        )?;
        emit(
            program,
            Instruction::builder(Opcode::Addi)
                .dest(Register::Sp)
                .constant(1),
            line,
        )
    }
}

/// Opcodes emitted by `SCALL`, in order.
const SCALL_EXPANSION: [Opcode; 4] = [Opcode::Subi, Opcode::Ldi, Opcode::St, Opcode::Jmp];

/// `SCALL addr` → `SUBI SP, 1` ; `LDI RA, ret` ; `ST SP, RA` ; `JMP addr`
pub struct SCall;

impl Macro for SCall {
    fn name(&self) -> &'static str {
        "SCALL"
    }

    fn arguments(&self) -> MacroArguments {
        MacroArguments::Address
    }

    fn description(&self) -> &'static str {
        "jumps to the given address, stores the return address on the stack"
    }

    fn parse_macro(&self, program: &mut Program, parser: &mut Parser) -> Result<()> {
        let line = parser.line();
        let target = parser.parse_expression()?;
        let ret = program.address() + SCALL_EXPANSION.iter().map(|op| op.word_count()).sum::<u32>();
        program.set_pending_macro_description(format!("{} {}", self.name(), target));

        emit(
            program,
            Instruction::builder(Opcode::Subi)
                .dest(Register::Sp)
                .constant(1),
            line,
        )?;
        emit(
            program,
            Instruction::builder(Opcode::Ldi)
                .dest(Register::Ra)
                .constant(i64::from(ret)),
            line,
        )?;
        emit(
            program,
            Instruction::builder(Opcode::St)
                .dest(Register::Sp)
                .source(Register::Ra),
            line,
        )?;
        emit(
            program,
            Instruction::builder(Opcode::Jmp).immediate(target),
            line,
        )
    }
}

/// `SRET` → `LD RA, SP` ; `ADDI SP, 1` ; `RET RA`
pub struct SRet;

impl Macro for SRet {
    fn name(&self) -> &'static str {
        "SRET"
    }

    fn arguments(&self) -> MacroArguments {
        MacroArguments::None
    }

    fn description(&self) -> &'static str {
        "jumps to the address which is stored on the stack"
    }

    fn parse_macro(&self, program: &mut Program, parser: &mut Parser) -> Result<()> {
        let line = parser.line();
        program.set_pending_macro_description(self.name());
        emit(
            program,
            Instruction::builder(Opcode::Ld)
                .dest(Register::Ra)
                .source(Register::Sp),
            line,
        )?;
        emit(
            program,
            Instruction::builder(Opcode::Addi)
                .dest(Register::Sp)
                .constant(1),
            line,
        )?;
        emit(
            program,
            Instruction::builder(Opcode::Ret).dest(Register::Ra),
            line,
        )
    }
}
