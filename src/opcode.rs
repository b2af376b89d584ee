//! Primitive opcodes and their operand metadata.
//!
//! The instruction set is closed: every opcode is a variant of [`Opcode`] and
//! its operand shape, immediate mode and machine number are given by
//! exhaustive matches. Mnemonic lookup goes through a compile-time perfect
//! hash map keyed by the lowercase mnemonic.

use phf::phf_map;
use std::fmt;

/// Registers an opcode expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandShape {
    /// No register operand.
    None,
    /// Destination register only (`Rd`).
    Dest,
    /// Destination and source register (`Rd, Rs`).
    DestSource,
}

impl fmt::Display for OperandShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperandShape::None => write!(f, "none"),
            OperandShape::Dest => write!(f, "Rd"),
            OperandShape::DestSource => write!(f, "Rd, Rs"),
        }
    }
}

/// How an opcode carries its immediate value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImmediateMode {
    /// No immediate word.
    None,
    /// The expression value is stored as is.
    Absolute,
    /// The value minus the address of the instruction itself is stored.
    Relative,
}

impl ImmediateMode {
    #[inline]
    pub fn is_required(self) -> bool {
        !matches!(self, ImmediateMode::None)
    }
}

/// Mnemonic table (compile-time perfect hash map, lowercase keys).
pub static MNEMONICS: phf::Map<&'static str, Opcode> = phf_map! {
    "nop" => Opcode::Nop, "mov" => Opcode::Mov,
    "add" => Opcode::Add, "adc" => Opcode::Adc, "sub" => Opcode::Sub, "sbc" => Opcode::Sbc,
    "and" => Opcode::And, "or" => Opcode::Or, "eor" => Opcode::Eor, "mul" => Opcode::Mul,
    "cmp" => Opcode::Cmp, "cpc" => Opcode::Cpc,
    "ldi" => Opcode::Ldi, "addi" => Opcode::Addi, "adci" => Opcode::Adci,
    "subi" => Opcode::Subi, "sbci" => Opcode::Sbci, "andi" => Opcode::Andi,
    "ori" => Opcode::Ori, "eori" => Opcode::Eori, "muli" => Opcode::Muli, "cpi" => Opcode::Cpi,
    "lsl" => Opcode::Lsl, "lsr" => Opcode::Lsr, "rol" => Opcode::Rol, "ror" => Opcode::Ror,
    "asr" => Opcode::Asr, "swap" => Opcode::Swap,
    "ld" => Opcode::Ld, "st" => Opcode::St, "lds" => Opcode::Lds, "sts" => Opcode::Sts,
    "in" => Opcode::In, "out" => Opcode::Out,
    "jmp" => Opcode::Jmp,
    "breq" => Opcode::Breq, "brne" => Opcode::Brne, "brcs" => Opcode::Brcs,
    "brcc" => Opcode::Brcc, "brmi" => Opcode::Brmi, "brpl" => Opcode::Brpl,
    "call" => Opcode::Call, "ret" => Opcode::Ret, "reti" => Opcode::Reti, "brk" => Opcode::Brk,
};

/// Primitive opcodes. The discriminant is the machine opcode number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0x00,
    Mov = 0x01,
    Add = 0x02,
    Adc = 0x03,
    Sub = 0x04,
    Sbc = 0x05,
    And = 0x06,
    Or = 0x07,
    Eor = 0x08,
    Mul = 0x09,
    Cmp = 0x0a,
    Cpc = 0x0b,
    Ldi = 0x0c,
    Addi = 0x0d,
    Adci = 0x0e,
    Subi = 0x0f,
    Sbci = 0x10,
    Andi = 0x11,
    Ori = 0x12,
    Eori = 0x13,
    Muli = 0x14,
    Cpi = 0x15,
    Lsl = 0x16,
    Lsr = 0x17,
    Rol = 0x18,
    Ror = 0x19,
    Asr = 0x1a,
    Swap = 0x1b,
    Ld = 0x1c,
    St = 0x1d,
    Lds = 0x1e,
    Sts = 0x1f,
    In = 0x20,
    Out = 0x21,
    Jmp = 0x22,
    Breq = 0x23,
    Brne = 0x24,
    Brcs = 0x25,
    Brcc = 0x26,
    Brmi = 0x27,
    Brpl = 0x28,
    Call = 0x29,
    Ret = 0x2a,
    Reti = 0x2b,
    Brk = 0x2c,
}

impl Opcode {
    /// Look up a mnemonic, ignoring case.
    pub fn from_mnemonic(s: &str) -> Option<Self> {
        MNEMONICS.get(s.to_ascii_lowercase().as_str()).copied()
    }

    /// Machine opcode number (bits 15..8 of the first word).
    #[inline]
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn shape(self) -> OperandShape {
        use Opcode::*;
        match self {
            Nop | Jmp | Breq | Brne | Brcs | Brcc | Brmi | Brpl | Reti | Brk => OperandShape::None,
            Ldi | Addi | Adci | Subi | Sbci | Andi | Ori | Eori | Muli | Cpi | Lsl | Lsr | Rol
            | Ror | Asr | Swap | Lds | Sts | In | Out | Call | Ret => OperandShape::Dest,
            Mov | Add | Adc | Sub | Sbc | And | Or | Eor | Mul | Cmp | Cpc | Ld | St => {
                OperandShape::DestSource
            }
        }
    }

    pub fn immediate(self) -> ImmediateMode {
        use Opcode::*;
        match self {
            Ldi | Addi | Adci | Subi | Sbci | Andi | Ori | Eori | Muli | Cpi | Lds | Sts | In
            | Out | Jmp | Call => ImmediateMode::Absolute,
            Breq | Brne | Brcs | Brcc | Brmi | Brpl => ImmediateMode::Relative,
            Nop | Mov | Add | Adc | Sub | Sbc | And | Or | Eor | Mul | Cmp | Cpc | Lsl | Lsr
            | Rol | Ror | Asr | Swap | Ld | St | Ret | Reti | Brk => ImmediateMode::None,
        }
    }

    /// Number of machine words an instruction with this opcode occupies.
    #[inline]
    pub fn word_count(self) -> u32 {
        if self.immediate().is_required() { 2 } else { 1 }
    }

    /// Upper-case mnemonic.
    pub fn mnemonic(self) -> &'static str {
        use Opcode::*;
        match self {
            Nop => "NOP",
            Mov => "MOV",
            Add => "ADD",
            Adc => "ADC",
            Sub => "SUB",
            Sbc => "SBC",
            And => "AND",
            Or => "OR",
            Eor => "EOR",
            Mul => "MUL",
            Cmp => "CMP",
            Cpc => "CPC",
            Ldi => "LDI",
            Addi => "ADDI",
            Adci => "ADCI",
            Subi => "SUBI",
            Sbci => "SBCI",
            Andi => "ANDI",
            Ori => "ORI",
            Eori => "EORI",
            Muli => "MULI",
            Cpi => "CPI",
            Lsl => "LSL",
            Lsr => "LSR",
            Rol => "ROL",
            Ror => "ROR",
            Asr => "ASR",
            Swap => "SWAP",
            Ld => "LD",
            St => "ST",
            Lds => "LDS",
            Sts => "STS",
            In => "IN",
            Out => "OUT",
            Jmp => "JMP",
            Breq => "BREQ",
            Brne => "BRNE",
            Brcs => "BRCS",
            Brcc => "BRCC",
            Brmi => "BRMI",
            Brpl => "BRPL",
            Call => "CALL",
            Ret => "RET",
            Reti => "RETI",
            Brk => "BRK",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
