use std::fmt;

/// The sixteen general purpose registers. `BP`, `SP` and `RA` are the
/// conventional names of `R13`, `R14` and `R15`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Register {
    R0 = 0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
    R8,
    R9,
    R10,
    R11,
    R12,
    Bp,
    Sp,
    Ra,
}

const REGISTERS: [Register; 16] = [
    Register::R0,
    Register::R1,
    Register::R2,
    Register::R3,
    Register::R4,
    Register::R5,
    Register::R6,
    Register::R7,
    Register::R8,
    Register::R9,
    Register::R10,
    Register::R11,
    Register::R12,
    Register::Bp,
    Register::Sp,
    Register::Ra,
];

impl Register {
    /// Parse a register name, ignoring case.
    pub fn parse_register(s: &str) -> Option<Self> {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "bp" => return Some(Register::Bp),
            "sp" => return Some(Register::Sp),
            "ra" => return Some(Register::Ra),
            _ => {}
        }
        let digits = lower.strip_prefix('r')?;
        // "r01" is not a register
        if !digits.bytes().all(|b| b.is_ascii_digit())
            || (digits.len() > 1 && digits.starts_with('0'))
        {
            return None;
        }
        let index: usize = digits.parse().ok()?;
        REGISTERS.get(index).copied()
    }

    /// 4-bit register field value.
    #[inline]
    pub fn index(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Register::Bp => write!(f, "BP"),
            Register::Sp => write!(f, "SP"),
            Register::Ra => write!(f, "RA"),
            other => write!(f, "R{}", other.index()),
        }
    }
}
