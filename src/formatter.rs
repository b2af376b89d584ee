//! Output formats.
//!
//! [`HexFormatter`] writes the raw memory image understood by the simulator:
//!
//! ```text
//! v2.0 raw
//! d10
//! 1
//! 0
//! ```
//!
//! One line per address starting at 0, lowercase hex without prefix or
//! padding, `0` for addresses without content.
//!
//! [`ListingFormatter`] writes a human readable listing with addresses, words,
//! source lines and macro descriptions.

use crate::codegen::{InstructionVisitor, WordListener};
use crate::context::Context;
use crate::error::{AsmError, Result};
use crate::instruction::Instruction;
use crate::program::DataWord;
use std::io::Write;

const HEX_HEADER: &str = "v2.0 raw";

/// Reference output format. Addresses must never decrease; gaps are filled
/// with zero words.
pub struct HexFormatter<W: Write> {
    out: W,
    addr: u32,
    header_written: bool,
}

impl<W: Write> HexFormatter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            addr: 0,
            header_written: false,
        }
    }

    fn header(&mut self) -> Result<()> {
        if !self.header_written {
            writeln!(self.out, "{}", HEX_HEADER)?;
            self.header_written = true;
        }
        Ok(())
    }

    /// Next address to be written.
    pub fn address(&self) -> u32 {
        self.addr
    }

    /// Advance to `address`, writing `0` for every skipped address.
    pub fn seek(&mut self, address: u32) -> Result<()> {
        self.header()?;
        if address < self.addr {
            return Err(AsmError::NonMonotonicAddress {
                address,
                reached: self.addr,
            });
        }
        while self.addr < address {
            writeln!(self.out, "0")?;
            self.addr += 1;
        }
        Ok(())
    }

    /// Write RAM initializers (sorted by address).
    pub fn write_data(&mut self, data: &[DataWord]) -> Result<()> {
        for cell in data {
            self.seek(cell.address)?;
            self.accept(cell.value)?;
        }
        Ok(())
    }

    /// Flush and return the underlying writer. An empty image still gets its
    /// header line.
    pub fn finish(mut self) -> Result<W> {
        self.header()?;
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> WordListener for HexFormatter<W> {
    fn accept(&mut self, word: u16) -> Result<()> {
        self.header()?;
        writeln!(self.out, "{:x}", word)?;
        self.addr += 1;
        Ok(())
    }
}

impl<W: Write> InstructionVisitor for HexFormatter<W> {
    fn visit(&mut self, instruction: &Instruction, context: &Context) -> Result<()> {
        self.seek(context.instr_addr())?;
        instruction.encode(context, self)
    }
}

/// Listing output: `AAAA: WWWW WWWW  LINE: INSTRUCTION ; macro`.
pub struct ListingFormatter<W: Write> {
    out: W,
    words: Vec<u16>,
}

impl<W: Write> ListingFormatter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            words: Vec::with_capacity(2),
        }
    }

    /// Append the symbol table, sorted by name.
    pub fn write_symbols(&mut self, context: &Context) -> Result<()> {
        if context.is_empty() {
            return Ok(());
        }
        writeln!(self.out)?;
        writeln!(self.out, "symbols:")?;
        for (name, value) in context.symbols() {
            if (0..=0xffff).contains(&value) {
                writeln!(self.out, "  {:<20} {:04x}", name, value)?;
            } else {
                writeln!(self.out, "  {:<20} {}", name, value)?;
            }
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> InstructionVisitor for ListingFormatter<W> {
    fn visit(&mut self, instruction: &Instruction, context: &Context) -> Result<()> {
        self.words.clear();
        instruction.encode(context, &mut self.words)?;

        let words = self
            .words
            .iter()
            .map(|w| format!("{:04x}", w))
            .collect::<Vec<_>>()
            .join(" ");
        write!(
            self.out,
            "{:04x}: {:<10}{:>5}: {}",
            context.instr_addr(),
            words,
            instruction.line(),
            instruction
        )?;
        if let Some(description) = instruction.description() {
            write!(self.out, " ; {}", description)?;
        }
        writeln!(self.out)?;
        Ok(())
    }
}
