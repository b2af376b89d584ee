//! Program construction and address assignment.
//!
//! A [`Program`] is built incrementally by the parser. Labels are recorded as
//! pending and bound to the address of the next appended instruction, which is
//! what makes forward references work. [`Program::freeze`] turns it into a
//! [`ResolvedProgram`]: a read-only program whose labels are all bound, the
//! only input the generation pass accepts.

use crate::codegen::InstructionVisitor;
use crate::context::Context;
use crate::error::{AsmError, Result};
use crate::instruction::Instruction;
use tracing::{debug, trace};

/// Size of the instruction and of the RAM address space, in words.
pub const ADDRESS_SPACE: u32 = 0x1_0000;

/// An instruction together with its assigned address.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub address: u32,
    pub instruction: Instruction,
}

/// A named block of RAM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RamAllocation {
    pub name: String,
    pub address: u32,
    pub size: u32,
}

/// Initial value of one RAM cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataWord {
    pub address: u32,
    pub value: u16,
}

#[derive(Debug)]
struct PendingLabel {
    name: String,
    line: usize,
}

/// Program under construction.
#[derive(Debug)]
pub struct Program {
    slots: Vec<Slot>,
    ram: Vec<RamAllocation>,
    data: Vec<DataWord>,
    context: Context,
    pending_labels: Vec<PendingLabel>,
    pending_description: Option<String>,
    next_address: u32,
    next_ram: u32,
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl Program {
    pub fn new() -> Self {
        Self::with_ram_base(0)
    }

    /// Create a program whose RAM allocations start at `ram_base`.
    pub fn with_ram_base(ram_base: u32) -> Self {
        Self {
            slots: Vec::with_capacity(256),
            ram: Vec::new(),
            data: Vec::new(),
            context: Context::new(),
            pending_labels: Vec::new(),
            pending_description: None,
            next_address: 0,
            next_ram: ram_base,
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Address the next appended instruction will occupy.
    pub fn address(&self) -> u32 {
        self.next_address
    }

    /// Next free RAM address.
    pub fn ram_address(&self) -> u32 {
        self.next_ram
    }

    pub fn instructions(&self) -> &[Slot] {
        &self.slots
    }

    /// Remember `name` until the next instruction is added.
    pub fn set_pending_label(&mut self, name: impl Into<String>, line: usize) {
        self.pending_labels.push(PendingLabel {
            name: name.into(),
            line,
        });
    }

    /// Attach a description to the next instruction added (used by macros).
    pub fn set_pending_macro_description(&mut self, description: impl Into<String>) {
        self.pending_description = Some(description.into());
    }

    /// Drop a description no instruction has claimed.
    pub fn clear_pending_macro_description(&mut self) {
        self.pending_description = None;
    }

    /// Bind a constant in the program's context.
    pub fn define_constant(&mut self, name: &str, value: i64, line: usize) -> Result<()> {
        self.context
            .define(name, value)
            .map_err(|e| AsmError::expression(line, e))?;
        debug!(name, value, "constant defined");
        Ok(())
    }

    /// Append an instruction, binding all pending labels to its address.
    pub fn add(&mut self, instruction: Instruction) -> Result<()> {
        let address = self.next_address;
        let end = address + instruction.word_count();
        if end > ADDRESS_SPACE {
            return Err(AsmError::syntax(
                instruction.line(),
                format!("program exceeds {} words", ADDRESS_SPACE),
            ));
        }

        for label in self.pending_labels.drain(..) {
            self.context
                .define(&label.name, i64::from(address))
                .map_err(|e| AsmError::expression(label.line, e))?;
            debug!(label = %label.name, address, "label bound");
        }

        let instruction = instruction.with_description(self.pending_description.take());
        trace!(address, %instruction, "instruction added");
        self.slots.push(Slot {
            address,
            instruction,
        });
        self.next_address = end;
        Ok(())
    }

    /// Allocate `size` RAM cells named `name`; returns the first address.
    pub fn add_ram(&mut self, name: &str, size: u32, line: usize) -> Result<u32> {
        let address = self.next_ram;
        let end = address
            .checked_add(size)
            .filter(|end| *end <= ADDRESS_SPACE)
            .ok_or_else(|| {
                AsmError::syntax(line, format!("RAM exhausted allocating '{}'", name))
            })?;

        self.context
            .define(name, i64::from(address))
            .map_err(|e| AsmError::expression(line, e))?;
        debug!(name, address, size, "RAM allocated");

        self.ram.push(RamAllocation {
            name: name.to_string(),
            address,
            size,
        });
        self.next_ram = end;
        Ok(address)
    }

    /// Allocate a RAM block named `name` initialized with `values`.
    pub fn add_data(&mut self, name: &str, values: &[u16], line: usize) -> Result<u32> {
        let size = u32::try_from(values.len())
            .map_err(|_| AsmError::syntax(line, format!("data block '{}' too large", name)))?;
        let address = self.add_ram(name, size, line)?;
        self.data
            .extend(values.iter().zip(address..).map(|(&value, address)| DataWord {
                address,
                value,
            }));
        Ok(address)
    }

    /// Finish construction. Fails if a label is still waiting for its
    /// instruction.
    pub fn freeze(self) -> Result<ResolvedProgram> {
        if let Some(label) = self.pending_labels.first() {
            return Err(AsmError::syntax(
                label.line,
                format!("label '{}' is not followed by an instruction", label.name),
            ));
        }

        debug!(
            instructions = self.slots.len(),
            words = self.next_address,
            symbols = self.context.len(),
            "program frozen"
        );

        Ok(ResolvedProgram {
            slots: self.slots,
            ram: self.ram,
            data: self.data,
            context: self.context,
            size: self.next_address,
        })
    }
}

/// Program with every label bound; read-only.
#[derive(Debug, Clone)]
pub struct ResolvedProgram {
    slots: Vec<Slot>,
    ram: Vec<RamAllocation>,
    data: Vec<DataWord>,
    context: Context,
    size: u32,
}

impl ResolvedProgram {
    pub fn instructions(&self) -> &[Slot] {
        &self.slots
    }

    pub fn ram(&self) -> &[RamAllocation] {
        &self.ram
    }

    /// RAM initializers in ascending address order.
    pub fn data(&self) -> &[DataWord] {
        &self.data
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Number of instruction words.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Hand every instruction to `visitor`, in address order, with the
    /// context's current address set to the instruction's address.
    pub fn traverse<V>(&self, visitor: &mut V) -> Result<()>
    where
        V: InstructionVisitor + ?Sized,
    {
        let mut context = self.context.clone();
        for slot in &self.slots {
            context.set_instr_addr(slot.address);
            visitor.visit(&slot.instruction, &context)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExpressionError;
    use crate::opcode::Opcode;
    use crate::register::Register;

    fn nop() -> Instruction {
        Instruction::builder(Opcode::Nop).build().unwrap()
    }

    fn ldi() -> Instruction {
        Instruction::builder(Opcode::Ldi)
            .dest(Register::R0)
            .constant(0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_sequential_addresses() {
        let mut program = Program::new();
        program.add(nop()).unwrap();
        program.add(ldi()).unwrap();
        program.add(nop()).unwrap();

        let addresses: Vec<u32> = program.instructions().iter().map(|s| s.address).collect();
        assert_eq!(addresses, vec![0, 1, 3]);
        assert_eq!(program.address(), 4);
    }

    #[test]
    fn test_pending_label_binds_to_next_instruction() {
        let mut program = Program::new();
        program.add(ldi()).unwrap();
        program.set_pending_label("here", 2);
        program.set_pending_label("also_here", 3);
        assert!(!program.context().contains("here"));

        program.add(nop()).unwrap();
        assert_eq!(program.context().get("here"), Ok(2));
        assert_eq!(program.context().get("also_here"), Ok(2));
    }

    #[test]
    fn test_duplicate_label() {
        let mut program = Program::new();
        program.set_pending_label("x", 1);
        program.add(nop()).unwrap();
        program.set_pending_label("x", 2);
        let err = program.add(nop()).unwrap_err();
        assert!(matches!(
            err,
            AsmError::Expression {
                line: 2,
                source: ExpressionError::AlreadyDefined(_)
            }
        ));
    }

    #[test]
    fn test_unbound_label_fails_freeze() {
        let mut program = Program::new();
        program.add(nop()).unwrap();
        program.set_pending_label("end", 9);
        let err = program.freeze().unwrap_err();
        assert_eq!(err.line(), Some(9));
        assert!(err.to_string().contains("end"));
    }

    #[test]
    fn test_macro_description_attaches_once() {
        let mut program = Program::new();
        program.set_pending_macro_description("INC R0");
        program.add(nop()).unwrap();
        program.add(nop()).unwrap();

        let slots = program.instructions();
        assert_eq!(slots[0].instruction.description(), Some("INC R0"));
        assert_eq!(slots[1].instruction.description(), None);
    }

    #[test]
    fn test_ram_allocation() {
        let mut program = Program::with_ram_base(0x100);
        assert_eq!(program.add_ram("a", 1, 1).unwrap(), 0x100);
        assert_eq!(program.add_ram("b", 2, 2).unwrap(), 0x101);
        assert_eq!(program.add_data("c", &[7, 8], 3).unwrap(), 0x103);
        assert_eq!(program.ram_address(), 0x105);
        assert_eq!(program.context().get("b"), Ok(0x101));

        // instruction addresses are independent of RAM
        assert_eq!(program.address(), 0);

        let resolved = program.freeze().unwrap();
        assert_eq!(
            resolved.data(),
            &[
                DataWord {
                    address: 0x103,
                    value: 7
                },
                DataWord {
                    address: 0x104,
                    value: 8
                },
            ]
        );
        assert_eq!(resolved.ram().len(), 3);
    }

    #[test]
    fn test_ram_exhausted() {
        let mut program = Program::with_ram_base(0xffff);
        assert!(program.add_ram("last", 1, 1).is_ok());
        assert!(program.add_ram("over", 1, 2).is_err());
    }

    #[test]
    fn test_program_too_large() {
        let mut program = Program::new();
        for _ in 0..ADDRESS_SPACE / 2 {
            program.add(ldi()).unwrap();
        }
        assert!(program.add(nop()).is_err());
    }
}
