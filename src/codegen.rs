use crate::context::Context;
use crate::error::Result;
use crate::formatter::HexFormatter;
use crate::instruction::Instruction;
use crate::program::ResolvedProgram;

/// Receives machine words one at a time, in address order.
pub trait WordListener {
    fn accept(&mut self, word: u16) -> Result<()>;
}

impl WordListener for Vec<u16> {
    fn accept(&mut self, word: u16) -> Result<()> {
        self.push(word);
        Ok(())
    }
}

/// Extension point for output formats.
///
/// Called once per instruction, in address order. `context` carries the final
/// symbol values and the address of `instruction` (`context.instr_addr()`).
pub trait InstructionVisitor {
    fn visit(&mut self, instruction: &Instruction, context: &Context) -> Result<()>;
}

/// Code generator (generic over the output format)
pub struct CodeGen<V: InstructionVisitor> {
    visitor: V,
}

impl<V: InstructionVisitor> CodeGen<V> {
    pub fn new(visitor: V) -> Self {
        Self { visitor }
    }

    /// Run the generation pass over a resolved program.
    pub fn run(&mut self, program: &ResolvedProgram) -> Result<()> {
        program.traverse(&mut self.visitor)
    }

    pub fn visitor(&self) -> &V {
        &self.visitor
    }

    pub fn into_inner(self) -> V {
        self.visitor
    }
}

// Type alias for the reference output format
pub type HexCodeGen = CodeGen<HexFormatter<Vec<u8>>>;

impl HexCodeGen {
    pub fn hex() -> Self {
        Self::new(HexFormatter::new(Vec::new()))
    }
}
