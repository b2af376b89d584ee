//! asm16 - two-pass assembler for a 16-bit register machine.
//!
//! The first pass ([`parser::Parser`]) reads the source, expands macros,
//! assigns addresses and binds labels. The second pass ([`codegen::CodeGen`])
//! walks the resolved program with an output visitor; every operand
//! expression is evaluated there, so forward references need no fixups.
//!
//! # Usage
//!
//! ```no_run
//! use asm16::{AssembleOptions, assemble, assemble_file};
//! use std::path::Path;
//!
//! // Source text to the `v2.0 raw` hex image
//! let hex = assemble("start: ldi r0, 1\n jmp start\n").unwrap();
//!
//! // A file, with a listing
//! let options = AssembleOptions { listing: true, ..Default::default() };
//! let assembly = assemble_file(Path::new("prog.asm"), &options).unwrap();
//! ```

pub mod codegen;
pub mod context;
pub mod error;
pub mod expression;
pub mod formatter;
pub mod instruction;
pub mod macros;
pub mod opcode;
pub mod parser;
pub mod program;
pub mod register;
pub mod tokenizer;

use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

// Re-export key types
pub use codegen::{CodeGen, HexCodeGen, InstructionVisitor, WordListener};
pub use context::Context;
pub use error::{AsmError, ExpressionError, InstructionError, Result};
pub use formatter::{HexFormatter, ListingFormatter};
pub use instruction::Instruction;
pub use macros::{Macro, MacroArguments, default_macros};
pub use opcode::Opcode;
pub use parser::Parser;
pub use program::{Program, ResolvedProgram};
pub use register::Register;

/// Assembly options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssembleOptions {
    /// First RAM address used by `.word`, `.long` and `.data` (default: 0).
    pub ram_base: u32,
    /// Register the built-in macros (default: true).
    pub builtin_macros: bool,
    /// Also render a listing (default: false).
    pub listing: bool,
    /// Also render the RAM data image (default: false).
    pub data_image: bool,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            ram_base: 0,
            builtin_macros: true,
            listing: false,
            data_image: false,
        }
    }
}

/// Output of one assembly run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    /// Instruction memory image.
    pub hex: String,
    pub listing: Option<String>,
    /// RAM image built from `.data` initializers.
    pub data: Option<String>,
    /// Number of instruction words.
    pub words: u32,
}

/// First pass: parse `source` into a resolved program.
pub fn parse(source: &str, options: &AssembleOptions) -> Result<ResolvedProgram> {
    let parser = if options.builtin_macros {
        Parser::new(source)
    } else {
        Parser::without_macros(source)
    };
    parser.with_ram_base(options.ram_base).parse_program()
}

/// Assemble source text to the hex image with default options.
pub fn assemble(source: &str) -> Result<String> {
    assemble_with_options(source, &AssembleOptions::default()).map(|assembly| assembly.hex)
}

/// Assemble source text, rendering every output `options` asks for.
pub fn assemble_with_options(source: &str, options: &AssembleOptions) -> Result<Assembly> {
    let program = parse(source, options)?;
    debug!(
        words = program.size(),
        ram = program.ram().len(),
        "first pass done"
    );

    let mut codegen = HexCodeGen::hex();
    codegen.run(&program)?;
    let hex = into_string(codegen.into_inner().finish()?);

    let listing = if options.listing {
        let mut codegen = CodeGen::new(ListingFormatter::new(Vec::new()));
        codegen.run(&program)?;
        let mut formatter = codegen.into_inner();
        formatter.write_symbols(program.context())?;
        Some(into_string(formatter.finish()?))
    } else {
        None
    };

    let data = if options.data_image {
        let mut formatter = HexFormatter::new(Vec::new());
        formatter.write_data(program.data())?;
        Some(into_string(formatter.finish()?))
    } else {
        None
    };

    debug!("second pass done");
    Ok(Assembly {
        hex,
        listing,
        data,
        words: program.size(),
    })
}

// Formatters only ever write ASCII
fn into_string(bytes: Vec<u8>) -> String {
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Assemble a single file.
pub fn assemble_file(path: &Path, options: &AssembleOptions) -> Result<Assembly> {
    let source = fs::read_to_string(path).map_err(|e| AsmError::io(path, e))?;
    debug!(path = %path.display(), "assembling");
    assemble_with_options(&source, options)
}

/// Assemble several files in parallel, one result per path, in input order.
pub fn assemble_files(paths: &[PathBuf], options: &AssembleOptions) -> Vec<Result<Assembly>> {
    paths
        .par_iter()
        .map(|path| assemble_file(path, options))
        .collect()
}

/// Path of an output file: `<output_dir>/<stem><extension>`, where
/// `output_dir` defaults to the input's directory.
pub fn output_path(input: &Path, output_dir: Option<&Path>, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("out");
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(format!("{}{}", stem, extension))
}

/// Write `<stem>.hex` and, if present, `<stem>.lst` and `<stem>.data.hex`.
/// Returns the paths written.
pub fn write_assembly(
    assembly: &Assembly,
    input: &Path,
    output_dir: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    let mut outputs = vec![(output_path(input, output_dir, ".hex"), &assembly.hex)];
    if let Some(listing) = &assembly.listing {
        outputs.push((output_path(input, output_dir, ".lst"), listing));
    }
    if let Some(data) = &assembly.data {
        outputs.push((output_path(input, output_dir, ".data.hex"), data));
    }

    let mut written = Vec::with_capacity(outputs.len());
    for (path, content) in outputs {
        fs::write(&path, content).map_err(|e| AsmError::io(&path, e))?;
        written.push(path);
    }
    Ok(written)
}
