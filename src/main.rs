//! asm16 CLI - Assembles source files to `v2.0 raw` hex images.
//!
//! Usage:
//!     asm16 <file.asm>...
//!     asm16 -l -d -o build/ <file.asm>...

use asm16::parser::parse_integer;
use asm16::{AssembleOptions, assemble_files, default_macros, write_assembly};
use clap::Parser as ClapParser;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

#[derive(ClapParser, Debug)]
#[command(name = "asm16")]
#[command(version = "1.0.0")]
#[command(about = "Two-pass assembler for a 16-bit register machine")]
struct Args {
    /// Input files
    #[arg(value_name = "INPUT", required_unless_present = "list_macros")]
    inputs: Vec<PathBuf>,

    /// Output directory (defaults to the directory of each input)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Also write <stem>.lst
    #[arg(short, long)]
    listing: bool,

    /// Also write <stem>.data.hex (RAM image)
    #[arg(short, long)]
    data: bool,

    /// First RAM address (decimal or 0x hex)
    #[arg(long, value_name = "ADDR", default_value = "0", value_parser = parse_address)]
    ram_base: u32,

    /// Disable the built-in macros
    #[arg(long = "no-macros")]
    no_macros: bool,

    /// Print the built-in macros and exit
    #[arg(long)]
    list_macros: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// One of `TRACE`, `DEBUG`, `INFO`, `WARN`, or `ERROR`
    #[arg(long, default_value_t = Level::WARN)]
    log_level: Level,
}

fn parse_address(s: &str) -> Result<u32, String> {
    let value = parse_integer(s, 0).map_err(|_| format!("'{}' is not a number", s))?;
    u32::try_from(value)
        .ok()
        .filter(|v| *v <= 0xffff)
        .ok_or_else(|| format!("{} is outside the 16-bit address space", s))
}

fn list_macros() {
    for m in default_macros() {
        let usage = format!("{} {}", m.name(), m.arguments());
        println!("{:<12} {}", usage.trim_end(), m.description());
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = if args.verbose {
        args.log_level.max(Level::DEBUG)
    } else {
        args.log_level
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    if args.list_macros {
        list_macros();
        return ExitCode::SUCCESS;
    }

    if let Some(missing) = args.inputs.iter().find(|p| !p.is_file()) {
        eprintln!("Error: Input not found: {}", missing.display());
        return ExitCode::from(2);
    }

    let options = AssembleOptions {
        ram_base: args.ram_base,
        builtin_macros: !args.no_macros,
        listing: args.listing,
        data_image: args.data,
    };

    let results = assemble_files(&args.inputs, &options);
    let mut has_errors = false;

    for (input, result) in args.inputs.iter().zip(&results) {
        match result {
            Ok(assembly) => match write_assembly(assembly, input, args.output.as_deref()) {
                Ok(written) => {
                    for path in written {
                        println!("{} -> {}", input.display(), path.display());
                    }
                }
                Err(e) => {
                    tracing::error!("{}", e);
                    has_errors = true;
                }
            },
            Err(e) => {
                tracing::error!("{}: {}", input.display(), e);
                has_errors = true;
            }
        }
    }

    if has_errors {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
