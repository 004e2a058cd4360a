//! The assembler turns `.stkasm` source into a relocatable object.
//!
//! The pipeline is: scanner (line classification) -> two-pass parser
//! (symbol table, then instruction/data lists) -> emitter (object byte
//! stream). `parse_file` reads the source twice, once per pass, so
//! forward references resolve without backpatching.

pub mod ast;
pub mod emitter;
pub mod error;
pub mod parser;
pub mod scanner;
pub mod symtab;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use self::ast::AssemblyUnit;
use self::error::AsmError;

/// Assemble from an in-memory source string. Both passes walk the same
/// buffer.
pub fn parse_source(source: &str) -> Result<AssemblyUnit, AsmError> {
    let symbols = parser::run_pass_one(source.as_bytes())?;
    let (instructions, data) = parser::run_pass_two(source.as_bytes())?;
    debug!(
        "parsed {} instruction(s), {} symbol(s), {} data entr(ies)",
        instructions.len(),
        symbols.len(),
        data.len()
    );
    Ok(AssemblyUnit {
        instructions,
        data,
        symbols,
    })
}

/// Assemble from a source file. The file is opened once per pass; each
/// handle is dropped when its pass completes, error or not.
pub fn parse_file(path: &Path) -> Result<AssemblyUnit, AsmError> {
    let symbols = parser::run_pass_one(BufReader::new(File::open(path)?))?;
    let (instructions, data) = parser::run_pass_two(BufReader::new(File::open(path)?))?;
    debug!(
        "parsed {} instruction(s), {} symbol(s), {} data entr(ies)",
        instructions.len(),
        symbols.len(),
        data.len()
    );
    Ok(AssemblyUnit {
        instructions,
        data,
        symbols,
    })
}

/// Parse `path` and emit the finished object in one step.
pub fn assemble(path: &Path) -> Result<Vec<u8>, AsmError> {
    let unit = parse_file(path)?;
    emitter::emit_object(&unit)
}
