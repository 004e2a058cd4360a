//! The data model for a parsed `.stkasm` file.
//!
//! The source language is line-oriented; `#` begins a comment that runs
//! to the end of the line.
//!
//! ```asm
//! .data
//! .static counter 0    # one 4-byte initialized cell
//!
//! .text
//! .global main         # export `main` for the linker
//!
//! main:
//!     iconst 2         # push a 32-bit constant
//!     iconst 3
//!     iadd             # also: isub, imul, idiv
//!     invoke helper 1  # call `helper` with 1 argument
//!     ret
//!
//! helper:
//!     jmp main         # unconditional jump
//! ```
//!
//! Code symbol addresses are 0-based instruction indices; data symbol
//! addresses are byte offsets, one 4-byte cell per `.static`.

use byteorder::{LittleEndian, WriteBytesExt};
use std::fmt;

use super::error::AsmError;
use super::symtab::{Binding, SymbolTable};

/// One instruction of the stack machine. The order the instructions
/// appear in the source is the program's instruction stream and is
/// preserved exactly.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Instruction {
    IConst(i32),
    IAdd,
    ISub,
    IMul,
    IDiv,
    Ret,
    Jmp(String),
    Invoke(String, u8),
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Instruction::*;
        match self {
            IConst(v) => write!(f, "iconst {}", v),
            IAdd => write!(f, "iadd"),
            ISub => write!(f, "isub"),
            IMul => write!(f, "imul"),
            IDiv => write!(f, "idiv"),
            Ret => write!(f, "ret"),
            Jmp(label) => write!(f, "jmp {}", label),
            Invoke(label, argc) => write!(f, "invoke {} {}", label, argc),
        }
    }
}

impl Instruction {
    /// Returns the opcode byte of the instruction.
    pub fn opcode(&self) -> u8 {
        use Instruction::*;
        match self {
            IConst(_) => 0x01,
            IAdd => 0x02,
            Invoke(_, _) => 0x03,
            Ret => 0x04,
            ISub => 0x05,
            IMul => 0x06,
            IDiv => 0x07,
            Jmp(_) => 0x08,
        }
    }

    /// Encode this instruction against the unit's symbol table.
    ///
    /// Returns the encoded bytes plus, for a reference to a GLOBAL
    /// symbol, the name the linker must patch in. In that case the
    /// address field holds a zero placeholder; the field always starts
    /// one byte past the opcode, which is where the emitter points the
    /// relocation entry.
    pub fn encode(&self, symbols: &SymbolTable) -> Result<(Vec<u8>, Option<String>), AsmError> {
        use Instruction::*;

        let mut bytes = vec![self.opcode()];
        match self {
            IConst(v) => {
                bytes.write_i32::<LittleEndian>(*v)?;
                Ok((bytes, None))
            }
            IAdd | ISub | IMul | IDiv | Ret => Ok((bytes, None)),
            Jmp(label) => {
                let reloc = write_address_field(&mut bytes, label, symbols)?;
                Ok((bytes, reloc))
            }
            Invoke(label, argc) => {
                let reloc = write_address_field(&mut bytes, label, symbols)?;
                bytes.push(*argc);
                Ok((bytes, reloc))
            }
        }
    }
}

/// Resolve `label` and append its 4-byte address field. A LOCAL symbol
/// resolves in place; a GLOBAL one gets a zero placeholder and its name
/// is handed back so the caller can record a relocation.
fn write_address_field(
    bytes: &mut Vec<u8>,
    label: &str,
    symbols: &SymbolTable,
) -> Result<Option<String>, AsmError> {
    let sym = symbols
        .get(label)
        .ok_or_else(|| AsmError::UndefinedSymbol(label.to_owned()))?;

    match sym.binding {
        Binding::Local => {
            bytes.write_u32::<LittleEndian>(sym.address)?;
            Ok(None)
        }
        Binding::Global => {
            bytes.write_u32::<LittleEndian>(0)?;
            Ok(Some(label.to_owned()))
        }
    }
}

/// One initialized 4-byte cell of the data section.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DataEntry {
    pub name: String,
    pub value: i32,
}

/// A pending address patch: `offset` is the byte position of a 4-byte
/// placeholder within the code section; the linker writes `target`'s
/// final address there.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Relocation {
    pub offset: u32,
    pub target: String,
}

/// Everything one assembly run produces: the instruction stream, the
/// data cells, and the symbol table, built by the two parser passes and
/// consumed exactly once by the emitter.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct AssemblyUnit {
    pub instructions: Vec<Instruction>,
    pub data: Vec<DataEntry>,
    pub symbols: SymbolTable,
}
