//! The two-pass assembler.
//!
//! Pass 1 walks the source once and builds the symbol table: it assigns
//! every label its instruction index, every `.static` its data offset,
//! and upgrades `.global` names at the end of the scan. Pass 2 walks
//! the same source again and materializes the instruction and data
//! lists. Two passes because a `jmp` may reference a label defined
//! later in the file; by the time pass 2 (and emission) runs, every
//! address is already known, so no backpatching is needed.
//!
//! Each pass is a small state machine stepped one line at a time, which
//! keeps the section-transition rules testable in isolation.

use std::io::BufRead;

use super::ast::{DataEntry, Instruction};
use super::error::AsmError;
use super::scanner::{scan_line, LineKind};
use super::symtab::{SymbolKind, SymbolTable};

/// Which section is currently selected. Starts out Unknown; `.text`
/// and `.data` switch it freely in both directions.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Section {
    Unknown,
    Text,
    Data,
}

/// Pass 1: symbol collection. Feed it lines with `step`, then call
/// `finish` to resolve the deferred `.global` promotions.
pub struct PassOne {
    section: Section,
    /// Next instruction's 0-based index.
    code_cursor: u32,
    /// Next `.static` cell's byte offset.
    data_cursor: u32,
    /// `.global` names awaiting resolution at the end of the scan.
    pending_globals: Vec<String>,
    symbols: SymbolTable,
}

impl PassOne {
    pub fn new() -> Self {
        PassOne {
            section: Section::Unknown,
            code_cursor: 0,
            data_cursor: 0,
            pending_globals: Vec::new(),
            symbols: SymbolTable::new(),
        }
    }

    /// Process one source line. `line_num` is 1-based.
    pub fn step(&mut self, line_num: usize, raw: &str) -> Result<(), AsmError> {
        match scan_line(raw) {
            LineKind::Empty => Ok(()),
            LineKind::Directive { name, args } => self.directive(line_num, &name, &args),
            LineKind::Label(name) => {
                if self.section != Section::Text {
                    return Err(AsmError::LabelOutsideText {
                        line: line_num,
                        name,
                    });
                }
                if !self.symbols.define(&name, SymbolKind::Code, self.code_cursor) {
                    return Err(AsmError::DuplicateSymbol {
                        line: line_num,
                        name,
                    });
                }
                Ok(())
            }
            LineKind::Instruction { .. } => {
                if self.section != Section::Text {
                    return Err(AsmError::InstructionOutsideText { line: line_num });
                }
                // One address slot per instruction line; decoding
                // happens in pass 2.
                self.code_cursor += 1;
                Ok(())
            }
        }
    }

    fn directive(&mut self, line_num: usize, name: &str, args: &[String]) -> Result<(), AsmError> {
        match name {
            "text" => {
                self.section = Section::Text;
                Ok(())
            }
            "data" => {
                self.section = Section::Data;
                Ok(())
            }
            "global" => {
                let name = first_arg(line_num, ".global", args)?;
                self.pending_globals.push(name);
                Ok(())
            }
            "static" => {
                let name = first_arg(line_num, ".static", args)?;
                if self.section != Section::Data {
                    return Err(AsmError::StaticOutsideData {
                        line: line_num,
                        name,
                    });
                }
                if !self.symbols.define(&name, SymbolKind::Data, self.data_cursor) {
                    return Err(AsmError::DuplicateSymbol {
                        line: line_num,
                        name,
                    });
                }
                self.data_cursor += 4;
                Ok(())
            }
            other => Err(AsmError::UnknownDirective {
                line: line_num,
                directive: format!(".{}", other),
            }),
        }
    }

    /// Resolve every deferred `.global` and hand back the completed
    /// symbol table. Promotion never moves an address.
    pub fn finish(self) -> Result<SymbolTable, AsmError> {
        let mut symbols = self.symbols;
        for name in self.pending_globals {
            if !symbols.promote_global(&name) {
                return Err(AsmError::UndefinedGlobal(name));
            }
        }
        Ok(symbols)
    }
}

/// Pass 2: instruction and data materialization. Placement was already
/// validated in pass 1, so directives here only re-select the section.
pub struct PassTwo {
    section: Section,
    instructions: Vec<Instruction>,
    data: Vec<DataEntry>,
}

impl PassTwo {
    pub fn new() -> Self {
        PassTwo {
            section: Section::Unknown,
            instructions: Vec::new(),
            data: Vec::new(),
        }
    }

    pub fn step(&mut self, line_num: usize, raw: &str) -> Result<(), AsmError> {
        match scan_line(raw) {
            // Labels were consumed by pass 1.
            LineKind::Empty | LineKind::Label(_) => Ok(()),
            LineKind::Directive { name, args } => {
                match name.as_str() {
                    "text" => self.section = Section::Text,
                    "data" => self.section = Section::Data,
                    "global" => {}
                    "static" => {
                        let name = first_arg(line_num, ".static", args.as_slice())?;
                        let value = parse_i32(line_num, ".static", args.get(1))?;
                        self.data.push(DataEntry { name, value });
                    }
                    // Pass 1 already rejected anything else.
                    _ => {}
                }
                Ok(())
            }
            LineKind::Instruction { mnemonic, operands } => {
                let ins = decode_instruction(line_num, &mnemonic, &operands)?;
                self.instructions.push(ins);
                Ok(())
            }
        }
    }

    pub fn finish(self) -> (Vec<Instruction>, Vec<DataEntry>) {
        (self.instructions, self.data)
    }
}

/// Decode one mnemonic with strict arity checking.
fn decode_instruction(
    line_num: usize,
    mnemonic: &str,
    operands: &[String],
) -> Result<Instruction, AsmError> {
    match mnemonic {
        "iconst" => {
            expect_arity(line_num, mnemonic, operands, 1)?;
            let value = parse_i32(line_num, mnemonic, operands.get(0))?;
            Ok(Instruction::IConst(value))
        }
        "iadd" => {
            expect_arity(line_num, mnemonic, operands, 0)?;
            Ok(Instruction::IAdd)
        }
        "isub" => {
            expect_arity(line_num, mnemonic, operands, 0)?;
            Ok(Instruction::ISub)
        }
        "imul" => {
            expect_arity(line_num, mnemonic, operands, 0)?;
            Ok(Instruction::IMul)
        }
        "idiv" => {
            expect_arity(line_num, mnemonic, operands, 0)?;
            Ok(Instruction::IDiv)
        }
        "ret" => {
            expect_arity(line_num, mnemonic, operands, 0)?;
            Ok(Instruction::Ret)
        }
        "jmp" => {
            expect_arity(line_num, mnemonic, operands, 1)?;
            Ok(Instruction::Jmp(operands[0].clone()))
        }
        "invoke" => {
            expect_arity(line_num, mnemonic, operands, 2)?;
            let argc = operands[1].parse::<u8>().map_err(|_| AsmError::BadOperand {
                line: line_num,
                msg: format!("'invoke' argument count `{}` is not a u8", operands[1]),
            })?;
            Ok(Instruction::Invoke(operands[0].clone(), argc))
        }
        other => Err(AsmError::UnknownMnemonic {
            line: line_num,
            mnemonic: other.to_owned(),
        }),
    }
}

fn expect_arity(
    line_num: usize,
    mnemonic: &str,
    operands: &[String],
    want: usize,
) -> Result<(), AsmError> {
    if operands.len() != want {
        return Err(AsmError::BadOperand {
            line: line_num,
            msg: format!(
                "'{}' expects {} operand(s), got {}",
                mnemonic,
                want,
                operands.len()
            ),
        });
    }
    Ok(())
}

fn first_arg(line_num: usize, what: &str, args: &[String]) -> Result<String, AsmError> {
    match args.get(0) {
        Some(name) => Ok(name.clone()),
        None => Err(AsmError::BadOperand {
            line: line_num,
            msg: format!("'{}' expects a name", what),
        }),
    }
}

fn parse_i32(line_num: usize, what: &str, arg: Option<&String>) -> Result<i32, AsmError> {
    let text = arg.ok_or_else(|| AsmError::BadOperand {
        line: line_num,
        msg: format!("'{}' expects an integer argument", what),
    })?;
    text.parse::<i32>().map_err(|_| AsmError::BadOperand {
        line: line_num,
        msg: format!("'{}' argument `{}` is not an i32", what, text),
    })
}

/// Run pass 1 over a line source.
pub fn run_pass_one<R: BufRead>(reader: R) -> Result<SymbolTable, AsmError> {
    let mut pass = PassOne::new();
    for (idx, line) in reader.lines().enumerate() {
        pass.step(idx + 1, &line?)?;
    }
    pass.finish()
}

/// Run pass 2 over a line source.
pub fn run_pass_two<R: BufRead>(reader: R) -> Result<(Vec<Instruction>, Vec<DataEntry>), AsmError> {
    let mut pass = PassTwo::new();
    for (idx, line) in reader.lines().enumerate() {
        pass.step(idx + 1, &line?)?;
    }
    Ok(pass.finish())
}
