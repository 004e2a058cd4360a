//! All the ways an assembly can fail. Every variant is fatal; the
//! driver reports the message and exits non-zero.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AsmError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    // Syntax errors, tagged with the 1-based source line.
    #[error("line {line}: unknown mnemonic `{mnemonic}`")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("line {line}: unknown directive `{directive}`")]
    UnknownDirective { line: usize, directive: String },

    #[error("line {line}: {msg}")]
    BadOperand { line: usize, msg: String },

    // Semantic errors.
    #[error("line {line}: duplicate symbol definition `{name}`")]
    DuplicateSymbol { line: usize, name: String },

    #[error("line {line}: label `{name}` defined outside .text")]
    LabelOutsideText { line: usize, name: String },

    #[error("line {line}: .static `{name}` outside .data")]
    StaticOutsideData { line: usize, name: String },

    #[error("line {line}: instructions are only allowed in .text")]
    InstructionOutsideText { line: usize },

    #[error("undefined global symbol `{0}`")]
    UndefinedGlobal(String),

    #[error("undefined symbol referenced: `{0}`")]
    UndefinedSymbol(String),
}

impl AsmError {
    /// True for errors produced by the scanner/decoder layer rather
    /// than by symbol bookkeeping.
    pub fn is_syntax(&self) -> bool {
        matches!(
            self,
            AsmError::UnknownMnemonic { .. }
                | AsmError::UnknownDirective { .. }
                | AsmError::BadOperand { .. }
        )
    }
}
