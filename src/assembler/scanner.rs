//! The scanner classifies raw source lines.
//!
//! It is purely syntactic: one line in, one classification out.
//! Comments begin with `#` and run to the end of the line. The scanner
//! never touches the symbol table; deciding whether a directive or
//! label is legal where it appears is the assembler's job.

/// The syntactic shape of a single cleaned source line.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum LineKind {
    /// Blank or comment-only.
    Empty,
    /// `.name arg arg ...` — the leading dot is stripped from `name`.
    Directive { name: String, args: Vec<String> },
    /// `name:` — the trailing colon is stripped.
    Label(String),
    /// Anything else: a mnemonic plus whitespace-separated operands.
    Instruction {
        mnemonic: String,
        operands: Vec<String>,
    },
}

/// Strip the comment and surrounding whitespace off `raw`, then
/// classify what remains.
pub fn scan_line(raw: &str) -> LineKind {
    let line = match raw.find('#') {
        Some(pos) => &raw[..pos],
        None => raw,
    };
    let line = line.trim();

    if line.is_empty() {
        return LineKind::Empty;
    }

    if let Some(rest) = line.strip_prefix('.') {
        let mut words = rest.split_whitespace();
        let name = words.next().unwrap_or("").to_owned();
        let args = words.map(str::to_owned).collect();
        return LineKind::Directive { name, args };
    }

    if let Some(name) = line.strip_suffix(':') {
        return LineKind::Label(name.trim().to_owned());
    }

    let mut words = line.split_whitespace();
    // `line` is non-empty and non-blank, so there is at least one word.
    let mnemonic = words.next().unwrap_or("").to_owned();
    let operands = words.map(str::to_owned).collect();
    LineKind::Instruction { mnemonic, operands }
}
