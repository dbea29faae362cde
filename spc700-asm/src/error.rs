//! Errors raised while loading the ISA table, assembling or disassembling.
//!
//! Mirrors the teacher crate's `FalconError`: one hand-written enum with a
//! manual `Display` impl, rather than reaching for `thiserror` for what is,
//! in the end, a short closed list of variants.

use std::fmt;

/// A single error category for everything that can go wrong in this crate.
///
/// Assembly-time variants carry the source line number when one is known;
/// `line` is `None` for errors raised outside of `assemble` (ISA loading,
/// disassembly).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsmError {
    OpcodeTableMalformed,
    OpcodeTableIncomplete(Vec<u8>),

    BadNumber(String),
    BadExpression(String),
    BadIdent(String),

    UnknownMnemonic(String),
    NoMatchingForm {
        mnemonic: String,
        operands: String,
        hints: Vec<String>,
    },
    InstructionFormChanged {
        before: String,
        after: String,
    },
    BranchOutOfRange {
        from: u16,
        to: u16,
        offset: i32,
    },
    UnresolvedSymbol(String),
    OrgBackwards {
        from: u16,
        to: u16,
    },
    BeforeAnySegment(String),
    DuplicateLabel(String),
    DirectiveArity {
        name: String,
        expected: String,
        got: usize,
    },
    UnknownDirective(String),
    MissingMainSegment,
}

impl AsmError {
    /// Attaches a source line number to an assembly-time error, producing
    /// the `AsmError::WithLine` wrapper used to report where the fault is.
    pub fn at_line(self, line: u32) -> WithLine {
        WithLine { line, error: self }
    }
}

/// An [`AsmError`] tied to the source line it occurred on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithLine {
    pub line: u32,
    pub error: AsmError,
}

impl fmt::Display for WithLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.error)
    }
}

impl std::error::Error for WithLine {}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmError::OpcodeTableMalformed => write!(f, "opcode table is malformed"),
            AsmError::OpcodeTableIncomplete(missing) => write!(
                f,
                "opcode table is incomplete, missing {} of 256 opcodes ({})",
                missing.len(),
                missing
                    .iter()
                    .map(|b| format!("{:02X}", b))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            AsmError::BadNumber(text) => write!(f, "bad number: '{}'", text),
            AsmError::BadExpression(text) => write!(f, "bad expression: '{}'", text),
            AsmError::BadIdent(text) => write!(f, "bad identifier: '{}'", text),
            AsmError::UnknownMnemonic(m) => write!(f, "unknown mnemonic: {}", m),
            AsmError::NoMatchingForm {
                mnemonic,
                operands,
                hints,
            } => write!(
                f,
                "no matching form for '{} {}'. Known forms include: {}{}",
                mnemonic,
                operands,
                hints.join(", "),
                if hints.len() >= 10 { " ..." } else { "" }
            ),
            AsmError::InstructionFormChanged { before, after } => write!(
                f,
                "instruction form changed after label resolution ({} -> {}); \
                 use the `!` sigil to force absolute addressing",
                before, after
            ),
            AsmError::BranchOutOfRange { from, to, offset } => write!(
                f,
                "branch out of range from ${:04X} to ${:04X} (offset {})",
                from, to, offset
            ),
            AsmError::UnresolvedSymbol(name) => write!(f, "unresolved symbol: {}", name),
            AsmError::OrgBackwards { from, to } => {
                write!(f, ".org moves backwards (${:04X} -> ${:04X})", from, to)
            }
            AsmError::BeforeAnySegment(directive) => {
                write!(f, "'{}' appears before any segment is opened", directive)
            }
            AsmError::DuplicateLabel(name) => write!(f, "duplicate label: {}", name),
            AsmError::DirectiveArity {
                name,
                expected,
                got,
            } => write!(
                f,
                "'.{}' expects {} argument(s), got {}",
                name, expected, got
            ),
            AsmError::UnknownDirective(name) => write!(f, "unknown directive: .{}", name),
            AsmError::MissingMainSegment => {
                write!(f, "missing .org directive (main code segment)")
            }
        }
    }
}

impl std::error::Error for AsmError {}
