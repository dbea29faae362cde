//! SPC700 ISA definitions: the opcode table and the per-opcode operand
//! templates it is built from.
//!
//! Unlike the Falcon ISA (which bakes its opcode metadata into the binary
//! through a derive macro over a fixed enum), the SPC700 table used here is
//! sourced from a plain-text opcode reference at runtime and parsed once
//! into an immutable [`IsaTable`].

use std::collections::HashMap;
use std::fmt;

use crate::error::AsmError;

/// The mnemonic prefixes that are encoded with their operand chunks in
/// textual (not reversed) order. Every other multi-byte-operand mnemonic
/// stores its chunks last-to-first on the wire.
pub const NO_REVERSE_PREFIXES: [&str; 4] = ["BBC", "BBS", "CBNE", "DBNZ"];

/// The SPC700 registers that occur as bare operand tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Register {
    A,
    X,
    Y,
    Sp,
    Psw,
    Ya,
    C,
}

impl Register {
    pub fn token(self) -> &'static str {
        match self {
            Register::A => "A",
            Register::X => "X",
            Register::Y => "Y",
            Register::Sp => "SP",
            Register::Psw => "PSW",
            Register::Ya => "YA",
            Register::C => "C",
        }
    }

    pub(crate) fn from_token(tok: &str) -> Option<Self> {
        Some(match tok {
            "A" => Register::A,
            "X" => Register::X,
            "Y" => Register::Y,
            "SP" => Register::Sp,
            "PSW" => Register::Psw,
            "YA" => Register::Ya,
            "C" => Register::C,
            _ => return None,
        })
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// The implied-addressing tokens that occur as bare operand tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Implied {
    /// `(X)`
    IndX,
    /// `(Y)`
    IndY,
    /// `(X)+`
    IndXInc,
}

impl Implied {
    pub fn token(self) -> &'static str {
        match self {
            Implied::IndX => "(X)",
            Implied::IndY => "(Y)",
            Implied::IndXInc => "(X)+",
        }
    }

    pub(crate) fn from_token(tok: &str) -> Option<Self> {
        Some(match tok {
            "(X)" => Implied::IndX,
            "(Y)" => Implied::IndY,
            "(X)+" => Implied::IndXInc,
            _ => return None,
        })
    }
}

impl fmt::Display for Implied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// An index register suffix (`+X`/`+Y`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexReg {
    X,
    Y,
}

impl fmt::Display for IndexReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IndexReg::X => "X",
            IndexReg::Y => "Y",
        })
    }
}

/// One operand slot in an opcode's encoding template.
///
/// This mirrors the tagged-variant design called for in the spec: every
/// scoring, rendering and encoding path matches all of these exhaustively
/// rather than branching on ad hoc string tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperandSpec {
    Register(Register),
    Implied(Implied),
    /// A literal small integer baked into the mnemonic, e.g. the `0`..`7`
    /// in `SET1 d.0`/`CLR1 d.0`.
    Const(u8),
    /// `#i`, 1 immediate byte.
    Imm,
    /// PC-relative branch target, 1 signed byte.
    Rel,
    /// Direct-page bit, 1 byte address with the bit index baked into the
    /// template token (`d.N`).
    DpBit(u8),
    /// 13-bit absolute address + 3-bit bit index packed into 2 bytes.
    BitAbs,
    Dp,
    DpIndex(IndexReg),
    /// `[d]+Y`
    IndDpY,
    /// `[d+X]`
    IndDpX,
    Abs,
    AbsIndex(IndexReg),
    /// `[!a+X]`
    IndAbsX,
}

impl OperandSpec {
    /// Number of encoded bytes this operand contributes.
    pub fn size(&self) -> u8 {
        match self {
            OperandSpec::Register(_) | OperandSpec::Implied(_) | OperandSpec::Const(_) => 0,
            OperandSpec::Imm
            | OperandSpec::Rel
            | OperandSpec::DpBit(_)
            | OperandSpec::Dp
            | OperandSpec::DpIndex(_)
            | OperandSpec::IndDpY
            | OperandSpec::IndDpX => 1,
            OperandSpec::BitAbs | OperandSpec::Abs | OperandSpec::AbsIndex(_) | OperandSpec::IndAbsX => 2,
        }
    }

    pub fn is_bytes(&self) -> bool {
        self.size() > 0
    }

    /// The textual token this spec was parsed from, used to render operand
    /// lists that don't carry encoded bytes (registers, implied forms,
    /// consts) and in disassembly of indexed/wrapped forms.
    pub fn token(&self) -> String {
        match self {
            OperandSpec::Register(r) => r.token().to_string(),
            OperandSpec::Implied(i) => i.token().to_string(),
            OperandSpec::Const(n) => n.to_string(),
            OperandSpec::Imm => "#i".to_string(),
            OperandSpec::Rel => "r".to_string(),
            OperandSpec::DpBit(bit) => format!("d.{}", bit),
            OperandSpec::BitAbs => "m.b".to_string(),
            OperandSpec::Dp => "d".to_string(),
            OperandSpec::DpIndex(ix) => format!("d+{}", ix),
            OperandSpec::IndDpY => "[d]+Y".to_string(),
            OperandSpec::IndDpX => "[d+X]".to_string(),
            OperandSpec::Abs => "!a".to_string(),
            OperandSpec::AbsIndex(ix) => format!("!a+{}", ix),
            OperandSpec::IndAbsX => "[!a+X]".to_string(),
        }
    }

    pub(crate) fn from_token(tok: &str) -> Option<Self> {
        let t = tok.trim();

        if let Ok(n) = t.parse::<u8>() {
            if t.chars().all(|c| c.is_ascii_digit()) {
                return Some(OperandSpec::Const(n));
            }
        }

        if let Some(reg) = Register::from_token(t) {
            return Some(OperandSpec::Register(reg));
        }
        if let Some(imp) = Implied::from_token(t) {
            return Some(OperandSpec::Implied(imp));
        }

        if t == "#i" || t == "up" {
            return Some(OperandSpec::Imm);
        }
        if t == "r" {
            return Some(OperandSpec::Rel);
        }
        if t == "m.b" {
            return Some(OperandSpec::BitAbs);
        }

        if let Some(bit_str) = t.strip_prefix("d.") {
            if bit_str == "#" {
                return Some(OperandSpec::DpBit(0));
            }
            if let Ok(bit) = bit_str.parse::<u8>() {
                if bit <= 7 {
                    return Some(OperandSpec::DpBit(bit));
                }
            }
            return None;
        }

        if t == "d" {
            return Some(OperandSpec::Dp);
        }
        if t == "d+X" {
            return Some(OperandSpec::DpIndex(IndexReg::X));
        }
        if t == "d+Y" {
            return Some(OperandSpec::DpIndex(IndexReg::Y));
        }
        if t.starts_with("[d]+Y") {
            return Some(OperandSpec::IndDpY);
        }
        if t.starts_with("[d+X]") {
            return Some(OperandSpec::IndDpX);
        }

        if t.starts_with("[!a+X]") {
            return Some(OperandSpec::IndAbsX);
        }
        if t == "!a" {
            return Some(OperandSpec::Abs);
        }
        if t == "!a+X" {
            return Some(OperandSpec::AbsIndex(IndexReg::X));
        }
        if t == "!a+Y" {
            return Some(OperandSpec::AbsIndex(IndexReg::Y));
        }
        if t.starts_with("!a") {
            return Some(OperandSpec::Abs);
        }

        None
    }
}

/// One row of the opcode table: everything the assembler and disassembler
/// need to know about a single opcode byte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpcodeEntry {
    pub opcode: u8,
    pub mnemonic: String,
    /// The normalized `MNEMONIC op1, op2` text this entry was parsed from,
    /// used for diagnostics (`NoMatchingForm` hints).
    pub template: String,
    pub operands: Vec<OperandSpec>,
    pub length: u8,
    pub reverse_chunks: bool,
}

impl OpcodeEntry {
    fn new(opcode: u8, template: String, mnemonic: String, operands: Vec<OperandSpec>, length: u8) -> Self {
        let byte_ops = operands.iter().filter(|o| o.is_bytes()).count();
        let reverse_chunks =
            byte_ops > 1 && !NO_REVERSE_PREFIXES.iter().any(|p| mnemonic.starts_with(p));

        OpcodeEntry {
            opcode,
            mnemonic,
            template,
            operands,
            length,
            reverse_chunks,
        }
    }
}

/// The fully parsed, immutable SPC700 opcode table.
///
/// Constructed once via [`IsaTable::load`] and safe to share (by reference
/// or inside an `Arc`) across any number of assemble/disassemble calls.
pub struct IsaTable {
    by_opcode: Vec<OpcodeEntry>,
    by_mnemonic: HashMap<String, Vec<u8>>,
}

impl IsaTable {
    /// Parses a textual SPC700 opcode reference (in the format documented
    /// by Anomie's `spc700.txt`) into a complete, validated opcode table.
    pub fn load(text: &str) -> Result<Self, AsmError> {
        let header_idx = text
            .lines()
            .position(|line| is_header_line(line))
            .ok_or(AsmError::OpcodeTableMalformed)?;

        let mut by_opcode: Vec<Option<OpcodeEntry>> = (0..256).map(|_| None).collect();

        for line in text.lines().skip(header_idx + 1) {
            let line = line.trim_end();
            if line.trim().is_empty() {
                continue;
            }
            if let Some(entry) = parse_row(line)? {
                by_opcode[entry.opcode as usize] = Some(entry);
            }
        }

        let missing: Vec<u8> = (0u16..256)
            .filter(|&op| by_opcode[op as usize].is_none())
            .map(|op| op as u8)
            .collect();
        if !missing.is_empty() {
            return Err(AsmError::OpcodeTableIncomplete(missing));
        }

        let by_opcode: Vec<OpcodeEntry> = by_opcode.into_iter().map(|e| e.unwrap()).collect();

        let mut by_mnemonic: HashMap<String, Vec<u8>> = HashMap::new();
        for entry in &by_opcode {
            by_mnemonic
                .entry(entry.mnemonic.clone())
                .or_default()
                .push(entry.opcode);
        }

        Ok(IsaTable {
            by_opcode,
            by_mnemonic,
        })
    }

    pub fn entry(&self, opcode: u8) -> &OpcodeEntry {
        &self.by_opcode[opcode as usize]
    }

    /// Candidate opcode entries sharing a mnemonic (case-insensitive,
    /// mnemonics are always stored uppercase).
    pub fn forms(&self, mnemonic: &str) -> Vec<&OpcodeEntry> {
        match self.by_mnemonic.get(mnemonic) {
            Some(opcodes) => opcodes.iter().map(|&op| self.entry(op)).collect(),
            None => Vec::new(),
        }
    }
}

fn is_header_line(line: &str) -> bool {
    let markers = ["Mnemonic", "Code", "Bytes", "Cyc", "NVPBHIZC"];
    let mut rest = line;
    for marker in markers.iter() {
        match rest.find(marker) {
            Some(idx) => rest = &rest[idx + marker.len()..],
            None => return false,
        }
    }
    true
}

const FLAG_CHARS: &str = "NVPBHIZC.01";

fn is_flags_token(tok: &str) -> bool {
    tok.len() == 8 && tok.chars().all(|c| FLAG_CHARS.contains(c))
}

fn is_cycle_token(tok: &str) -> bool {
    if tok == "?" {
        return true;
    }
    let mut parts = tok.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(a), None, None) => !a.is_empty() && a.chars().all(|c| c.is_ascii_digit()),
        (Some(a), Some(b), None) => {
            !a.is_empty()
                && !b.is_empty()
                && a.chars().all(|c| c.is_ascii_digit())
                && b.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

fn is_bytes_token(tok: &str) -> bool {
    matches!(tok, "1" | "2" | "3")
}

fn is_code_token(tok: &str) -> bool {
    tok.len() == 2 && tok.chars().all(|c| c.is_ascii_hexdigit())
}

/// Parses one data row of the opcode table.
///
/// A row looks like:
/// `MOV A, #i        E8 2 2    A = i          NZ......`
/// i.e. mnemonic-and-operands, a 2-hex-digit opcode, a 1-3 byte count, a
/// cycle count (`N`, `N/M` or `?`), an arbitrary operation description, and
/// an 8-character flags column. We locate the `code bytes cyc` triple by
/// scanning for the first token window that matches all three shapes, then
/// treat everything before it as the mnemonic/operand text and the trailing
/// token as the flags column (ignoring the operation description between).
fn parse_row(line: &str) -> Result<Option<OpcodeEntry>, AsmError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 4 {
        return Ok(None);
    }

    if !is_flags_token(tokens[tokens.len() - 1]) {
        return Ok(None);
    }

    let mut split_at = None;
    for i in 0..tokens.len().saturating_sub(2) {
        if is_code_token(tokens[i]) && is_bytes_token(tokens[i + 1]) && is_cycle_token(tokens[i + 2])
        {
            split_at = Some(i);
            break;
        }
    }
    let split_at = match split_at {
        Some(i) => i,
        None => return Ok(None),
    };
    if split_at == 0 {
        return Err(AsmError::OpcodeTableMalformed);
    }

    let opcode = u8::from_str_radix(tokens[split_at], 16).map_err(|_| AsmError::OpcodeTableMalformed)?;
    let length: u8 = tokens[split_at + 1]
        .parse()
        .map_err(|_| AsmError::OpcodeTableMalformed)?;

    let template_raw = tokens[..split_at].join(" ");
    let template = normalize_template(&template_raw);
    let (mnemonic, operand_tokens) = split_template(&template);

    let operands: Result<Vec<OperandSpec>, AsmError> = operand_tokens
        .iter()
        .map(|tok| OperandSpec::from_token(tok).ok_or(AsmError::OpcodeTableMalformed))
        .collect();
    let operands = operands?;

    let encoded_size: u8 = operands.iter().map(|o| o.size()).sum();
    if encoded_size + 1 != length {
        return Err(AsmError::OpcodeTableMalformed);
    }

    Ok(Some(OpcodeEntry::new(opcode, template, mnemonic, operands, length)))
}

fn normalize_template(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .split(' ')
        .map(|word| {
            // `dd`/`ds` are synonyms for the direct-page size hint `d`, but
            // only as a standalone token (never inside `d.3` etc.).
            if word == "dd" || word == "ds" {
                "d".to_string()
            } else if word.contains(',') {
                word.split(',')
                    .map(|w| if w == "dd" || w == "ds" { "d" } else { w })
                    .collect::<Vec<_>>()
                    .join(",")
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn split_template(template: &str) -> (String, Vec<String>) {
    match template.find(' ') {
        None => (template.to_string(), Vec::new()),
        Some(idx) => {
            let mnemonic = template[..idx].to_string();
            let rest = template[idx + 1..].trim();
            if rest.is_empty() {
                (mnemonic, Vec::new())
            } else {
                let operands = rest.split(',').map(|s| s.trim().to_string()).collect();
                (mnemonic, operands)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_TABLE: &str = "\
Mnemonic     Code Bytes Cyc  Operation       NVPBHIZC
NOP          00   1     2    do nothing      ........
SET1 d.0     02   2     4    d.0 = 1         ........
CLR1 d.0     12   2     4    d.0 = 0         ........
OR A,#i      08   2     2    A = A | i       N.....Z.
MOV A,#i     E8   2     2    A = i           N.....Z.
MOV A,d      E4   2     3    A = (d)         N.....Z.
MOV A,!a     E5   3     4    A = (a)         N.....Z.
BNE r        D0   2   2/4    if !Z then jump ........
BBC d.2,r    13   3   5/7    jump if d.2 = 0 ........
SET1 d.7     E2   2     4    d.7 = 1         ........
";

    fn full_table() -> String {
        let mut lines = vec![
            "Mnemonic     Code Bytes Cyc  Operation       NVPBHIZC".to_string(),
        ];
        for op in 0u16..256 {
            if op == 0x00 {
                lines.push("NOP          00   1     2    do nothing      ........".to_string());
            } else if op == 0x02 {
                lines.push("SET1 d.0     02   2     4    d.0 = 1         ........".to_string());
            } else if op == 0x12 {
                lines.push("CLR1 d.0     12   2     4    d.0 = 0         ........".to_string());
            } else if op == 0x08 {
                lines.push("OR A,#i      08   2     2    A = A | i       N.....Z.".to_string());
            } else if op == 0xE8 {
                lines.push("MOV A,#i     E8   2     2    A = i           N.....Z.".to_string());
            } else if op == 0xE4 {
                lines.push("MOV A,d      E4   2     3    A = (d)         N.....Z.".to_string());
            } else if op == 0xE5 {
                lines.push("MOV A,!a     E5   3     4    A = (a)         N.....Z.".to_string());
            } else if op == 0xD0 {
                lines.push("BNE r        D0   2   2/4    if !Z then jump ........".to_string());
            } else if op == 0x13 {
                lines.push("BBC d.2,r    13   3   5/7    jump if d.2 = 0 ........".to_string());
            } else if op == 0xE2 {
                lines.push("SET1 d.7     E2   2     4    d.7 = 1         ........".to_string());
            } else {
                lines.push(format!(
                    "NOP{:02X}        {:02X}   1     2    filler          ........",
                    op, op
                ));
            }
        }
        lines.join("\n")
    }

    #[test]
    fn parses_known_row() {
        let entry = parse_row("MOV A,#i     E8   2     2    A = i           N.....Z.")
            .unwrap()
            .unwrap();
        assert_eq!(entry.opcode, 0xE8);
        assert_eq!(entry.mnemonic, "MOV");
        assert_eq!(entry.operands, vec![OperandSpec::Register(Register::A), OperandSpec::Imm]);
        assert_eq!(entry.length, 2);
    }

    #[test]
    fn bbc_is_not_reversed() {
        let entry = parse_row("BBC d.2,r    13   3   5/7    jump if d.2 = 0 ........")
            .unwrap()
            .unwrap();
        assert!(!entry.reverse_chunks);
    }

    #[test]
    fn single_byte_operand_is_never_reversed() {
        // Only one byte-carrying operand, so the reversal rule never kicks
        // in regardless of mnemonic.
        let entry = parse_row("TSET1 !a     0E   3     6    test and set    N.....Z.")
            .unwrap()
            .unwrap();
        assert!(!entry.reverse_chunks);
    }

    #[test]
    fn two_byte_operands_reverse_unless_excluded() {
        let entry = parse_row("MOV d,#i     8F   3     5    (d) = i         ........")
            .unwrap()
            .unwrap();
        assert!(entry.reverse_chunks);
    }

    #[test]
    fn complete_table_has_256_entries() {
        let isa = IsaTable::load(&full_table()).unwrap();
        for op in 0u16..256 {
            assert_eq!(isa.entry(op as u8).opcode, op as u8);
        }
    }

    #[test]
    fn missing_header_is_malformed() {
        let err = IsaTable::load("nothing to see here").unwrap_err();
        assert!(matches!(err, AsmError::OpcodeTableMalformed));
    }

    #[test]
    fn incomplete_table_reports_missing() {
        let err = IsaTable::load(SAMPLE_TABLE).unwrap_err();
        assert!(matches!(err, AsmError::OpcodeTableIncomplete(_)));
    }

    #[test]
    fn dd_ds_synonyms_normalize_to_d() {
        assert_eq!(normalize_template("MOV dd,#i"), "MOV d,#i");
        assert_eq!(normalize_template("MOV ds,Y"), "MOV d,Y");
    }
}
