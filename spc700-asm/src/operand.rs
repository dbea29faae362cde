//! Parsed source operands, as opposed to the encoding templates in
//! [`crate::isa`]: what the user actually wrote on one operand's worth of
//! assembly text.

use crate::error::AsmError;
use crate::isa::{Implied, IndexReg, Register};
use crate::numeric;

/// The coarse shape of one parsed operand. Distinct from
/// [`crate::isa::OperandSpec`], which describes what an opcode *expects*;
/// this describes what the source text actually *is*.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParsedKind {
    Reg,
    Implied,
    Const,
    Imm,
    Mem,
    Bit,
    IndDpY,
    IndX,
    Ind,
}

/// One operand as written by the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedOperand {
    pub kind: ParsedKind,
    pub text: String,
    pub value: Option<i64>,
    pub symbol: Option<String>,
    pub bit: Option<u8>,
    pub index: Option<IndexReg>,
    pub force_abs: bool,
}

impl ParsedOperand {
    fn new(kind: ParsedKind, text: &str) -> Self {
        ParsedOperand {
            kind,
            text: text.to_string(),
            value: None,
            symbol: None,
            bit: None,
            index: None,
            force_abs: false,
        }
    }

    /// Renders this operand back to the text an assembler would accept,
    /// used in diagnostics (`NoMatchingForm`).
    pub fn render(&self) -> &str {
        &self.text
    }
}

/// Parses one trimmed operand token into a [`ParsedOperand`], following the
/// ordered rule list of the spec: registers and implied forms first, then
/// constants, immediates, bracketed memory accesses, bit suffixes, index
/// suffixes, the `!` absolute-forcing sigil, and finally a bare memory
/// reference.
pub fn parse_operand(s: &str) -> Result<ParsedOperand, AsmError> {
    let t = s.trim();
    if t.is_empty() {
        return Err(AsmError::BadExpression(s.to_string()));
    }
    let up = t.to_ascii_uppercase();

    if Register::from_token(&up).is_some() {
        return Ok(ParsedOperand::new(ParsedKind::Reg, &up));
    }
    if Implied::from_token(&up).is_some() {
        return Ok(ParsedOperand::new(ParsedKind::Implied, &up));
    }
    if !t.is_empty() && t.chars().all(|c| c.is_ascii_digit()) {
        let mut op = ParsedOperand::new(ParsedKind::Const, t);
        op.value = Some(t.parse::<i64>().map_err(|_| AsmError::BadNumber(t.to_string()))?);
        return Ok(op);
    }

    if let Some(rest) = t.strip_prefix('#') {
        let expr = rest.trim();
        let mut op = ParsedOperand::new(ParsedKind::Imm, t);
        if numeric::is_ident(expr) {
            op.symbol = Some(expr.to_string());
        } else {
            op.value = Some(numeric::parse_int(expr).ok_or_else(|| AsmError::BadNumber(expr.to_string()))?);
        }
        return Ok(op);
    }

    if let Some(inner) = strip_ind_dp_y(t) {
        let mut mem = parse_operand(inner)?;
        mem.kind = ParsedKind::IndDpY;
        mem.index = Some(IndexReg::Y);
        mem.text = t.to_string();
        return Ok(mem);
    }

    if let Some(inner) = strip_brackets(t) {
        let mut mem = parse_operand(inner)?;
        mem.kind = if mem.index == Some(IndexReg::X) {
            ParsedKind::IndX
        } else {
            ParsedKind::Ind
        };
        mem.text = t.to_string();
        return Ok(mem);
    }

    if let Some((base, bit)) = split_bit_suffix(t) {
        let mut force_abs = false;
        let base = if let Some(rest) = base.strip_prefix('!') {
            force_abs = true;
            rest.trim()
        } else {
            base
        };

        let mut op = ParsedOperand::new(ParsedKind::Bit, t);
        op.bit = Some(bit);
        op.force_abs = force_abs;
        if numeric::is_ident(base) {
            op.symbol = Some(base.to_string());
        } else {
            op.value = Some(numeric::parse_int(base).ok_or_else(|| AsmError::BadNumber(base.to_string()))?);
        }
        return Ok(op);
    }

    let (base, index) = strip_index_suffix(t);
    let mut force_abs = false;
    let base = if let Some(rest) = base.strip_prefix('!') {
        force_abs = true;
        rest.trim()
    } else {
        base
    };

    let mut op = ParsedOperand::new(ParsedKind::Mem, t);
    op.index = index;
    op.force_abs = force_abs;
    if numeric::is_ident(base) {
        op.symbol = Some(base.to_string());
    } else {
        op.value = Some(numeric::parse_int(base).ok_or_else(|| AsmError::BadNumber(base.to_string()))?);
    }
    Ok(op)
}

fn strip_ind_dp_y(t: &str) -> Option<&str> {
    if !t.starts_with('[') {
        return None;
    }
    let upper_suffix = t.len() >= 2 && t[t.len() - 2..].eq_ignore_ascii_case("+y");
    if !upper_suffix {
        return None;
    }
    let close = t.rfind(']')?;
    if close != t.len() - 3 {
        return None;
    }
    Some(t[1..close].trim())
}

fn strip_brackets(t: &str) -> Option<&str> {
    if t.starts_with('[') && t.ends_with(']') {
        Some(t[1..t.len() - 1].trim())
    } else {
        None
    }
}

/// Splits off a trailing `.N` bit-index suffix, if present.
fn split_bit_suffix(t: &str) -> Option<(&str, u8)> {
    let dot = t.rfind('.')?;
    let bit_str = &t[dot + 1..];
    if bit_str.is_empty() || !bit_str.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let bit: u8 = bit_str.parse().ok()?;
    Some((t[..dot].trim(), bit))
}

/// Splits off a trailing `+X`/`+Y` index-register suffix, if present.
fn strip_index_suffix(t: &str) -> (&str, Option<IndexReg>) {
    let up = t.to_ascii_uppercase();
    if up.ends_with("+X") {
        (t[..t.len() - 2].trim(), Some(IndexReg::X))
    } else if up.ends_with("+Y") {
        (t[..t.len() - 2].trim(), Some(IndexReg::Y))
    } else {
        (t, None)
    }
}

/// Either a pure integer, or `label [+ const]` resolved against the label
/// table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueExpr {
    pub label: Option<String>,
    pub addend: i64,
    pub value: Option<i64>,
}

impl ValueExpr {
    pub fn eval(&self, labels: &crate::segment::LabelMap) -> Result<i64, AsmError> {
        if let Some(value) = self.value {
            return Ok(value + self.addend);
        }
        let label = self.label.as_ref().expect("ValueExpr must carry a label or a value");
        match labels.get(label) {
            Some(&addr) => Ok(addr as i64 + self.addend),
            None => Err(AsmError::UnresolvedSymbol(label.clone())),
        }
    }
}

/// Parses `label [+/- const]` or a pure numeric literal.
pub fn parse_value_expr(s: &str) -> Result<ValueExpr, AsmError> {
    let t = s.trim();
    if t.is_empty() {
        return Err(AsmError::BadExpression(s.to_string()));
    }

    if let Some(value) = numeric::parse_int(t) {
        return Ok(ValueExpr {
            label: None,
            addend: 0,
            value: Some(value),
        });
    }

    for (i, c) in t.char_indices() {
        if c == '+' || c == '-' {
            let (label_part, rest) = t.split_at(i);
            let label_part = label_part.trim();
            if !numeric::is_ident(label_part) {
                continue;
            }
            let sign = if c == '-' { -1 } else { 1 };
            let num_part = rest[1..].trim();
            let num = numeric::parse_int(num_part).ok_or_else(|| AsmError::BadExpression(s.to_string()))?;
            return Ok(ValueExpr {
                label: Some(label_part.to_string()),
                addend: sign * num,
                value: None,
            });
        }
    }

    if numeric::is_ident(t) {
        return Ok(ValueExpr {
            label: Some(t.to_string()),
            addend: 0,
            value: None,
        });
    }

    Err(AsmError::BadExpression(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn parses_register() {
        let op = parse_operand("a").unwrap();
        assert_eq!(op.kind, ParsedKind::Reg);
        assert_eq!(op.text, "A");
    }

    #[test]
    fn parses_implied() {
        let op = parse_operand("(X)+").unwrap();
        assert_eq!(op.kind, ParsedKind::Implied);
    }

    #[test]
    fn parses_immediate_symbol_and_value() {
        let sym = parse_operand("#SomeLabel").unwrap();
        assert_eq!(sym.kind, ParsedKind::Imm);
        assert_eq!(sym.symbol.as_deref(), Some("SomeLabel"));

        let val = parse_operand("#$12").unwrap();
        assert_eq!(val.kind, ParsedKind::Imm);
        assert_eq!(val.value, Some(0x12));
    }

    #[test]
    fn parses_indirect_dp_y() {
        let op = parse_operand("[$10]+Y").unwrap();
        assert_eq!(op.kind, ParsedKind::IndDpY);
        assert_eq!(op.value, Some(0x10));
    }

    #[test]
    fn parses_indirect_dp_x() {
        let op = parse_operand("[$10+X]").unwrap();
        assert_eq!(op.kind, ParsedKind::IndX);
        assert_eq!(op.index, Some(IndexReg::X));
    }

    #[test]
    fn parses_bit_with_force_abs() {
        let op = parse_operand("!$1234.5").unwrap();
        assert_eq!(op.kind, ParsedKind::Bit);
        assert_eq!(op.bit, Some(5));
        assert!(op.force_abs);
        assert_eq!(op.value, Some(0x1234));
    }

    #[test]
    fn parses_indexed_memory() {
        let op = parse_operand("$10+X").unwrap();
        assert_eq!(op.kind, ParsedKind::Mem);
        assert_eq!(op.index, Some(IndexReg::X));
        assert_eq!(op.value, Some(0x10));
    }

    #[test]
    fn parses_plain_symbol() {
        let op = parse_operand("L1").unwrap();
        assert_eq!(op.kind, ParsedKind::Mem);
        assert_eq!(op.symbol.as_deref(), Some("L1"));
    }

    #[test]
    fn value_expr_label_with_addend() {
        let expr = parse_value_expr("L1+4").unwrap();
        let mut labels = HashMap::new();
        labels.insert("L1".to_string(), 0x10);
        assert_eq!(expr.eval(&labels).unwrap(), 0x14);
    }

    #[test]
    fn value_expr_label_with_negative_addend() {
        let expr = parse_value_expr("L1-4").unwrap();
        let mut labels = HashMap::new();
        labels.insert("L1".to_string(), 0x10);
        assert_eq!(expr.eval(&labels).unwrap(), 0x0C);
    }

    #[test]
    fn value_expr_pure_integer() {
        let expr = parse_value_expr("$FF").unwrap();
        assert_eq!(expr.eval(&HashMap::new()).unwrap(), 0xFF);
    }

    #[test]
    fn value_expr_unresolved_symbol() {
        let expr = parse_value_expr("Missing").unwrap();
        let err = expr.eval(&HashMap::new()).unwrap_err();
        assert!(matches!(err, AsmError::UnresolvedSymbol(_)));
    }
}
