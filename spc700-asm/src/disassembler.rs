//! The SPC700 disassembler: buffer + origin in, assembly text out.
//!
//! A single segment is handled by [`disassemble_segment`]; [`disassemble_program`]
//! is the multi-segment entry point a driver uses to disassemble a main
//! extension plus its hook patches against one shared label map, mirroring
//! the original tool's `extract_from_config`.

use byteorder::{ByteOrder, LittleEndian};

use crate::isa::{IndexReg, IsaTable, OpcodeEntry, OperandSpec};
use crate::segment::{auto_label_name, LabelMap, Segment, SegmentKind};

/// One disassembled segment, ready to be written out by a driver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisassembledSegment {
    pub kind: SegmentKind,
    pub origin: u16,
    pub name: Option<String>,
    pub text: String,
}

/// The disassembly of a whole multi-segment program: a main segment plus
/// zero or more named patches, all resolved against one combined label map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Program {
    pub segments: Vec<DisassembledSegment>,
}

fn sign8(v: u8) -> i32 {
    if v & 0x80 != 0 {
        v as i32 - 0x100
    } else {
        v as i32
    }
}

/// One decoded instruction or pseudo-op, prior to text rendering.
///
/// There is no "unrecognized opcode" case here: [`IsaTable::load`] only ever
/// produces a complete 256-entry table, so every opcode byte decodes to some
/// entry. The only irregular case is a truncated trailing instruction whose
/// operand bytes run past the end of the buffer.
enum Decoded<'a> {
    Insn { entry: &'a OpcodeEntry, raw: &'a [u8] },
    Tail(&'a [u8]),
}

/// Walks `data` starting at PC `origin`, yielding one decoded item per step
/// along with the PC it starts at.
fn decode_stream<'a>(isa: &'a IsaTable, data: &'a [u8], origin: u16) -> Vec<(u16, Decoded<'a>)> {
    let mut out = Vec::new();
    let mut pc = origin;
    let mut i = 0usize;

    while i < data.len() {
        let entry = isa.entry(data[i]);
        let len = entry.length as usize;

        if i + len > data.len() {
            out.push((pc, Decoded::Tail(&data[i..])));
            break;
        }

        out.push((pc, Decoded::Insn { entry, raw: &data[i..i + len] }));
        i += len;
        pc = pc.wrapping_add(len as u16);
    }

    out
}

/// Splits an instruction's operand-byte region into per-operand chunks,
/// undoing [`OpcodeEntry::reverse_chunks`] so the returned chunks line up
/// with `entry.operands` in textual left-to-right order.
fn split_chunks<'a>(entry: &OpcodeEntry, enc: &'a [u8]) -> Vec<&'a [u8]> {
    let sizes: Vec<usize> = entry
        .operands
        .iter()
        .filter(|o| o.is_bytes())
        .map(|o| o.size() as usize)
        .collect();

    let sizes_for_read: Vec<usize> = if entry.reverse_chunks {
        sizes.iter().rev().copied().collect()
    } else {
        sizes.clone()
    };

    let mut chunks_read = Vec::with_capacity(sizes_for_read.len());
    let mut idx = 0;
    for sz in sizes_for_read {
        chunks_read.push(&enc[idx..idx + sz]);
        idx += sz;
    }

    if entry.reverse_chunks {
        chunks_read.into_iter().rev().collect()
    } else {
        chunks_read
    }
}

/// Looks a label up by address via reverse scan of the combined map. Used
/// only at rendering time; the map is small (one entry per branch/absolute
/// target actually present in the segments being disassembled).
fn label_for(addr: u16, labels: Option<&LabelMap>) -> Option<String> {
    labels.and_then(|m| m.iter().find(|(_, &a)| a == addr).map(|(n, _)| n.clone()))
}

fn fmt_addr(addr: u16, labels: Option<&LabelMap>) -> String {
    label_for(addr, labels).unwrap_or_else(|| format!("${:04X}", addr))
}

/// Renders one decoded instruction to assembly text and collects the
/// absolute/branch targets it references, following the operand rendering
/// rules of the spec (`Imm` -> `#$HH`, direct-page family -> `$HH` with
/// index/wrapping suffixes, `Abs`/`Rel` -> label or `$HHHH`, bit operands ->
/// `$HH.<bit>` / `TARGET.<bit>`).
fn render_entry(entry: &OpcodeEntry, raw: &[u8], pc: u16, labels: Option<&LabelMap>) -> (String, Vec<u16>) {
    let enc = &raw[1..];
    let chunks = split_chunks(entry, enc);

    let mut final_ops = Vec::with_capacity(entry.operands.len());
    let mut targets = Vec::new();
    let mut ci = 0;

    for spec in &entry.operands {
        if !spec.is_bytes() {
            final_ops.push(spec.token());
            continue;
        }

        let b = chunks[ci];
        ci += 1;

        let rendered = match spec {
            OperandSpec::Imm => format!("#${:02X}", b[0]),
            OperandSpec::Dp | OperandSpec::DpIndex(_) | OperandSpec::IndDpY | OperandSpec::IndDpX => {
                format!("${:02X}", b[0])
            }
            OperandSpec::Abs | OperandSpec::AbsIndex(_) | OperandSpec::IndAbsX => {
                let w = LittleEndian::read_u16(b);
                targets.push(w);
                fmt_addr(w, labels)
            }
            OperandSpec::Rel => {
                let off = sign8(b[0]);
                let tgt = (pc as i32 + entry.length as i32 + off) as u16;
                targets.push(tgt);
                fmt_addr(tgt, labels)
            }
            OperandSpec::DpBit(bit) => format!("${:02X}.{}", b[0], bit),
            OperandSpec::BitAbs => {
                let w = LittleEndian::read_u16(b);
                let addr = w & 0x1FFF;
                let bit = (w >> 13) & 7;
                targets.push(addr);
                format!("{}.{}", fmt_addr(addr, labels), bit)
            }
            _ => unreachable!("byte-carrying operand spec not covered"),
        };

        let wrapped = match spec {
            OperandSpec::IndDpY => format!("[{}]+Y", rendered),
            OperandSpec::IndDpX | OperandSpec::IndAbsX => format!("[{}+X]", rendered),
            OperandSpec::DpIndex(IndexReg::X) | OperandSpec::AbsIndex(IndexReg::X) => {
                format!("{}+X", rendered)
            }
            OperandSpec::DpIndex(IndexReg::Y) | OperandSpec::AbsIndex(IndexReg::Y) => {
                format!("{}+Y", rendered)
            }
            _ => rendered,
        };

        final_ops.push(wrapped);
    }

    let mut asm = entry.mnemonic.clone();
    if !final_ops.is_empty() {
        asm.push(' ');
        asm.push_str(&final_ops.join(", "));
    }
    (asm, targets)
}

/// First pass: walks a single segment and returns every branch/absolute
/// target it references. A truncated tail instruction ends scanning without
/// contributing a target.
pub fn scan_targets(isa: &IsaTable, data: &[u8], origin: u16) -> Vec<u16> {
    let mut targets = Vec::new();
    for (pc, decoded) in decode_stream(isa, data, origin) {
        if let Decoded::Insn { entry, raw } = decoded {
            let (_, t) = render_entry(entry, raw, pc, None);
            targets.extend(t);
        }
    }
    targets
}

fn hex_spaced(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect::<Vec<_>>().join(" ")
}

/// Disassembles one segment's worth of bytes into assembly text.
///
/// `labels` is the combined label map a driver builds across all segments
/// of the program (see [`disassemble_program`]); pass `None` for a one-shot
/// disassembly with no label resolution (e.g. `disasm-hex`). `header`, when
/// given, is emitted verbatim as the first line (`.org $xxxx` or
/// `.patch $xxxx[, "Name"]`).
pub fn disassemble_segment(
    isa: &IsaTable,
    data: &[u8],
    origin: u16,
    labels: Option<&LabelMap>,
    header: Option<&str>,
) -> String {
    let mut lines = Vec::new();
    if let Some(h) = header {
        lines.push(h.to_string());
    }

    for (pc, decoded) in decode_stream(isa, data, origin) {
        if let Some(name) = label_for(pc, labels) {
            lines.push(format!("{}:", name));
        }

        let (asm, raw): (String, &[u8]) = match decoded {
            Decoded::Insn { entry, raw } => (render_entry(entry, raw, pc, labels).0, raw),
            Decoded::Tail(tail) => {
                let list = tail.iter().map(|b| format!("${:02X}", b)).collect::<Vec<_>>().join(", ");
                (format!(".byte {}", list), tail)
            }
        };

        lines.push(format!("    {:<28} ; {}", asm, hex_spaced(raw)));
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

/// Multi-segment disassembly: builds one combined label map across every
/// segment (a target only becomes a label if it falls inside some known
/// segment's range, via [`Segment::contains`]), then disassembles each
/// segment against it.
pub fn disassemble_program(isa: &IsaTable, segments: &[Segment]) -> Program {
    let in_any_range = |addr: u16| segments.iter().any(|s| s.contains(addr));

    let mut all_targets = Vec::new();
    for seg in segments {
        all_targets.extend(scan_targets(isa, &seg.data, seg.origin));
    }
    all_targets.sort_unstable();
    all_targets.dedup();

    let mut labels: LabelMap = LabelMap::new();
    for target in all_targets {
        if in_any_range(target) {
            labels.entry(auto_label_name(target)).or_insert(target);
        }
    }

    let mut out = Vec::with_capacity(segments.len());
    for seg in segments {
        let header = match (seg.kind, &seg.name) {
            (SegmentKind::Main, _) => format!(".org ${:04X}", seg.origin),
            (SegmentKind::Patch, Some(n)) => format!(".patch ${:04X}, \"{}\"", seg.origin, n),
            (SegmentKind::Patch, None) => format!(".patch ${:04X}", seg.origin),
        };
        let text = disassemble_segment(isa, &seg.data, seg.origin, Some(&labels), Some(&header));
        out.push(DisassembledSegment {
            kind: seg.kind,
            origin: seg.origin,
            name: seg.name.clone(),
            text,
        });
    }

    Program { segments: out }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::IsaTable;

    fn full_table() -> String {
        let mut lines = vec!["Mnemonic     Code Bytes Cyc  Operation       NVPBHIZC".to_string()];
        for op in 0u16..256 {
            let row = match op {
                0x00 => "NOP          00   1     2    do nothing      ........".to_string(),
                0xE8 => "MOV A,#i     E8   2     2    A = i           N.....Z.".to_string(),
                0xE4 => "MOV A,d      E4   2     3    A = (d)         N.....Z.".to_string(),
                0xE5 => "MOV A,!a     E5   3     4    A = (a)         N.....Z.".to_string(),
                0xD0 => "BNE r        D0   2   2/4    if !Z then jump ........".to_string(),
                0x13 => "BBC d.2,r    13   3   5/7    jump if d.2 = 0 ........".to_string(),
                0x02 => "SET1 d.0     02   2     4    d.0 = 1         ........".to_string(),
                0x0A => "SET1 m.b     0A   3     4    m.b = 1         ........".to_string(),
                _ => format!(
                    "NOP{:02X}        {:02X}   1     2    filler          ........",
                    op, op
                ),
            };
            lines.push(row);
        }
        lines.join("\n")
    }

    #[test]
    fn decodes_simple_mov_immediate() {
        let isa = IsaTable::load(&full_table()).unwrap();
        let text = disassemble_segment(&isa, &[0xE8, 0x12], 0x0200, None, None);
        assert!(text.contains("MOV A, #$12"));
    }

    #[test]
    fn branch_target_becomes_a_label() {
        let isa = IsaTable::load(&full_table()).unwrap();
        // BNE +0 lands right back on the following NOP.
        let data = vec![0xD0, 0x00, 0x00];
        let segments = [Segment::new(SegmentKind::Main, 0x0200, data, None)];
        let program = disassemble_program(&isa, &segments);
        let text = &program.segments[0].text;
        assert!(text.contains("BNE L0202"));
        assert!(text.contains("L0202:"));
    }

    #[test]
    fn truncated_tail_emits_byte_list() {
        let isa = IsaTable::load(&full_table()).unwrap();
        // MOV A,!a is 3 bytes; only 2 are supplied.
        let text = disassemble_segment(&isa, &[0xE5, 0x34], 0x0000, None, None);
        assert!(text.contains(".byte $34"));
    }

    #[test]
    fn bitabs_packs_and_unpacks_addr_and_bit() {
        let isa = IsaTable::load(&full_table()).unwrap();
        // ((5 << 13) | 0x1234) = 0xB234, little-endian bytes 34 B2.
        let text = disassemble_segment(&isa, &[0x0A, 0x34, 0xB2], 0x0000, None, None);
        assert!(text.contains("$1234.5"));
    }

    #[test]
    fn disassemble_program_keeps_patch_headers_and_local_labels() {
        let isa = IsaTable::load(&full_table()).unwrap();
        let main = vec![0x00u8];
        let patch = vec![0xD0, 0x01, 0x00, 0x00];
        let segments = [
            Segment::new(SegmentKind::Main, 0x0100, main, None),
            Segment::new(SegmentKind::Patch, 0x1BBD, patch, Some("Count".to_string())),
        ];
        let program = disassemble_program(&isa, &segments);
        assert_eq!(program.segments.len(), 2);
        assert!(program.segments[0].text.starts_with(".org $0100"));
        assert!(program.segments[1].text.starts_with(".patch $1BBD, \"Count\""));
        assert!(program.segments[1].text.contains("BNE L1BC0"));
    }
}
