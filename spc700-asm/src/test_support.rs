// Included by lib.rs into the `test_support` module. Kept as a separate
// file purely so the generator isn't inlined into the crate's doc comments.

/// A syntactically complete 256-opcode reference table, for doctests and
/// driver-side tests that need a real [`crate::isa::IsaTable`] without
/// shipping a real `spc700.txt`. The handful of named rows cover every
/// operand family this crate understands; every other byte is a filler
/// one-byte pseudo-instruction.
pub fn sample_table() -> String {
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
            0x8F => "MOV d,#i     8F   3     5    (d) = i         ........".to_string(),
            _ => format!(
                "NOP{:02X}        {:02X}   1     2    filler          ........",
                op, op
            ),
        };
        lines.push(row);
    }
    lines.join("\n")
}
