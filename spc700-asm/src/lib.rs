//! Rust library for assembling and disassembling SPC700 machine-code
//! fragments.
//!
//! # About the SPC700
//!
//! The SPC700 is the 8-bit CPU core driving the audio subsystem of the
//! Super Nintendo Entertainment System. Tracker-style sound drivers for it
//! are commonly extended with small hand-written patches: a main block of
//! code plus a handful of independent "hook" patches placed at fixed
//! addresses. This crate assembles and disassembles exactly those
//! fragments -- it is not a general 6502/SNES assembler and performs no
//! optimization, macro expansion or multi-file linking.
//!
//! # The instruction set
//!
//! Unlike a microprocessor whose opcode metadata is known at compile time,
//! the SPC700 table used here is sourced at runtime from a plain-text
//! opcode reference (the format documented by Anomie's `spc700.txt`) and
//! parsed once into an immutable [`isa::IsaTable`]. See [`isa::IsaTable::load`].
//!
//! # Disassembling
//!
//! [`disassembler::disassemble_segment`] turns a byte buffer plus an origin
//! address into assembly text, recovering branch and absolute-addressing
//! targets as `L%04X`-named labels. [`disassembler::disassemble_program`] is
//! the multi-segment entry point: it builds one combined label map across a
//! main segment and any number of patch segments before disassembling each.
//!
//! ```
//! # let isa = spc700_asm::IsaTable::load(&spc700_asm::test_support::sample_table()).unwrap();
//! let text = spc700_asm::disassemble_segment(&isa, &[0xE8, 0x12], 0x0200, None, None);
//! assert!(text.contains("MOV A, #$12"));
//! ```
//!
//! # Assembling
//!
//! [`assembler::assemble`] is a two-pass assembler: pass 1 walks the source
//! once, assigning labels and picking an instruction form for every
//! instruction with the label table still unresolved; pass 2 replays the
//! resulting item list with labels fully known and re-selects each
//! instruction's form, failing with [`error::AsmError::InstructionFormChanged`]
//! if label resolution would have changed the encoding.
//!
//! ```
//! # let isa = spc700_asm::IsaTable::load(&spc700_asm::test_support::sample_table()).unwrap();
//! let prog = spc700_asm::assemble(&isa, "\n.org $0200\nBNE L1\nNOP\nL1:\n").unwrap();
//! assert_eq!(prog.main.data, vec![0xD0, 0x01, 0x00]);
//! ```

pub mod assembler;
pub mod disassembler;
pub mod error;
pub mod isa;
mod numeric;
pub mod operand;
pub mod segment;

pub use assembler::{assemble, AssembledProgram};
pub use disassembler::{disassemble_program, disassemble_segment, DisassembledSegment, Program};
pub use error::{AsmError, WithLine};
pub use isa::{IndexReg, Implied, IsaTable, OpcodeEntry, OperandSpec, Register};
pub use operand::{parse_operand, parse_value_expr, ParsedKind, ParsedOperand, ValueExpr};
pub use segment::{auto_label_name, LabelMap, Segment, SegmentKind};

/// A complete 256-opcode reference table, exposed only so the crate's own
/// doctests and the driver's test suite don't each have to hand-roll one.
/// Not part of the crate's real ISA data -- callers always supply their own
/// opcode reference text to [`IsaTable::load`].
#[doc(hidden)]
pub mod test_support {
    include!("test_support.rs");
}
