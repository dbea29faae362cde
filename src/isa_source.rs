//! Sourcing the ISA description text for [`spc700_asm::IsaTable::load`].
//!
//! Deliberately narrow: the core (`spc700-asm`) never touches the
//! filesystem, and downloading/caching `spc700.txt` is explicitly out of
//! scope for this tool (spec §1) -- unlike the original Python script, this
//! driver never reaches out to the network. It only ever reads a local
//! file, at a path the caller names or the `./spc700.txt` default.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Where the opcode reference text comes from. The only implementation
/// shipped here reads a local file, but the trait seam lets an embedder
/// supply the text some other way (e.g. compiled into a larger tool)
/// without touching the core crate.
pub trait IsaSource {
    fn load_isa_text(&self) -> io::Result<String>;
}

/// Reads the opcode reference from a local path.
pub struct LocalFileIsaSource {
    path: PathBuf,
}

impl LocalFileIsaSource {
    /// Uses `path` if given, otherwise `./spc700.txt`.
    pub fn new(path: Option<PathBuf>) -> Self {
        LocalFileIsaSource {
            path: path.unwrap_or_else(|| Path::new("spc700.txt").to_path_buf()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IsaSource for LocalFileIsaSource {
    fn load_isa_text(&self) -> io::Result<String> {
        fs::read_to_string(&self.path)
    }
}
