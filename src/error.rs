//! Driver-level errors: everything [`crate::error::AsmError`] doesn't cover
//! (file I/O, config JSON, CLI argument combinations), folded into one enum
//! alongside it -- following the teacher's `FalconError` pattern rather than
//! reaching for `thiserror` here too.

use std::fmt;
use std::path::PathBuf;

use spc700_asm::error::WithLine;
use spc700_asm::AsmError;

#[derive(Debug)]
pub enum DriverError {
    Io(std::io::Error, PathBuf),
    Json(serde_json::Error, PathBuf),
    Asm(WithLine),
    IsaLoad(AsmError),
    BadAddress(String),
    BadHex(String),
    MissingGameOrExt,
    GameNotFound(String),
    ExtensionNotFound { game: String, ext: String },
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Io(err, path) => write!(f, "{}: {}", path.display(), err),
            DriverError::Json(err, path) => write!(f, "{}: {}", path.display(), err),
            DriverError::Asm(err) => write!(f, "{}", err),
            DriverError::IsaLoad(err) => write!(f, "failed to load opcode table: {}", err),
            DriverError::BadAddress(text) => write!(f, "bad address: '{}'", text),
            DriverError::BadHex(text) => write!(f, "bad hex string: '{}'", text),
            DriverError::MissingGameOrExt => write!(
                f,
                "need --game and --ext, or '; @game ...' / '; @extension ...' comments in the asm file"
            ),
            DriverError::GameNotFound(id) => write!(f, "game '{}' not found in config", id),
            DriverError::ExtensionNotFound { game, ext } => write!(
                f,
                "extension '{}' not found in game '{}' (use --upsert or --replace-extension)",
                ext, game
            ),
        }
    }
}

impl std::error::Error for DriverError {}

impl From<WithLine> for DriverError {
    fn from(err: WithLine) -> Self {
        DriverError::Asm(err)
    }
}
