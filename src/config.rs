//! The tracker configuration document: a JSON array of games, each holding
//! one or more named extensions with a main code block and a list of hook
//! patches. This schema and its I/O are explicitly out of scope for the
//! `spc700-asm` core (spec §1) -- the driver owns it, through plain
//! `serde`/`serde_json` structs rather than anything bespoke.
//!
//! Unknown JSON keys on `Game`/`Extension` (the original tool's
//! `description`/`vcmds` fields among others) are preserved via `#[serde(flatten)]`
//! so round-tripping a real config through `extract`/`compile` doesn't
//! silently drop fields this tool never needed to understand.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DriverError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    #[serde(default)]
    pub extensions: Vec<Extension>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extension {
    pub name: String,
    pub code: CodeBlock,
    #[serde(default)]
    pub hooks: Vec<Hook>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeBlock {
    pub address: String,
    pub bytes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hook {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub address: String,
    pub bytes: String,
}

/// The minimal extra fields the original tool stamps onto a freshly
/// created extension object (`description`, `vcmds`), kept here only so an
/// `--upsert`/`--replace-extension` run produces the same shape of JSON a
/// hand-authored config would.
pub fn default_extension_extra() -> Map<String, Value> {
    let mut extra = Map::new();
    extra.insert("description".to_string(), Value::String(String::new()));
    extra.insert("vcmds".to_string(), Value::Array(Vec::new()));
    extra
}

pub fn load_config(path: &Path) -> Result<Vec<Game>, DriverError> {
    let text = fs::read_to_string(path).map_err(|e| DriverError::Io(e, path.to_path_buf()))?;
    serde_json::from_str(&text).map_err(|e| DriverError::Json(e, path.to_path_buf()))
}

/// Writes `games` back out with 4-space indentation, matching spec §6.
pub fn save_config(path: &Path, games: &[Game]) -> Result<(), DriverError> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    games
        .serialize(&mut ser)
        .map_err(|e| DriverError::Json(e, path.to_path_buf()))?;
    buf.push(b'\n');
    fs::write(path, buf).map_err(|e| DriverError::Io(e, path.to_path_buf()))
}

/// Parses a `"$hhhh"` or `"0xhhhh"` address field.
pub fn parse_addr_field(text: &str) -> Result<u16, DriverError> {
    let t = text.trim();
    let digits = t
        .strip_prefix("0x")
        .or_else(|| t.strip_prefix("0X"))
        .or_else(|| t.strip_prefix('$'))
        .ok_or_else(|| DriverError::BadAddress(text.to_string()))?;
    u16::from_str_radix(digits, 16).map_err(|_| DriverError::BadAddress(text.to_string()))
}

/// Renders an address as the uppercase `0xXXXX` form spec §6 requires.
pub fn format_addr_field(addr: u16) -> String {
    format!("0x{:04X}", addr)
}

/// Parses a `bytes` field: any non-hex-digit characters (spaces, in
/// particular) are stripped before decoding, matching the original tool's
/// leniency when reading hand-edited JSON.
pub fn parse_hex_bytes(text: &str) -> Result<Vec<u8>, DriverError> {
    let digits: String = text.chars().filter(|c| c.is_ascii_hexdigit()).collect();
    if digits.len() % 2 != 0 {
        return Err(DriverError::BadHex(text.to_string()));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| DriverError::BadHex(text.to_string())))
        .collect()
}

/// Renders bytes as unspaced uppercase hex, matching spec §6.
pub fn format_hex_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_address_prefixes() {
        assert_eq!(parse_addr_field("$1BBD").unwrap(), 0x1BBD);
        assert_eq!(parse_addr_field("0x1BBD").unwrap(), 0x1BBD);
    }

    #[test]
    fn formats_address_uppercase() {
        assert_eq!(format_addr_field(0x1bbd), "0x1BBD");
    }

    #[test]
    fn hex_bytes_round_trip() {
        let bytes = parse_hex_bytes("DE AD BE EF").unwrap();
        assert_eq!(bytes, vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(format_hex_bytes(&bytes), "DEADBEEF");
    }

    #[test]
    fn odd_length_hex_is_rejected() {
        assert!(parse_hex_bytes("ABC").is_err());
    }

    #[test]
    fn config_round_trips_unknown_fields() {
        let text = r#"[{"id":"game1","extensions":[{"name":"ext1","code":{"address":"0x0200","bytes":"00"},"hooks":[],"description":"hi","vcmds":["x"]}]}]"#;
        let games: Vec<Game> = serde_json::from_str(text).unwrap();
        assert_eq!(games[0].extensions[0].extra.get("description").unwrap(), "hi");
    }
}
