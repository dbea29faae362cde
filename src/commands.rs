//! The four driver subcommands (spec §6): `extract`, `compile`,
//! `disasm-hex`, `asm-hex`. Each is a thin wrapper gluing the config/hex I/O
//! in [`crate::config`] to the pure [`spc700_asm`] core.

use std::fs;
use std::path::{Path, PathBuf};

use spc700_asm::{IsaTable, Segment, SegmentKind};

use crate::config::{
    self, default_extension_extra, format_addr_field, format_hex_bytes, parse_addr_field, parse_hex_bytes, CodeBlock,
    Extension, Game, Hook,
};
use crate::error::DriverError;

/// `extract <config> <outdir> [--game ID] [--ext NAME]`
pub fn extract(
    isa: &IsaTable,
    config_path: &Path,
    outdir: &Path,
    game_filter: Option<&str>,
    ext_filter: Option<&str>,
) -> Result<Vec<PathBuf>, DriverError> {
    let games = config::load_config(config_path)?;
    fs::create_dir_all(outdir).map_err(|e| DriverError::Io(e, outdir.to_path_buf()))?;

    let mut written = Vec::new();
    for game in &games {
        if game_filter.map_or(false, |id| id != game.id) {
            continue;
        }
        for ext in &game.extensions {
            if ext_filter.map_or(false, |name| name != ext.name) {
                continue;
            }
            let path = extract_one(isa, outdir, game, ext)?;
            written.push(path);
        }
    }
    Ok(written)
}

fn extract_one(isa: &IsaTable, outdir: &Path, game: &Game, ext: &Extension) -> Result<PathBuf, DriverError> {
    let main_addr = parse_addr_field(&ext.code.address)?;
    let main_bytes = parse_hex_bytes(&ext.code.bytes)?;

    let mut segments = Vec::with_capacity(1 + ext.hooks.len());
    segments.push(Segment::new(SegmentKind::Main, main_addr, main_bytes, None));

    for hook in &ext.hooks {
        let addr = parse_addr_field(&hook.address)?;
        let bytes = parse_hex_bytes(&hook.bytes)?;
        segments.push(Segment::new(SegmentKind::Patch, addr, bytes, hook.name.clone()));
    }

    let program = spc700_asm::disassemble_program(isa, &segments);

    let mut out = String::new();
    out.push_str(&format!("; @game {}\n", game.id));
    out.push_str(&format!("; @extension {}\n\n", ext.name));
    out.push_str(program.segments[0].text.trim_end());
    for (idx, (hook, seg)) in ext.hooks.iter().zip(program.segments.iter().skip(1)).enumerate() {
        out.push_str("\n\n");
        let mut lines = seg.text.trim_end().splitn(2, '\n');
        let header = lines.next().unwrap_or_default();
        let rest = lines.next().unwrap_or_default();
        let key = match hook.name.as_deref() {
            Some(name) => format!("\"{}\"", name),
            None => "<none>".to_string(),
        };
        out.push_str(&format!("{} ; hook_idx: {} hook_key: {}\n{}", header, idx, key, rest));
    }
    out.push('\n');

    let file_name = format!("{}__{}.asm", game.id, sanitize_ext_name(&ext.name));
    let path = outdir.join(file_name);
    fs::write(&path, out).map_err(|e| DriverError::Io(e, path.clone()))?;
    Ok(path)
}

fn sanitize_ext_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    replaced.trim_matches('_').to_string()
}

/// `compile <config> <asmfile> [--game ID] [--ext NAME] [--inplace|--out PATH]
/// [--replace-hooks] [--replace-extension] [--upsert]`
#[allow(clippy::too_many_arguments)]
pub fn compile(
    isa: &IsaTable,
    config_path: &Path,
    asm_path: &Path,
    game_filter: Option<&str>,
    ext_filter: Option<&str>,
    out_path: Option<&Path>,
    inplace: bool,
    replace_hooks: bool,
    replace_extension: bool,
    upsert: bool,
) -> Result<PathBuf, DriverError> {
    let asm_text = fs::read_to_string(asm_path).map_err(|e| DriverError::Io(e, asm_path.to_path_buf()))?;
    let program = spc700_asm::assemble(isa, &asm_text)?;

    let (meta_game, meta_ext) = read_metadata_comments(&asm_text);
    let game_id = game_filter.map(String::from).or(meta_game).ok_or(DriverError::MissingGameOrExt)?;
    let ext_name = ext_filter.map(String::from).or(meta_ext).ok_or(DriverError::MissingGameOrExt)?;

    let mut games = config::load_config(config_path)?;
    let game = games
        .iter_mut()
        .find(|g| g.id == game_id)
        .ok_or_else(|| DriverError::GameNotFound(game_id.clone()))?;

    let code_new = CodeBlock {
        address: format_addr_field(program.main.origin),
        bytes: format_hex_bytes(&program.main.data),
    };
    let hooks_new: Vec<Hook> = program
        .patches
        .iter()
        .map(|seg| Hook {
            name: Some(seg.name.clone().unwrap_or_else(|| format!("patch_{:04X}", seg.origin))),
            address: format_addr_field(seg.origin),
            bytes: format_hex_bytes(&seg.data),
        })
        .collect();

    match game.extensions.iter_mut().find(|e| e.name == ext_name) {
        None => {
            if !(upsert || replace_extension) {
                return Err(DriverError::ExtensionNotFound {
                    game: game_id.clone(),
                    ext: ext_name.clone(),
                });
            }
            game.extensions.push(Extension {
                name: ext_name.clone(),
                code: code_new,
                hooks: hooks_new,
                extra: default_extension_extra(),
            });
        }
        Some(ext) if replace_extension => {
            *ext = Extension {
                name: ext_name.clone(),
                code: code_new,
                hooks: hooks_new,
                extra: default_extension_extra(),
            };
        }
        Some(ext) => {
            ext.code = code_new;
            if replace_hooks {
                ext.hooks = hooks_new;
            } else {
                merge_hooks_by_address(&mut ext.hooks, &hooks_new)?;
            }
        }
    }

    let out = if inplace {
        config_path.to_path_buf()
    } else if let Some(path) = out_path {
        path.to_path_buf()
    } else {
        default_out_path(config_path)
    };
    config::save_config(&out, &games)?;
    Ok(out)
}

/// Merges newly assembled patch segments into `existing` by address
/// (original tool's "legacy" merge behavior): a hook already present at an
/// address gets its bytes (and name, if given) refreshed in place; a new
/// address is appended.
fn merge_hooks_by_address(existing: &mut Vec<Hook>, fresh: &[Hook]) -> Result<(), DriverError> {
    for hook in fresh {
        let addr = parse_addr_field(&hook.address)?;
        let slot = existing
            .iter_mut()
            .find(|h| parse_addr_field(&h.address).ok() == Some(addr));
        match slot {
            Some(existing_hook) => {
                existing_hook.bytes = hook.bytes.clone();
                if hook.name.is_some() {
                    existing_hook.name = hook.name.clone();
                }
            }
            None => existing.push(hook.clone()),
        }
    }
    Ok(())
}

fn default_out_path(config_path: &Path) -> PathBuf {
    let stem = config_path.file_stem().and_then(|s| s.to_str()).unwrap_or("config");
    config_path.with_file_name(format!("{}.out.json", stem))
}

/// Reads the `; @game <id>` / `; @extension <name>` metadata comments from
/// the leading comment block of an asm file (spec §6). Recognized only by
/// the driver -- the core's own line preprocessor treats them as ordinary
/// comments.
fn read_metadata_comments(text: &str) -> (Option<String>, Option<String>) {
    let mut game = None;
    let mut ext = None;
    for line in text.lines() {
        let line = line.trim();
        if !line.starts_with(';') {
            break;
        }
        let body = line.trim_start_matches(';').trim_start();
        if let Some(rest) = strip_prefix_ci(body, "@game") {
            game = Some(rest.trim().to_string());
        } else if let Some(rest) = strip_prefix_ci(body, "@extension") {
            ext = Some(rest.trim().to_string());
        }
    }
    (game, ext)
}

fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    if text.len() >= prefix.len() && text[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&text[prefix.len()..])
    } else {
        None
    }
}

/// `disasm-hex <origin> <hex>`
pub fn disasm_hex(isa: &IsaTable, origin_text: &str, hex_text: &str) -> Result<String, DriverError> {
    let origin = parse_addr_field_loose(origin_text)?;
    let bytes = parse_hex_bytes(hex_text)?;
    let header = format!(".org ${:04X}", origin);
    Ok(spc700_asm::disassemble_segment(isa, &bytes, origin, None, Some(&header)))
}

/// Like [`parse_addr_field`], but also accepts a bare decimal number, since
/// `disasm-hex`'s origin argument isn't a JSON config field.
fn parse_addr_field_loose(text: &str) -> Result<u16, DriverError> {
    if let Ok(addr) = parse_addr_field(text) {
        return Ok(addr);
    }
    text.trim()
        .parse::<u16>()
        .map_err(|_| DriverError::BadAddress(text.to_string()))
}

/// `asm-hex <asmfile>` -- prints only the main segment's hex.
pub fn asm_hex(isa: &IsaTable, asm_path: &Path) -> Result<String, DriverError> {
    let asm_text = fs::read_to_string(asm_path).map_err(|e| DriverError::Io(e, asm_path.to_path_buf()))?;
    let program = spc700_asm::assemble(isa, &asm_text)?;
    Ok(format_hex_bytes(&program.main.data))
}
