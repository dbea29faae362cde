//! CLI entry point for `spc700-patch`, gluing [`commands`] to `clap`.
//!
//! Every subcommand maps one-to-one onto the original tool's own verbs
//! (`extract`, `compile`, `disasm-hex`, `asm-hex`); see `SPEC_FULL.md` §6 for
//! the full contract. On success the process exits 0; any [`error::DriverError`]
//! (which subsumes the core's own [`spc700_asm::AsmError`]) is reported
//! through the `error!` macro and the process exits 2.

#[macro_use]
mod macros;

mod commands;
mod config;
mod error;
mod isa_source;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use spc700_asm::IsaTable;

use error::DriverError;
use isa_source::{IsaSource, LocalFileIsaSource};

#[derive(Parser)]
#[command(name = "spc700-patch", about = "Round-trips SPC700 tracker extension patches between hex and assembly")]
struct Cli {
    /// Path to the opcode reference text (Anomie's `spc700.txt` format).
    /// Defaults to `./spc700.txt`.
    #[arg(long, global = true)]
    opdoc: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Disassembles every matching extension out of a config into `.asm` files.
    Extract {
        config: PathBuf,
        outdir: PathBuf,
        #[arg(long)]
        game: Option<String>,
        #[arg(long)]
        ext: Option<String>,
    },
    /// Assembles a `.asm` file and merges the result back into a config.
    Compile {
        config: PathBuf,
        asmfile: PathBuf,
        #[arg(long)]
        game: Option<String>,
        #[arg(long)]
        ext: Option<String>,
        /// Writes the result back over `config` instead of a new file.
        #[arg(long, conflicts_with = "out")]
        inplace: bool,
        /// Writes the result to this path instead of `<config>.out.json`.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Drops the extension's existing hooks instead of merging by address.
        #[arg(long)]
        replace_hooks: bool,
        /// Replaces the whole named extension instead of updating its fields.
        #[arg(long)]
        replace_extension: bool,
        /// Creates the named extension if it doesn't already exist.
        #[arg(long)]
        upsert: bool,
    },
    /// Disassembles a raw hex string at a given origin, with no config involved.
    DisasmHex { origin: String, hex: String },
    /// Assembles a file and prints only its main segment's hex.
    AsmHex { asmfile: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("error:", "{}", err);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<(), DriverError> {
    let isa_source = LocalFileIsaSource::new(cli.opdoc);
    let isa_text = isa_source
        .load_isa_text()
        .map_err(|e| DriverError::Io(e, isa_source.path().to_path_buf()))?;
    let isa = IsaTable::load(&isa_text).map_err(DriverError::IsaLoad)?;

    match cli.command {
        Command::Extract { config, outdir, game, ext } => {
            let written = commands::extract(&isa, &config, &outdir, game.as_deref(), ext.as_deref())?;
            for path in &written {
                note!("wrote", "{}", path.display());
            }
            Ok(())
        }
        Command::Compile {
            config,
            asmfile,
            game,
            ext,
            inplace,
            out,
            replace_hooks,
            replace_extension,
            upsert,
        } => {
            let written = commands::compile(
                &isa,
                &config,
                &asmfile,
                game.as_deref(),
                ext.as_deref(),
                out.as_deref(),
                inplace,
                replace_hooks,
                replace_extension,
                upsert,
            )?;
            note!("wrote", "{}", written.display());
            Ok(())
        }
        Command::DisasmHex { origin, hex } => {
            print!("{}", commands::disasm_hex(&isa, &origin, &hex)?);
            Ok(())
        }
        Command::AsmHex { asmfile } => {
            println!("{}", commands::asm_hex(&isa, &asmfile)?);
            Ok(())
        }
    }
}
