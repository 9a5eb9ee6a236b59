use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use mocha_compiler::{ast::Program, compile, EmitMode};

/// Back end driver: reads a checked-AST dump produced by the front end and
/// prints target assembly (or TAC with `-d tac`).
#[derive(Parser)]
#[command(name = "mochac")]
#[command(about = "Mocha back end: checked AST in, MIPS-style assembly out")]
struct Args {
    /// Checked-AST dump (JSON) to compile
    file: PathBuf,

    /// Debug output selector; `tac` prints three-address code instead of
    /// assembly
    #[arg(short = 'd', value_name = "PHASE")]
    debug: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mode = match args.debug.as_deref() {
        None => EmitMode::Asm,
        Some("tac") => EmitMode::Tac,
        Some(other) => bail!("unknown debug phase '{other}' (expected 'tac')"),
    };

    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read '{}'", args.file.display()))?;
    let program: Program = serde_json::from_str(&text)
        .with_context(|| format!("'{}' is not a checked-AST dump", args.file.display()))?;

    let output = compile(&program, mode)?;
    print!("{output}");
    Ok(())
}
