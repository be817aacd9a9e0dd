//! # `schemaref cycles`
//!
//! Runs the static cycle detector over a schema document without resolving
//! it. Exits with status 2 when at least one cycle is found.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use schemaref_resolver::{detect_cycles, CyclePath};

use crate::loader::read_schema;

/// Exit status when cycles are found.
pub const EXIT_CYCLES_FOUND: u8 = 2;

/// Arguments for `schemaref cycles`.
#[derive(Args, Debug)]
pub struct CyclesArgs {
    /// Schema document to analyse.
    pub schema: PathBuf,

    /// Print the cycles as a JSON array of path arrays.
    #[arg(long)]
    pub json: bool,
}

/// Execute `schemaref cycles`.
pub async fn run_cycles(args: &CyclesArgs) -> Result<u8> {
    let schema = read_schema(&args.schema)
        .await
        .with_context(|| format!("failed to read schema {}", args.schema.display()))?;
    let cycles = detect_cycles(&schema);
    println!("{}", render(&cycles, args.json)?);

    if cycles.is_empty() {
        Ok(0)
    } else {
        tracing::info!(count = cycles.len(), "circular references found");
        Ok(EXIT_CYCLES_FOUND)
    }
}

/// Human-readable (one cycle per line) or JSON rendering.
pub fn render(cycles: &[CyclePath], json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(cycles)?);
    }
    if cycles.is_empty() {
        return Ok("No circular references found.".to_string());
    }
    Ok(cycles
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n"))
}
