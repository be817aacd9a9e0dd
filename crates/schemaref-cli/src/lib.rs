//! # schemaref-cli — Command-line front end
//!
//! Provides the `schemaref` binary over the resolution engine.
//!
//! ## Subcommands
//!
//! - `schemaref resolve`: dereference a JSON/YAML schema document.
//! - `schemaref cycles`: report reference cycles without resolving.
//!
//! ## Configuration
//!
//! Resolver options come from `--config <file>` when given, otherwise from
//! the `SCHEMAREF_*` environment variables. Subcommand flags override either.
//!
//! ```bash
//! SCHEMAREF_CIRCULAR_HANDLING=ignore schemaref resolve person.json
//! schemaref --config resolver.yaml resolve person.json --max-depth 20
//! schemaref cycles person.json --json
//! ```

pub mod cycles;
pub mod loader;
pub mod resolve;

use std::path::Path;

use anyhow::{Context, Result};
use schemaref_resolver::ResolverOptions;

/// Load resolver options from the config file, or the environment.
pub fn load_options(config: Option<&Path>) -> Result<ResolverOptions> {
    match config {
        Some(path) => ResolverOptions::from_yaml_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => ResolverOptions::from_env().context("invalid SCHEMAREF_* environment"),
    }
}
