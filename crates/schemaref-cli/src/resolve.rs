//! # `schemaref resolve`
//!
//! Dereferences a schema document and prints (or writes) the result as JSON.
//!
//! ```bash
//! schemaref resolve api/person.yaml
//! schemaref resolve api/person.yaml --schema-dir api/shared --circular ignore --out person.json
//! ```
//!
//! External references are served by a [`DirectoryLoader`] over
//! `--schema-dir`, or the schema file's own directory when not given.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use schemaref_resolver::{CircularHandling, Resolver, ResolverOptions};

use crate::loader::{read_schema, DirectoryLoader};

/// Arguments for `schemaref resolve`.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Schema document to resolve (JSON, or YAML by extension).
    pub schema: PathBuf,

    /// Directory external references are loaded from.
    #[arg(long)]
    pub schema_dir: Option<PathBuf>,

    /// Maximum reference hops along one path.
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// What to do with circular references: error, ignore or lazy.
    #[arg(long)]
    pub circular: Option<CircularHandling>,

    /// Disable the per-call reference caches.
    #[arg(long)]
    pub no_cache: bool,

    /// Write the result here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Emit compact JSON instead of pretty-printed.
    #[arg(long)]
    pub compact: bool,
}

impl ResolveArgs {
    /// Lay the command-line flags over `options`.
    pub fn apply(&self, mut options: ResolverOptions) -> ResolverOptions {
        if let Some(max_depth) = self.max_depth {
            options.max_depth = max_depth;
        }
        if let Some(circular) = self.circular {
            options.circular_handling = circular;
        }
        if self.no_cache {
            options.enable_cache = false;
        }
        options
    }

    fn schema_dir(&self) -> PathBuf {
        self.schema_dir
            .clone()
            .or_else(|| {
                self.schema
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(Path::to_path_buf)
            })
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Execute `schemaref resolve`.
pub async fn run_resolve(args: &ResolveArgs, options: ResolverOptions) -> Result<u8> {
    let options = args.apply(options);
    let schema = read_schema(&args.schema)
        .await
        .with_context(|| format!("failed to read schema {}", args.schema.display()))?;

    let schema_dir = args.schema_dir();
    tracing::info!(
        schema = %args.schema.display(),
        schema_dir = %schema_dir.display(),
        max_depth = options.max_depth,
        circular = %options.circular_handling,
        "resolving schema"
    );

    let resolver = Resolver::builder()
        .options(options)
        .loader(DirectoryLoader::new(schema_dir))
        .build();
    let resolution = resolver
        .resolve_with_report(&schema)
        .await
        .with_context(|| format!("failed to resolve {}", args.schema.display()))?;

    for edge in &resolution.circular_edges {
        tracing::warn!(edge = %edge, "circular reference left unexpanded");
    }
    tracing::debug!(
        expansions = resolution.stats.expansions,
        reference_cache_hits = resolution.stats.reference_cache_hits,
        node_cache_hits = resolution.stats.node_cache_hits,
        "resolution statistics"
    );

    let rendered = if args.compact {
        serde_json::to_string(&resolution.schema)?
    } else {
        serde_json::to_string_pretty(&resolution.schema)?
    };

    match &args.out {
        Some(path) => {
            tokio::fs::write(path, format!("{rendered}\n"))
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(out = %path.display(), "resolved schema written");
        }
        None => println!("{rendered}"),
    }
    Ok(0)
}
