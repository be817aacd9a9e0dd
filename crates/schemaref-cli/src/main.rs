//! # schemaref CLI entry point
//!
//! Parses command-line arguments, initialises tracing, and dispatches to
//! subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use schemaref_cli::cycles::{run_cycles, CyclesArgs};
use schemaref_cli::load_options;
use schemaref_cli::resolve::{run_resolve, ResolveArgs};

/// JSON Schema reference resolver.
///
/// Expands `$ref`, `$recursiveRef` and `$dynamicRef` across documents and
/// reports reference cycles.
#[derive(Parser, Debug)]
#[command(name = "schemaref", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a resolver options file (YAML or JSON).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Dereference a schema document and print the result.
    Resolve(ResolveArgs),

    /// Report circular references without resolving.
    Cycles(CyclesArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "schemaref starting");

    match dispatch(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<u8> {
    match cli.command {
        Commands::Resolve(args) => {
            let options = load_options(cli.config.as_deref())?;
            run_resolve(&args, options).await
        }
        Commands::Cycles(args) => run_cycles(&args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaref_resolver::CircularHandling;

    #[test]
    fn cli_parse_resolve_defaults() {
        let cli = Cli::try_parse_from(["schemaref", "resolve", "person.json"]).unwrap();
        assert_eq!(cli.verbose, 0);
        assert!(cli.config.is_none());
        let Commands::Resolve(args) = cli.command else {
            panic!("expected resolve");
        };
        assert_eq!(args.schema, PathBuf::from("person.json"));
        assert!(args.schema_dir.is_none());
        assert!(args.max_depth.is_none());
        assert!(args.circular.is_none());
        assert!(!args.no_cache);
        assert!(!args.compact);
        assert!(args.out.is_none());
    }

    #[test]
    fn cli_parse_resolve_all_flags() {
        let cli = Cli::try_parse_from([
            "schemaref",
            "-vv",
            "--config",
            "resolver.yaml",
            "resolve",
            "person.yaml",
            "--schema-dir",
            "shared",
            "--max-depth",
            "25",
            "--circular",
            "lazy",
            "--no-cache",
            "--out",
            "out.json",
            "--compact",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("resolver.yaml")));
        let Commands::Resolve(args) = cli.command else {
            panic!("expected resolve");
        };
        assert_eq!(args.schema_dir, Some(PathBuf::from("shared")));
        assert_eq!(args.max_depth, Some(25));
        assert_eq!(args.circular, Some(CircularHandling::Lazy));
        assert!(args.no_cache);
        assert!(args.compact);
        assert_eq!(args.out, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn cli_parse_rejects_unknown_policy() {
        assert!(Cli::try_parse_from(["schemaref", "resolve", "a.json", "--circular", "maybe"]).is_err());
    }

    #[test]
    fn cli_parse_cycles() {
        let cli = Cli::try_parse_from(["schemaref", "cycles", "a.json", "--json"]).unwrap();
        let Commands::Cycles(args) = cli.command else {
            panic!("expected cycles");
        };
        assert_eq!(args.schema, PathBuf::from("a.json"));
        assert!(args.json);
    }

    #[test]
    fn cli_requires_a_subcommand() {
        assert!(Cli::try_parse_from(["schemaref"]).is_err());
    }
}
