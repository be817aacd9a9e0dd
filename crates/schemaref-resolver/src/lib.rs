//! # schemaref-resolver — Reference Resolution Engine
//!
//! Turns JSON Schema documents into fully dereferenced, cycle-safe trees.
//! Handles `$ref`, draft 2019-09 `$recursiveRef`/`$recursiveAnchor`, and
//! draft 2020-12 `$dynamicRef`/`$dynamicAnchor`.
//!
//! ## Components
//!
//! - [`Resolver`]: the entry point. Walks a schema, expands references,
//!   applies the configured [`CircularHandling`] policy and depth limit.
//! - [`SchemaStore`] and [`SchemaLoader`]: known documents by absolute URI,
//!   and the caller-supplied async source for the ones not yet known.
//! - [`ResolutionContext`]: the per-path scope (base URI, cycle path,
//!   anchor stacks) plus the per-call caches.
//! - [`detect_cycles`]: a static pre-flight check over an unresolved document.
//!
//! ## Example
//!
//! ```
//! # futures::executor::block_on(async {
//! use schemaref_core::Schema;
//! use schemaref_resolver::Resolver;
//! use serde_json::json;
//!
//! let schema = Schema::from_json(&json!({
//!     "properties": {"user": {"$ref": "#/definitions/User"}},
//!     "definitions": {"User": {"type": "object"}}
//! }))?;
//! let resolved = Resolver::default().resolve(&schema).await?;
//! assert_eq!(resolved.to_json()["properties"]["user"]["type"], "object");
//! # Ok::<_, schemaref_core::SchemaError>(())
//! # }).unwrap();
//! ```
//!
//! ## Crate Policy
//!
//! - Depends on `schemaref-core` only among internal crates.
//! - Runtime-agnostic: no executor is required beyond one able to poll
//!   the injected loader's futures.
//! - Never installs a tracing subscriber.

pub mod config;
pub mod context;
pub mod cycles;
pub mod resolver;
pub mod store;
pub mod uri;

pub use config::{CircularHandling, ConfigError, ResolverOptions, DEFAULT_MAX_DEPTH};
pub use context::{ResolutionCaches, ResolutionContext, ResolutionStats};
pub use cycles::{detect_cycles, CyclePath};
pub use resolver::{Resolution, Resolver, ResolverBuilder};
pub use store::{loader_fn, BoxError, FnLoader, NoopLoader, SchemaLoader, SchemaStore};
