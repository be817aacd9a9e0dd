//! # schemaref-core — Foundational Types for Reference Resolution
//!
//! This crate is the leaf of the schemaref workspace. It defines the types
//! every other crate exchanges: the JSON Schema AST, the error taxonomy, and
//! JSON Pointer navigation.
//!
//! ## Key Design Principles
//!
//! 1. **Immutable, shareable nodes.** [`Schema`] object nodes sit behind an
//!    `Arc`. Resolution never edits a node in place; it builds new ones.
//!    Node identity ([`Schema::node_id`]) is what the resolver memoises on.
//!
//! 2. **Reference kinds are a closed enum.** [`Reference`] is decided once
//!    per node, with `$dynamicRef` > `$recursiveRef` > `$ref` precedence.
//!
//! 3. **One error type.** Every failure surfaces as a [`SchemaError`];
//!    [`SchemaError::kind`] exposes the category for programmatic matching.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `schemaref-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod keywords;
pub mod pointer;
pub mod schema;

// Re-export primary types for ergonomic imports.
pub use error::{ErrorKind, SchemaError};
pub use keywords::{shape_of, KeywordShape};
pub use pointer::{navigate, split_reference, ReferenceParts};
pub use schema::{Keyword, Reference, Schema, SchemaObject, Subschema};
