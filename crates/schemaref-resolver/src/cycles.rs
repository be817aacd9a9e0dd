//! # Circular Dependency Detector
//!
//! Static, resolver-free pre-flight check. Walks the raw document
//! depth-first using pointer paths (`#`, `#/properties/x`, ...) as node
//! identities and follows each `$ref` as if its target were an ordinary
//! child. A path met again while still on the walk stack closes a cycle.
//!
//! The walk identifies nodes by path, not by value: two refs to the same
//! definition visit it once, and a cycle is reported once.

use std::collections::HashSet;
use std::fmt;

use schemaref_core::{navigate, Schema};
use serde::{Deserialize, Serialize};

/// One cycle: the walk stack from the repeated path onward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CyclePath(pub Vec<String>);

impl CyclePath {
    pub fn paths(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for CyclePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" -> "))
    }
}

/// Report every reference cycle reachable from the root of `schema`.
///
/// Targets that do not exist in the document (including external
/// references) are skipped, not reported.
pub fn detect_cycles(schema: &Schema) -> Vec<CyclePath> {
    let mut walk = Walk {
        root: schema,
        visited: HashSet::new(),
        stack: Vec::new(),
        cycles: Vec::new(),
    };
    walk.visit("#".to_string(), schema);
    tracing::debug!(cycles = walk.cycles.len(), "cycle detection finished");
    walk.cycles
}

struct Walk<'a> {
    root: &'a Schema,
    visited: HashSet<String>,
    stack: Vec<String>,
    cycles: Vec<CyclePath>,
}

impl Walk<'_> {
    fn visit(&mut self, path: String, node: &Schema) {
        if let Some(start) = self.stack.iter().position(|p| *p == path) {
            self.cycles.push(CyclePath(self.stack[start..].to_vec()));
            return;
        }
        if !self.visited.insert(path.clone()) {
            return;
        }
        let Some(obj) = node.as_object() else {
            return;
        };

        self.stack.push(path.clone());

        if let Some(reference) = obj.str_keyword(schemaref_core::keywords::REF) {
            let target_path = target_path(&path, reference);
            if let Ok(target) = navigate(self.root, &target_path) {
                self.visit(target_path, &target);
            }
        }
        for child in obj.subschemas() {
            self.visit(format!("{path}/{}", child.pointer), child.schema);
        }

        self.stack.pop();
    }
}

/// Fragment refs are absolute; anything else is taken relative to the
/// parent of the current path.
fn target_path(current: &str, reference: &str) -> String {
    if reference.starts_with('#') {
        return reference.to_string();
    }
    let parent = current.rsplit_once('/').map_or(current, |(parent, _)| parent);
    format!("{parent}/{reference}")
}
