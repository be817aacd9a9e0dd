//! # Resolution Context
//!
//! State threaded through one `resolve()` call. A [`ResolutionContext`] is an
//! immutable value: every `with_*`/`descend` method returns an extended copy
//! and leaves the receiver untouched, so sibling branches never observe each
//! other's in-flight references or anchors.
//!
//! The per-call caches are the only shared state. They live in
//! [`ResolutionCaches`] behind an `Arc` and are insert-only: two branches
//! writing the same key write equal values, so races between concurrently
//! resolved siblings are benign.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use schemaref_core::Schema;
use serde::Serialize;

/// Counters reported by [`crate::Resolver::resolve_with_report`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionStats {
    /// Reference targets resolved (cache hits excluded).
    pub expansions: usize,
    /// `(baseUri, ref)` cache hits.
    pub reference_cache_hits: usize,
    /// Identity cache hits.
    pub node_cache_hits: usize,
}

/// Caches shared by every branch of one `resolve()` call.
#[derive(Debug)]
pub struct ResolutionCaches {
    enabled: bool,
    refs: DashMap<(String, String), Schema>,
    // Identity key -> (original, resolved). Holding the original keeps its
    // allocation, and therefore its key, alive for the whole call.
    nodes: DashMap<usize, (Schema, Schema)>,
    circular_edges: Mutex<BTreeSet<String>>,
    expansions: AtomicUsize,
    reference_hits: AtomicUsize,
    node_hits: AtomicUsize,
}

impl ResolutionCaches {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            refs: DashMap::new(),
            nodes: DashMap::new(),
            circular_edges: Mutex::new(BTreeSet::new()),
            expansions: AtomicUsize::new(0),
            reference_hits: AtomicUsize::new(0),
            node_hits: AtomicUsize::new(0),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Cached resolved target for `(base, reference)`.
    pub fn reference(&self, base: Option<&str>, reference: &str) -> Option<Schema> {
        if !self.enabled {
            return None;
        }
        let key = (base.unwrap_or_default().to_string(), reference.to_string());
        let hit = self.refs.get(&key).map(|entry| entry.value().clone());
        if hit.is_some() {
            self.reference_hits.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    pub fn store_reference(&self, base: Option<&str>, reference: &str, resolved: &Schema) {
        if self.enabled {
            let key = (base.unwrap_or_default().to_string(), reference.to_string());
            self.refs.insert(key, resolved.clone());
        }
    }

    /// Cached result for this exact node object. Boolean schemas are never cached.
    pub fn node(&self, node: &Schema) -> Option<Schema> {
        if !self.enabled {
            return None;
        }
        let id = node.node_id()?;
        let hit = self.nodes.get(&id).map(|entry| entry.value().1.clone());
        if hit.is_some() {
            self.node_hits.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    pub fn store_node(&self, node: &Schema, resolved: &Schema) {
        if !self.enabled {
            return;
        }
        if let Some(id) = node.node_id() {
            self.nodes.insert(id, (node.clone(), resolved.clone()));
        }
    }

    /// Remember a cyclic edge kept unexpanded.
    pub fn record_circular(&self, key: &str) {
        self.circular_edges.lock().insert(key.to_string());
    }

    pub fn record_expansion(&self) {
        self.expansions.fetch_add(1, Ordering::Relaxed);
    }

    /// Cyclic edges recorded so far, sorted.
    pub fn circular_edges(&self) -> Vec<String> {
        self.circular_edges.lock().iter().cloned().collect()
    }

    pub fn stats(&self) -> ResolutionStats {
        ResolutionStats {
            expansions: self.expansions.load(Ordering::Relaxed),
            reference_cache_hits: self.reference_hits.load(Ordering::Relaxed),
            node_cache_hits: self.node_hits.load(Ordering::Relaxed),
        }
    }
}

type DynamicFrame = Arc<HashMap<String, Schema>>;

/// Per-path resolution state.
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    root: Schema,
    base_uri: Option<String>,
    depth: usize,
    ref_path: Arc<HashSet<String>>,
    recursive_anchors: Arc<Vec<Schema>>,
    dynamic_scope: Arc<Vec<DynamicFrame>>,
    caches: Arc<ResolutionCaches>,
}

impl ResolutionContext {
    /// A fresh context for a walk starting at `root`.
    pub fn new(root: Schema, base_uri: Option<String>, caches: Arc<ResolutionCaches>) -> Self {
        Self {
            root,
            base_uri,
            depth: 0,
            ref_path: Arc::default(),
            recursive_anchors: Arc::default(),
            dynamic_scope: Arc::default(),
            caches,
        }
    }

    /// The document local fragments are looked up in.
    pub fn root(&self) -> &Schema {
        &self.root
    }

    pub fn base_uri(&self) -> Option<&str> {
        self.base_uri.as_deref()
    }

    /// Reference hops taken to reach this point.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn caches(&self) -> &ResolutionCaches {
        &self.caches
    }

    /// Whether `key` is being expanded somewhere up the current path.
    pub fn on_path(&self, key: &str) -> bool {
        self.ref_path.contains(key)
    }

    /// Nearest enclosing `$recursiveAnchor: true` node.
    pub fn recursive_anchor(&self) -> Option<&Schema> {
        self.recursive_anchors.last()
    }

    /// Look up a `$dynamicAnchor` binding, innermost frame first.
    pub fn lookup_dynamic(&self, name: &str) -> Option<&Schema> {
        self.dynamic_scope
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
    }

    pub fn with_base_uri(&self, base_uri: String) -> Self {
        Self {
            base_uri: Some(base_uri),
            ..self.clone()
        }
    }

    pub fn with_recursive_anchor(&self, anchor: Schema) -> Self {
        let mut anchors = Vec::clone(&self.recursive_anchors);
        anchors.push(anchor);
        Self {
            recursive_anchors: Arc::new(anchors),
            ..self.clone()
        }
    }

    /// Push a frame binding `name` to `node`, inheriting the outer bindings.
    pub fn with_dynamic_anchor(&self, name: &str, node: Schema) -> Self {
        let mut frame = self
            .dynamic_scope
            .last()
            .map(|outer| HashMap::clone(outer))
            .unwrap_or_default();
        frame.insert(name.to_string(), node);

        let mut scope = Vec::clone(&self.dynamic_scope);
        scope.push(Arc::new(frame));
        Self {
            dynamic_scope: Arc::new(scope),
            ..self.clone()
        }
    }

    /// Step across a reference: one hop deeper, `key` on the path, and the
    /// document and base URI the target lives in.
    pub fn descend(&self, key: &str, root: Schema, base_uri: Option<String>) -> Self {
        let mut path = HashSet::clone(&self.ref_path);
        path.insert(key.to_string());
        Self {
            root,
            base_uri,
            depth: self.depth + 1,
            ref_path: Arc::new(path),
            ..self.clone()
        }
    }
}
