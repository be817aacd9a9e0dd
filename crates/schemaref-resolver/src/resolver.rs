//! # Reference Resolver
//!
//! Walks a schema depth-first and replaces every `$ref`, `$recursiveRef`
//! and `$dynamicRef` with the (sibling-merged) schema it points to.
//!
//! ## Per-node steps
//!
//! 1. Boolean schemas are returned unchanged.
//! 2. A node already resolved during this call (same allocation) is served
//!    from the identity cache.
//! 3. `$id`, `$recursiveAnchor` and `$dynamicAnchor` extend the context seen
//!    by the node's descendants.
//! 4. The node's [`Reference`] kind is dispatched; reference-free nodes have
//!    their schema-bearing keywords resolved instead. `definitions`/`$defs`
//!    are copied verbatim and only resolved when something points into them.
//!
//! ## Cycles
//!
//! Every reference hop adds a key to the context's path. Meeting a key that
//! is already on the path is a cycle: under [`CircularHandling::Error`] the
//! call fails, otherwise the reference keyword is kept as written (its
//! siblings are still resolved) and the edge is reported in
//! [`Resolution::circular_edges`].
//!
//! ## Concurrency
//!
//! Sibling subschemas are resolved with `try_join_all`, so loads of
//! independent external documents overlap. Output order always mirrors input
//! order.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use futures::future::{try_join_all, BoxFuture, FutureExt};
use schemaref_core::keywords::{DYNAMIC_REF, RECURSIVE_REF, REF, REFERENCE_KEYWORDS};
use schemaref_core::{navigate, shape_of, split_reference};
use schemaref_core::{Keyword, Reference, Schema, SchemaError, SchemaObject};
use serde_json::Value;

use crate::config::{CircularHandling, ResolverOptions};
use crate::context::{ResolutionCaches, ResolutionContext, ResolutionStats};
use crate::store::{BoxError, NoopLoader, SchemaLoader, SchemaStore};
use crate::uri;

/// Result of [`Resolver::resolve_with_report`].
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The dereferenced schema.
    pub schema: Schema,
    /// Keys of the reference edges kept unexpanded because they were
    /// circular (`"$ref|<base>|<ref>"`), sorted. Always empty under
    /// [`CircularHandling::Error`].
    pub circular_edges: Vec<String>,
    pub stats: ResolutionStats,
}

/// What following a single reference produced.
enum Expansion {
    /// The resolved target, before sibling keywords are merged in.
    Resolved(Schema),
    /// A cyclic edge the policy keeps as written.
    Circular,
}

/// Dereferences JSON Schema documents.
///
/// A resolver owns the [`SchemaStore`] and the external loader, and may serve
/// any number of `resolve` calls. Caches are per call.
pub struct Resolver {
    options: ResolverOptions,
    store: Arc<SchemaStore>,
    loader: Arc<dyn SchemaLoader>,
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("options", &self.options)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(ResolverOptions::default())
    }
}

/// Builder for [`Resolver`].
#[derive(Default)]
pub struct ResolverBuilder {
    options: ResolverOptions,
    store: Option<Arc<SchemaStore>>,
    loader: Option<Arc<dyn SchemaLoader>>,
}

impl ResolverBuilder {
    /// Replace all options at once.
    pub fn options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.options.max_depth = max_depth;
        self
    }

    pub fn circular_handling(mut self, handling: CircularHandling) -> Self {
        self.options.circular_handling = handling;
        self
    }

    pub fn enable_cache(mut self, enable: bool) -> Self {
        self.options.enable_cache = enable;
        self
    }

    /// Source for documents the store does not know.
    pub fn loader<L: SchemaLoader + 'static>(mut self, loader: L) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Share an existing store (and its registered documents).
    pub fn store(mut self, store: Arc<SchemaStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Resolver {
        Resolver {
            options: self.options,
            store: self.store.unwrap_or_default(),
            loader: self.loader.unwrap_or_else(|| Arc::new(NoopLoader)),
        }
    }
}

impl Resolver {
    /// A resolver with an empty store and no external loader.
    pub fn new(options: ResolverOptions) -> Self {
        Self::builder().options(options).build()
    }

    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::default()
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    pub fn store(&self) -> &Arc<SchemaStore> {
        &self.store
    }

    /// Register `schema` under `id`, or under its own `$id`.
    ///
    /// Returns `false`, registering nothing, when no identifier is available.
    pub fn add_schema(&self, schema: &Schema, id: Option<&str>) -> bool {
        self.store.register_document(schema, id).is_some()
    }

    /// Dereference `schema`.
    ///
    /// # Errors
    ///
    /// Fails on the first unresolvable reference, depth overflow, loader
    /// failure, or (under [`CircularHandling::Error`]) cycle. No partial
    /// result is returned.
    pub async fn resolve(&self, schema: &Schema) -> Result<Schema, SchemaError> {
        self.resolve_with_report(schema).await.map(|r| r.schema)
    }

    /// [`resolve`](Self::resolve), also reporting kept cyclic edges and
    /// cache statistics.
    pub async fn resolve_with_report(&self, schema: &Schema) -> Result<Resolution, SchemaError> {
        self.store.register_document(schema, None);

        let caches = Arc::new(ResolutionCaches::new(self.options.enable_cache));
        let ctx = ResolutionContext::new(schema.clone(), None, Arc::clone(&caches));
        let resolved = self.resolve_node(schema.clone(), ctx).await?;

        let stats = caches.stats();
        let circular_edges = caches.circular_edges();
        tracing::debug!(
            expansions = stats.expansions,
            reference_cache_hits = stats.reference_cache_hits,
            node_cache_hits = stats.node_cache_hits,
            circular_edges = circular_edges.len(),
            cache = caches.enabled(),
            "schema resolved"
        );
        Ok(Resolution {
            schema: resolved,
            circular_edges,
            stats,
        })
    }

    /// JSON in, JSON out.
    pub async fn resolve_value(&self, value: &Value) -> Result<Value, SchemaError> {
        let schema = Schema::from_json(value)?;
        Ok(self.resolve(&schema).await?.to_json())
    }

    fn resolve_node<'a>(
        &'a self,
        node: Schema,
        ctx: ResolutionContext,
    ) -> BoxFuture<'a, Result<Schema, SchemaError>> {
        async move {
            let obj = match &node {
                Schema::Bool(b) => return Ok(Schema::Bool(*b)),
                Schema::Object(obj) => Arc::clone(obj),
            };
            if let Some(hit) = ctx.caches().node(&node) {
                tracing::trace!("identity cache hit");
                return Ok(hit);
            }

            let ctx = enter_scope(&node, &obj, ctx);
            let resolved = match obj.reference() {
                Some(reference) => {
                    warn_on_conflict(&obj, reference);
                    self.resolve_reference(&node, &obj, reference, &ctx).await?
                }
                None => match self.resolve_children(&obj, &ctx).await? {
                    Some(rebuilt) => rebuilt.into_schema(),
                    None => node.clone(),
                },
            };

            ctx.caches().store_node(&node, &resolved);
            Ok(resolved)
        }
        .boxed()
    }

    /// Resolve every schema-bearing keyword of `obj`. Returns `None` when
    /// nothing changed, so callers can keep the original node.
    async fn resolve_children(
        &self,
        obj: &SchemaObject,
        ctx: &ResolutionContext,
    ) -> Result<Option<SchemaObject>, SchemaError> {
        let entries = try_join_all(obj.iter().map(|(name, keyword)| {
            let ctx = ctx.clone();
            async move {
                let resolved = if shape_of(name).is_applicator() {
                    self.resolve_keyword(keyword.clone(), ctx).await?
                } else {
                    keyword.clone()
                };
                Ok::<_, SchemaError>((name.clone(), resolved))
            }
        }))
        .await?;

        let unchanged = entries
            .iter()
            .zip(obj.iter())
            .all(|((_, new), (_, old))| same_keyword(new, old));
        if unchanged {
            return Ok(None);
        }
        Ok(Some(entries.into_iter().collect()))
    }

    fn resolve_keyword<'a>(
        &'a self,
        keyword: Keyword,
        ctx: ResolutionContext,
    ) -> BoxFuture<'a, Result<Keyword, SchemaError>> {
        async move {
            match keyword {
                Keyword::Schema(schema) => Ok(Keyword::Schema(self.resolve_node(schema, ctx).await?)),
                Keyword::List(items) => {
                    let resolved = try_join_all(
                        items
                            .into_iter()
                            .map(|item| self.resolve_keyword(item, ctx.clone())),
                    )
                    .await?;
                    Ok(Keyword::List(resolved))
                }
                Keyword::Map(map) => {
                    let (names, values): (Vec<_>, Vec<_>) = map.into_iter().unzip();
                    let resolved = try_join_all(
                        values
                            .into_iter()
                            .map(|value| self.resolve_keyword(value, ctx.clone())),
                    )
                    .await?;
                    Ok(Keyword::Map(names.into_iter().zip(resolved).collect()))
                }
                value @ Keyword::Value(_) => Ok(value),
            }
        }
        .boxed()
    }

    async fn resolve_reference(
        &self,
        node: &Schema,
        obj: &SchemaObject,
        reference: Reference<'_>,
        ctx: &ResolutionContext,
    ) -> Result<Schema, SchemaError> {
        let expansion = match reference {
            Reference::Static(r) => self.expand_ref(r, ctx).await?,
            Reference::Recursive(r) => self.expand_recursive_ref(r, ctx).await?,
            Reference::Dynamic(r) => self.expand_dynamic_ref(r, ctx).await?,
        };
        match expansion {
            Expansion::Circular => self.keep_circular(node, obj, ctx).await,
            Expansion::Resolved(target) => self.merge_siblings(obj, target, ctx).await,
        }
    }

    /// Keep a cyclic reference keyword as written. Its siblings are still
    /// resolved; only the edge itself stays unexpanded.
    async fn keep_circular(
        &self,
        node: &Schema,
        obj: &SchemaObject,
        ctx: &ResolutionContext,
    ) -> Result<Schema, SchemaError> {
        Ok(match self.resolve_children(obj, ctx).await? {
            Some(rebuilt) => rebuilt.into_schema(),
            None => node.clone(),
        })
    }

    async fn expand_ref(
        &self,
        reference: &str,
        ctx: &ResolutionContext,
    ) -> Result<Expansion, SchemaError> {
        let key = reference_key(REF, ctx.base_uri(), reference);
        if let Some(hit) = ctx.caches().reference(ctx.base_uri(), reference) {
            tracing::trace!(reference, "reference cache hit");
            return Ok(Expansion::Resolved(hit));
        }
        if ctx.on_path(&key) {
            return self.circular(&key, reference, ctx);
        }
        self.check_depth(reference, ctx)?;

        let parts = split_reference(reference);
        if parts.is_root_fragment() {
            return self.circular(&key, reference, ctx);
        }

        let (document, base) = self.base_document(parts.uri, reference, ctx).await?;
        let target = locate(&document, parts.fragment)?;
        let resolved = self
            .expand(target, &key, reference, document, base, ctx)
            .await?;
        ctx.caches()
            .store_reference(ctx.base_uri(), reference, &resolved);
        Ok(Expansion::Resolved(resolved))
    }

    async fn expand_recursive_ref(
        &self,
        reference: &str,
        ctx: &ResolutionContext,
    ) -> Result<Expansion, SchemaError> {
        let key = reference_key(RECURSIVE_REF, ctx.base_uri(), reference);
        if ctx.on_path(&key) {
            return self.circular(&key, reference, ctx);
        }
        self.check_depth(reference, ctx)?;

        let parts = split_reference(reference);
        if parts.is_root_fragment() {
            return self.circular(&key, reference, ctx);
        }

        let (anchor, root, base) = match parts.uri {
            Some(_) => {
                let (document, base) = self.base_document(parts.uri, reference, ctx).await?;
                (document.clone(), document, base)
            }
            None => {
                let anchor = ctx
                    .recursive_anchor()
                    .unwrap_or_else(|| ctx.root())
                    .clone();
                (anchor, ctx.root().clone(), ctx.base_uri().map(str::to_string))
            }
        };
        let target = locate(&anchor, parts.fragment)?;
        let resolved = self.expand(target, &key, reference, root, base, ctx).await?;
        Ok(Expansion::Resolved(resolved))
    }

    async fn expand_dynamic_ref(
        &self,
        reference: &str,
        ctx: &ResolutionContext,
    ) -> Result<Expansion, SchemaError> {
        let parts = split_reference(reference);
        if parts.uri.is_some() {
            return self.expand_ref(reference, ctx).await;
        }

        let key = reference_key(DYNAMIC_REF, ctx.base_uri(), reference);
        if ctx.on_path(&key) {
            return self.circular(&key, reference, ctx);
        }
        self.check_depth(reference, ctx)?;

        let fragment = parts.fragment.unwrap_or_default();
        if fragment.is_empty() {
            return self.circular(&key, reference, ctx);
        }

        let target = if fragment.starts_with('/') {
            navigate(ctx.root(), fragment)?
        } else {
            let (name, suffix) = match fragment.find('/') {
                Some(at) => fragment.split_at(at),
                None => (fragment, ""),
            };
            match ctx.lookup_dynamic(name) {
                Some(_) if suffix.is_empty() => return self.circular(&key, reference, ctx),
                Some(bound) => navigate(bound, suffix)?,
                None => {
                    let found = find_anchor(ctx.root(), name).ok_or_else(|| {
                        SchemaError::CannotResolveDynamicReference {
                            reference: reference.to_string(),
                        }
                    })?;
                    navigate(&found, suffix)?
                }
            }
        };

        let root = ctx.root().clone();
        let base = ctx.base_uri().map(str::to_string);
        let resolved = self.expand(target, &key, reference, root, base, ctx).await?;
        Ok(Expansion::Resolved(resolved))
    }

    /// Resolve a located target one hop deeper, with `key` on the path.
    async fn expand(
        &self,
        target: Schema,
        key: &str,
        reference: &str,
        root: Schema,
        base: Option<String>,
        ctx: &ResolutionContext,
    ) -> Result<Schema, SchemaError> {
        tracing::debug!(reference, depth = ctx.depth() + 1, "expanding reference");
        ctx.caches().record_expansion();
        let child = ctx.descend(key, root, base);
        self.resolve_node(target, child).await
    }

    /// Resolve the siblings of a reference keyword and lay them over the
    /// resolved target. Siblings win on collision.
    async fn merge_siblings(
        &self,
        obj: &SchemaObject,
        target: Schema,
        ctx: &ResolutionContext,
    ) -> Result<Schema, SchemaError> {
        let siblings: SchemaObject = obj
            .iter()
            .filter(|(name, _)| !REFERENCE_KEYWORDS.contains(&name.as_str()))
            .map(|(name, keyword)| (name.clone(), keyword.clone()))
            .collect();
        if siblings.is_empty() {
            return Ok(target);
        }
        let siblings = self
            .resolve_children(&siblings, ctx)
            .await?
            .unwrap_or(siblings);

        Ok(match target {
            Schema::Bool(false) => Schema::Bool(false),
            Schema::Bool(true) => siblings.into_schema(),
            Schema::Object(target) => {
                let mut merged = SchemaObject::clone(&target);
                for (name, keyword) in siblings.iter() {
                    merged.insert(name.clone(), keyword.clone());
                }
                merged.into_schema()
            }
        })
    }

    /// The document a reference's URI part names (or the current root when
    /// there is none), with the base URI that applies inside it.
    async fn base_document(
        &self,
        relative: Option<&str>,
        reference: &str,
        ctx: &ResolutionContext,
    ) -> Result<(Schema, Option<String>), SchemaError> {
        let Some(relative) = relative else {
            return Ok((ctx.root().clone(), ctx.base_uri().map(str::to_string)));
        };
        let absolute = uri::join(ctx.base_uri(), relative);
        let absolute = uri::strip_empty_fragment(&absolute).to_string();
        let document = self.load(&absolute, reference).await?;
        Ok((document, Some(absolute)))
    }

    /// Fetch a document from the store, falling back to the loader.
    async fn load(&self, uri: &str, reference: &str) -> Result<Schema, SchemaError> {
        if let Some(document) = self.store.get(uri) {
            return Ok(document);
        }

        tracing::debug!(uri, "loading external schema");
        match self.loader.load(uri).await {
            Ok(Some(document)) => {
                self.store.register_document(&document, Some(uri));
                Ok(document)
            }
            Ok(None) => Err(SchemaError::CannotResolveReference {
                reference: reference.to_string(),
            }),
            Err(err) => {
                tracing::warn!(uri, error = %err, "external schema loader failed");
                Err(loader_error(uri, err))
            }
        }
    }

    fn check_depth(&self, reference: &str, ctx: &ResolutionContext) -> Result<(), SchemaError> {
        if ctx.depth() >= self.options.max_depth {
            return Err(SchemaError::MaxDepthExceeded {
                max_depth: self.options.max_depth,
                reference: reference.to_string(),
            });
        }
        Ok(())
    }

    fn circular(
        &self,
        key: &str,
        reference: &str,
        ctx: &ResolutionContext,
    ) -> Result<Expansion, SchemaError> {
        if !self.options.circular_handling.keeps_edges() {
            return Err(SchemaError::circular(reference));
        }
        tracing::debug!(
            reference,
            depth = ctx.depth(),
            policy = %self.options.circular_handling,
            "keeping circular reference"
        );
        ctx.caches().record_circular(key);
        Ok(Expansion::Circular)
    }
}

/// Extend the context with whatever scope `node` opens for its descendants.
fn enter_scope(node: &Schema, obj: &SchemaObject, ctx: ResolutionContext) -> ResolutionContext {
    let mut ctx = ctx;
    if let Some(id) = obj.id() {
        let base = uri::join(ctx.base_uri(), id);
        ctx = ctx.with_base_uri(uri::strip_empty_fragment(&base).to_string());
    }
    if obj.recursive_anchor() {
        ctx = ctx.with_recursive_anchor(node.clone());
    }
    if let Some(name) = obj.dynamic_anchor() {
        ctx = ctx.with_dynamic_anchor(name, node.clone());
    }
    ctx
}

fn warn_on_conflict(obj: &SchemaObject, chosen: Reference<'_>) {
    let present = obj.reference_keywords();
    if present.len() > 1 {
        tracing::warn!(
            keywords = ?present,
            using = chosen.keyword(),
            "schema node carries more than one reference keyword"
        );
    }
}

fn reference_key(keyword: &str, base: Option<&str>, reference: &str) -> String {
    format!("{keyword}|{}|{reference}", base.unwrap_or_default())
}

/// Apply a reference fragment to its document: a pointer when it starts
/// with `/`, otherwise an anchor name (falling back to a bare pointer).
fn locate(document: &Schema, fragment: Option<&str>) -> Result<Schema, SchemaError> {
    match fragment {
        None | Some("") => Ok(document.clone()),
        Some(pointer) if pointer.starts_with('/') => navigate(document, pointer),
        Some(name) => match find_anchor(document, name) {
            Some(found) => Ok(found),
            None => navigate(document, name),
        },
    }
}

/// Depth-first search of `document` for a node whose `$anchor` (or
/// `$dynamicAnchor`) is `name`. References are not followed.
fn find_anchor(document: &Schema, name: &str) -> Option<Schema> {
    let mut visited = HashSet::new();
    let mut stack = vec![document];
    while let Some(node) = stack.pop() {
        let Some(obj) = node.as_object() else {
            continue;
        };
        if let Some(id) = node.node_id() {
            if !visited.insert(id) {
                continue;
            }
        }
        if obj.anchor() == Some(name) || obj.dynamic_anchor() == Some(name) {
            return Some(node.clone());
        }
        let children = obj.subschemas();
        stack.extend(children.iter().rev().map(|child| child.schema));
    }
    None
}

fn loader_error(uri: &str, err: BoxError) -> SchemaError {
    match err.downcast::<SchemaError>() {
        Ok(schema_error) => *schema_error,
        Err(other) => SchemaError::Loader {
            uri: uri.to_string(),
            message: other.to_string(),
        },
    }
}

/// Whether resolution left a keyword untouched (same nodes, same shape).
fn same_keyword(a: &Keyword, b: &Keyword) -> bool {
    match (a, b) {
        (Keyword::Schema(a), Keyword::Schema(b)) => same_node(a, b),
        (Keyword::List(a), Keyword::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| same_keyword(a, b))
        }
        (Keyword::Map(a), Keyword::Map(b)) => {
            a.len() == b.len() && a.values().zip(b.values()).all(|(a, b)| same_keyword(a, b))
        }
        (Keyword::Value(_), Keyword::Value(_)) => true,
        _ => false,
    }
}

fn same_node(a: &Schema, b: &Schema) -> bool {
    match (a, b) {
        (Schema::Bool(a), Schema::Bool(b)) => a == b,
        (Schema::Object(a), Schema::Object(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}
