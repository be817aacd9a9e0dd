//! # Schema Store & External Loading
//!
//! The [`SchemaStore`] is the resolver's registry of known documents, keyed
//! by absolute URI. It is populated explicitly ([`SchemaStore::register_document`],
//! [`crate::Resolver::add_schema`]) or lazily, when a reference names a URI
//! the store does not know and the injected [`SchemaLoader`] produces it.
//!
//! Entries are appended and never removed or replaced for the lifetime of
//! the store: the first document registered under a URI is the one served.
//!
//! ## Embedded resources
//!
//! Registering a document also registers every embedded subschema that
//! declares its own `$id`, joined against the enclosing base URI. A
//! reference to `item.json` from a document that embeds
//! `{"$id": "item.json", ...}` therefore resolves from the store without
//! consulting the loader.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;
use parking_lot::RwLock;
use schemaref_core::Schema;

use crate::uri;

/// Error type loaders may return. Any error is accepted; it is wrapped into
/// `SchemaError::Loader` with its message preserved.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Caller-supplied source of external schema documents.
///
/// `load` is the only suspension point of a resolution. Returning
/// `Ok(None)` means "no such document" and surfaces as
/// `CannotResolveReference`; returning `Err` aborts the resolution.
///
/// There is no retry: loaders that want retry-on-transient-failure or a
/// timeout must implement it themselves.
pub trait SchemaLoader: Send + Sync {
    fn load<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<Option<Schema>, BoxError>>;
}

/// The default loader: knows no documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLoader;

impl SchemaLoader for NoopLoader {
    fn load<'a>(&'a self, _uri: &'a str) -> BoxFuture<'a, Result<Option<Schema>, BoxError>> {
        Box::pin(async { Ok::<_, BoxError>(None) })
    }
}

/// Adapts an async closure into a [`SchemaLoader`]. See [`loader_fn`].
pub struct FnLoader<F> {
    f: F,
}

/// Wrap `f` as a loader:
///
/// ```
/// use schemaref_core::Schema;
/// use schemaref_resolver::{loader_fn, BoxError};
///
/// let loader = loader_fn(|uri: String| async move {
///     tracing::debug!(%uri, "not found");
///     Ok::<Option<Schema>, BoxError>(None)
/// });
/// # let _ = loader;
/// ```
pub fn loader_fn<F, Fut>(f: F) -> FnLoader<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Schema>, BoxError>> + Send + 'static,
{
    FnLoader { f }
}

impl<F, Fut> SchemaLoader for FnLoader<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Schema>, BoxError>> + Send + 'static,
{
    fn load<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<Option<Schema>, BoxError>> {
        Box::pin((self.f)(uri.to_string()))
    }
}

impl<F> fmt::Debug for FnLoader<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnLoader").finish_non_exhaustive()
    }
}

/// Registry of schema documents by absolute URI.
#[derive(Debug, Default)]
pub struct SchemaStore {
    schemas: RwLock<HashMap<String, Schema>>,
}

impl SchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `schema` under `uri` (an empty trailing fragment is ignored).
    ///
    /// The first registration of a URI is kept; returns `false` when `uri`
    /// was already taken.
    pub fn add(&self, uri: &str, schema: Schema) -> bool {
        let key = uri::strip_empty_fragment(uri).to_string();
        match self.schemas.write().entry(key) {
            Entry::Occupied(existing) => {
                tracing::debug!(uri = %existing.key(), "schema already registered, keeping first");
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(schema);
                true
            }
        }
    }

    /// Look up a document by URI.
    pub fn get(&self, uri: &str) -> Option<Schema> {
        self.schemas
            .read()
            .get(uri::strip_empty_fragment(uri))
            .cloned()
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.schemas
            .read()
            .contains_key(uri::strip_empty_fragment(uri))
    }

    /// Number of registered URIs (embedded resources count separately).
    pub fn len(&self) -> usize {
        self.schemas.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.read().is_empty()
    }

    /// All registered URIs, sorted.
    pub fn uris(&self) -> Vec<String> {
        let mut uris: Vec<String> = self.schemas.read().keys().cloned().collect();
        uris.sort();
        uris
    }

    /// Register a document under `uri`, or under its own `$id` when no URI is
    /// given, together with its embedded `$id` resources.
    ///
    /// Returns the URI the document was registered under, or `None` (and
    /// registers nothing) when neither an explicit URI nor an `$id` exists.
    pub fn register_document(&self, schema: &Schema, uri: Option<&str>) -> Option<String> {
        let own_id = schema.as_object().and_then(|obj| obj.id());
        let base = match (uri, own_id) {
            (Some(explicit), _) => uri::join(None, explicit),
            (None, Some(id)) => uri::join(None, id),
            (None, None) => return None,
        };
        let base = uri::strip_empty_fragment(&base).to_string();

        if self.add(&base, schema.clone()) {
            tracing::debug!(uri = %base, "registered schema document");
        }
        if let Some(obj) = schema.as_object() {
            for child in obj.subschemas() {
                self.register_embedded(child.schema, &base);
            }
        }
        Some(base)
    }

    fn register_embedded(&self, schema: &Schema, parent_base: &str) {
        let Some(obj) = schema.as_object() else {
            return;
        };
        let base = match obj.id() {
            Some(id) => {
                let joined = uri::join(Some(parent_base), id);
                let joined = uri::strip_empty_fragment(&joined).to_string();
                self.add(&joined, schema.clone());
                joined
            }
            None => parent_base.to_string(),
        };
        for child in obj.subschemas() {
            self.register_embedded(child.schema, &base);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(value: serde_json::Value) -> Schema {
        Schema::from_json(&value).unwrap()
    }

    #[test]
    fn add_and_get_normalise_empty_fragment() {
        let store = SchemaStore::new();
        store.add("https://example.com/a.json#", schema(json!({"type": "string"})));
        assert!(store.contains("https://example.com/a.json"));
        assert!(store.get("https://example.com/a.json#").is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn first_registration_is_kept() {
        let store = SchemaStore::new();
        assert!(store.add("urn:example:v", schema(json!({"type": "string"}))));
        assert!(!store.add("urn:example:v#", schema(json!({"type": "integer"}))));
        assert_eq!(store.get("urn:example:v").unwrap().to_json()["type"], "string");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn register_without_id_is_a_no_op() {
        let store = SchemaStore::new();
        assert_eq!(store.register_document(&schema(json!({"type": "object"})), None), None);
        assert!(store.is_empty());
    }

    #[test]
    fn explicit_uri_wins_over_id() {
        let store = SchemaStore::new();
        let doc = schema(json!({"$id": "https://example.com/own.json"}));
        let uri = store.register_document(&doc, Some("https://example.com/explicit.json"));
        assert_eq!(uri.as_deref(), Some("https://example.com/explicit.json"));
        assert!(store.contains("https://example.com/explicit.json"));
    }

    #[test]
    fn registers_embedded_resources() {
        let store = SchemaStore::new();
        let doc = schema(json!({
            "$id": "https://example.com/schemas/root.json",
            "$defs": {
                "item": {
                    "$id": "item.json",
                    "type": "object",
                    "properties": {
                        "tag": {"$id": "tags/tag.json", "type": "string"}
                    }
                }
            }
        }));
        store.register_document(&doc, None);
        assert_eq!(
            store.uris(),
            vec![
                "https://example.com/schemas/item.json",
                "https://example.com/schemas/root.json",
                "https://example.com/schemas/tags/tag.json",
            ]
        );
        let tag = store.get("https://example.com/schemas/tags/tag.json").unwrap();
        assert_eq!(tag.to_json()["type"], "string");
    }

    #[test]
    fn non_uri_ids_register_literally() {
        let store = SchemaStore::new();
        store.register_document(&schema(json!({"$id": "user"})), None);
        assert!(store.contains("user"));
    }

    #[tokio::test]
    async fn noop_loader_knows_nothing() {
        assert!(NoopLoader.load("https://example.com/x.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn closure_loader_receives_uri() {
        let loader = loader_fn(|uri: String| async move {
            if uri.ends_with("known.json") {
                Ok(Some(Schema::Bool(true)))
            } else {
                Err::<Option<Schema>, BoxError>(format!("unreachable host for {uri}").into())
            }
        });
        assert_eq!(
            loader.load("https://example.com/known.json").await.unwrap(),
            Some(Schema::Bool(true))
        );
        let err = loader.load("https://example.com/other.json").await.unwrap_err();
        assert!(err.to_string().contains("unreachable host"));
    }
}
