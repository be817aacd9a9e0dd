//! # Multi-Document Resolution
//!
//! References across documents: explicit registration, embedded `$id`
//! resources, lazy loading through the injected loader, loader failures,
//! and cycles that span documents.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use schemaref_core::{ErrorKind, Schema, SchemaError};
use schemaref_resolver::{loader_fn, BoxError, CircularHandling, Resolver, SchemaStore};
use serde_json::{json, Value};

fn schema(value: Value) -> Schema {
    Schema::from_json(&value).unwrap()
}

/// A loader serving a fixed set of documents and counting calls.
fn fixture_loader(
    docs: Vec<(&'static str, Value)>,
    calls: Arc<AtomicUsize>,
) -> impl schemaref_resolver::SchemaLoader {
    let docs: Arc<Vec<(&'static str, Value)>> = Arc::new(docs);
    loader_fn(move |uri: String| {
        let docs = Arc::clone(&docs);
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            let found = docs.iter().find(|(known, _)| *known == uri);
            match found {
                Some((_, value)) => Ok(Some(Schema::from_json(value)?)),
                None => Ok::<Option<Schema>, BoxError>(None),
            }
        }
    })
}

// -- Explicit registration ----------------------------------------------------

#[tokio::test]
async fn test_add_schema_requires_an_identifier() {
    let resolver = Resolver::default();
    assert!(!resolver.add_schema(&schema(json!({"type": "string"})), None));
    assert!(resolver.add_schema(&schema(json!({"type": "string"})), Some("urn:example:str")));
    assert!(resolver.add_schema(&schema(json!({"$id": "https://example.com/n.json"})), None));
    assert_eq!(
        resolver.store().uris(),
        vec!["https://example.com/n.json", "urn:example:str"]
    );
}

#[tokio::test]
async fn test_relative_reference_to_registered_document() {
    let resolver = Resolver::default();
    resolver.add_schema(
        &schema(json!({
            "$id": "https://example.com/schemas/address.json",
            "type": "object",
            "properties": {"street": {"type": "string"}}
        })),
        None,
    );
    let person = schema(json!({
        "$id": "https://example.com/schemas/person.json",
        "properties": {"address": {"$ref": "address.json"}}
    }));
    let resolved = resolver.resolve(&person).await.unwrap().to_json();
    assert_eq!(resolved["properties"]["address"]["properties"]["street"]["type"], "string");
}

#[tokio::test]
async fn test_pointer_into_registered_document() {
    let resolver = Resolver::default();
    resolver.add_schema(
        &schema(json!({"$defs": {"id": {"type": "string", "format": "uuid"}}})),
        Some("https://example.com/common.json"),
    );
    let input = schema(json!({
        "properties": {"id": {"$ref": "https://example.com/common.json#/$defs/id"}}
    }));
    let resolved = resolver.resolve(&input).await.unwrap().to_json();
    assert_eq!(resolved["properties"]["id"]["format"], "uuid");
}

#[tokio::test]
async fn test_recursive_and_dynamic_refs_with_uri_use_the_store() {
    let resolver = Resolver::default();
    resolver.add_schema(
        &schema(json!({"$defs": {"s": {"type": "string"}}})),
        Some("https://example.com/other.json"),
    );
    let input = schema(json!({
        "$id": "https://example.com/root.json",
        "$recursiveAnchor": true,
        "$dynamicAnchor": "s",
        "properties": {
            "recursive": {"$recursiveRef": "other.json#/$defs/s"},
            "dynamic": {"$dynamicRef": "other.json#/$defs/s"}
        }
    }));
    let resolved = resolver.resolve(&input).await.unwrap().to_json();
    assert_eq!(resolved["properties"]["recursive"], json!({"type": "string"}));
    assert_eq!(resolved["properties"]["dynamic"], json!({"type": "string"}));
}

#[tokio::test]
async fn test_resolving_does_not_replace_registered_document() {
    let resolver = Resolver::default();
    assert!(resolver.add_schema(
        &schema(json!({"$id": "https://example.com/v.json", "type": "string"})),
        None
    ));
    let newer = schema(json!({"$id": "https://example.com/v.json", "type": "integer"}));
    resolver.resolve(&newer).await.unwrap();

    let stored = resolver.store().get("https://example.com/v.json").unwrap();
    assert_eq!(stored.to_json()["type"], "string");
    assert_eq!(resolver.store().len(), 1);
}

#[tokio::test]
async fn test_embedded_resources_resolve_without_loader() {
    let input = schema(json!({
        "$id": "https://example.com/root.json",
        "properties": {"item": {"$ref": "item.json"}},
        "$defs": {"item": {"$id": "item.json", "type": "integer"}}
    }));
    let resolver = Resolver::default();
    let resolved = resolver.resolve(&input).await.unwrap().to_json();
    assert_eq!(resolved["properties"]["item"]["type"], "integer");
    assert!(resolver.store().contains("https://example.com/item.json"));
}

#[tokio::test]
async fn test_store_can_be_shared_between_resolvers() {
    let store = Arc::new(SchemaStore::new());
    store.add("urn:example:flag", schema(json!({"type": "boolean"})));
    let resolver = Resolver::builder().store(Arc::clone(&store)).build();
    let resolved = resolver
        .resolve(&schema(json!({"items": {"$ref": "urn:example:flag"}})))
        .await
        .unwrap()
        .to_json();
    assert_eq!(resolved["items"], json!({"type": "boolean"}));
}

// -- Loader -------------------------------------------------------------------

#[tokio::test]
async fn test_loaded_documents_are_registered_and_reused() {
    let calls = Arc::new(AtomicUsize::new(0));
    let resolver = Resolver::builder()
        .loader(fixture_loader(
            vec![(
                "https://example.com/defs.json",
                json!({
                    "$defs": {
                        "name": {"$ref": "#/$defs/text"},
                        "age": {"type": "integer", "minimum": 0},
                        "text": {"type": "string"}
                    }
                }),
            )],
            Arc::clone(&calls),
        ))
        .build();

    let input = schema(json!({
        "$id": "https://example.com/person.json",
        "properties": {
            "name": {"$ref": "defs.json#/$defs/name"},
            "age": {"$ref": "defs.json#/$defs/age"}
        }
    }));
    let resolved = resolver.resolve(&input).await.unwrap().to_json();
    assert_eq!(resolved["properties"]["name"], json!({"type": "string"}));
    assert_eq!(resolved["properties"]["age"]["minimum"], 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(resolver.store().contains("https://example.com/defs.json"));

    // A second call is served from the store.
    resolver.resolve(&input).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_non_uri_base_uses_literal_reference() {
    let calls = Arc::new(AtomicUsize::new(0));
    let resolver = Resolver::builder()
        .loader(fixture_loader(
            vec![("other.json", json!({"type": "null"}))],
            Arc::clone(&calls),
        ))
        .build();
    let resolved = resolver
        .resolve(&schema(json!({"$id": "user", "properties": {"o": {"$ref": "other.json"}}})))
        .await
        .unwrap()
        .to_json();
    assert_eq!(resolved["properties"]["o"], json!({"type": "null"}));
}

#[tokio::test]
async fn test_unknown_document_cannot_be_resolved() {
    let resolver = Resolver::default();
    let err = resolver
        .resolve(&schema(json!({"properties": {"x": {"$ref": "https://example.com/missing.json"}}})))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        SchemaError::CannotResolveReference {
            reference: "https://example.com/missing.json".into()
        }
    );
}

#[tokio::test]
async fn test_loader_failure_is_wrapped_with_its_message() {
    let resolver = Resolver::builder()
        .loader(loader_fn(|uri: String| async move {
            Err::<Option<Schema>, BoxError>(format!("connection refused for {uri}").into())
        }))
        .build();
    let err = resolver
        .resolve(&schema(json!({"$ref": "https://example.com/remote.json"})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Loader);
    let message = err.to_string();
    assert!(message.contains("https://example.com/remote.json"), "{message}");
    assert!(message.contains("connection refused"), "{message}");
}

#[tokio::test]
async fn test_loader_schema_errors_pass_through() {
    let resolver = Resolver::builder()
        .loader(loader_fn(|_uri: String| async move {
            let doc = Schema::from_json(&json!([1, 2, 3]))?;
            Ok::<Option<Schema>, BoxError>(Some(doc))
        }))
        .build();
    let err = resolver
        .resolve(&schema(json!({"$ref": "https://example.com/array.json"})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSchema);
}

// -- Cycles across documents --------------------------------------------------

#[tokio::test]
async fn test_cycle_spanning_two_documents() {
    let docs = vec![(
        "https://example.com/b.json",
        json!({"properties": {"a": {"$ref": "a.json"}}}),
    )];
    let root = schema(json!({
        "$id": "https://example.com/a.json",
        "properties": {"b": {"$ref": "b.json"}}
    }));

    let strict = Resolver::builder()
        .loader(fixture_loader(docs.clone(), Arc::new(AtomicUsize::new(0))))
        .build();
    let err = strict.resolve(&root).await.unwrap_err();
    assert_eq!(err, SchemaError::circular("b.json"));

    let lenient = Resolver::builder()
        .circular_handling(CircularHandling::Ignore)
        .loader(fixture_loader(docs, Arc::new(AtomicUsize::new(0))))
        .build();
    let report = lenient.resolve_with_report(&root).await.unwrap();
    let a_inside_b = &report.schema.to_json()["properties"]["b"]["properties"]["a"];
    assert_eq!(a_inside_b["properties"]["b"], json!({"$ref": "b.json"}));
    assert_eq!(report.circular_edges, vec!["$ref|https://example.com/a.json|b.json"]);
}
