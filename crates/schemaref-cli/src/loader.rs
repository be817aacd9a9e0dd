//! # Directory-backed schema loading
//!
//! [`DirectoryLoader`] serves external references from a local directory:
//! `https://example.com/schemas/address.json` is read from
//! `<dir>/address.json`, and a plain relative reference such as
//! `common/types.yaml` from `<dir>/common/types.yaml`.
//!
//! Files ending in `.yaml`/`.yml` are parsed as YAML, everything else as JSON.

use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use schemaref_core::{Schema, SchemaError};
use schemaref_resolver::{BoxError, SchemaLoader};
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Error reading a schema document from disk.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The file could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not valid JSON/YAML.
    #[error("cannot parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// The document parsed but is not a schema.
    #[error("{path} is not a schema: {source}")]
    NotASchema {
        path: PathBuf,
        source: SchemaError,
    },
}

/// Read and parse a schema document.
pub async fn read_schema(path: &Path) -> Result<Schema, LoadError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    parse_document(path, &text)
}

/// Parse `text` as JSON or YAML depending on the extension of `path`.
pub fn parse_document(path: &Path, text: &str) -> Result<Schema, LoadError> {
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    let value: Value = if is_yaml {
        serde_yaml::from_str(text).map_err(|e| LoadError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?
    } else {
        serde_json::from_str(text).map_err(|e| LoadError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?
    };
    Schema::from_json(&value).map_err(|source| LoadError::NotASchema {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads referenced documents from one directory.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file a URI maps to, if any.
    pub fn path_for(&self, uri: &str) -> Option<PathBuf> {
        match Url::parse(uri) {
            Ok(url) => {
                let name = url.path_segments()?.next_back()?;
                (!name.is_empty()).then(|| self.root.join(name))
            }
            Err(_) => {
                let relative = uri.split('#').next().unwrap_or_default();
                (!relative.is_empty()).then(|| self.root.join(relative))
            }
        }
    }
}

impl SchemaLoader for DirectoryLoader {
    fn load<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<Option<Schema>, BoxError>> {
        Box::pin(async move {
            let Some(path) = self.path_for(uri) else {
                tracing::debug!(uri, "no local file for reference");
                return Ok(None);
            };
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                tracing::debug!(uri, path = %path.display(), "referenced file not found");
                return Ok(None);
            }
            tracing::info!(uri, path = %path.display(), "loading referenced schema");
            let schema = read_schema(&path).await?;
            Ok::<_, BoxError>(Some(schema))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_absolute_uris_to_last_segment() {
        let loader = DirectoryLoader::new("/schemas");
        assert_eq!(
            loader.path_for("https://example.com/v1/address.json"),
            Some(PathBuf::from("/schemas/address.json"))
        );
        assert_eq!(loader.path_for("https://example.com/"), None);
        assert_eq!(loader.path_for("urn:example:thing"), None);
    }

    #[test]
    fn maps_relative_references_as_is() {
        let loader = DirectoryLoader::new("/schemas");
        assert_eq!(
            loader.path_for("common/types.yaml"),
            Some(PathBuf::from("/schemas/common/types.yaml"))
        );
        assert_eq!(loader.path_for(""), None);
    }

    #[test]
    fn parses_by_extension() {
        let yaml = parse_document(Path::new("a.yaml"), "type: string\n").unwrap();
        assert_eq!(yaml.to_json()["type"], "string");

        let json = parse_document(Path::new("a.json"), r#"{"type": "integer"}"#).unwrap();
        assert_eq!(json.to_json()["type"], "integer");

        let err = parse_document(Path::new("a.json"), "type: string").unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));

        let err = parse_document(Path::new("a.json"), "[1]").unwrap_err();
        assert!(matches!(err, LoadError::NotASchema { .. }));
    }

    #[tokio::test]
    async fn missing_files_are_not_errors() {
        let dir = tempfile::tempdir().unwrap();
        let loader = DirectoryLoader::new(dir.path());
        assert!(loader.load("https://example.com/absent.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn loads_yaml_documents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("point.yml"), "type: object\nrequired: [x, y]\n").unwrap();
        let loader = DirectoryLoader::new(dir.path());
        let schema = loader
            .load("https://example.com/geo/point.yml")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(schema.to_json()["required"], serde_json::json!(["x", "y"]));
    }
}
