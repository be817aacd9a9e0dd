//! # Error Types — Reference Resolution Failures
//!
//! Defines the single error taxonomy surfaced by the resolution engine.
//! All errors use `thiserror` for derive-based `Display` and `Error`
//! implementations.
//!
//! ## Design
//!
//! - Every failure aborts the whole `resolve()` call; there are no partial
//!   results and no automatic retry.
//! - Messages name the offending reference or pointer so that callers can
//!   locate the problem without a debugger.
//! - Failures raised by caller-supplied loaders are wrapped into
//!   [`SchemaError::Loader`] with the original message preserved.

use std::fmt;

use thiserror::Error;

/// Error raised while navigating or resolving a schema document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A reference reappeared on the active resolution path while the
    /// circular-handling policy is `error`.
    #[error("Circular reference detected: {reference}")]
    CircularReference {
        /// The reference identifier that closed the cycle.
        reference: String,
    },

    /// The global reference-expansion counter reached its ceiling.
    #[error("Maximum reference depth of {max_depth} exceeded while resolving {reference}")]
    MaxDepthExceeded {
        /// Configured ceiling.
        max_depth: usize,
        /// The reference that would have exceeded it.
        reference: String,
    },

    /// A JSON Pointer is malformed or walks through a non-container value.
    #[error("Invalid JSON pointer {pointer}: {reason}")]
    InvalidPointer {
        /// The full pointer as written.
        pointer: String,
        /// Why the pointer could not be followed.
        reason: String,
    },

    /// A JSON Pointer names a key or index that does not exist.
    #[error("JSON pointer {pointer} not found: no member {segment:?}")]
    PointerNotFound {
        /// The full pointer as written.
        pointer: String,
        /// The unescaped segment that was missing.
        segment: String,
    },

    /// No document could be found for a `$ref` / `$recursiveRef`.
    #[error("Cannot resolve reference {reference}")]
    CannotResolveReference {
        /// The reference as written.
        reference: String,
    },

    /// No dynamic or static anchor matched a `$dynamicRef`.
    #[error("Cannot resolve dynamic reference {reference}")]
    CannotResolveDynamicReference {
        /// The reference as written.
        reference: String,
    },

    /// The injected external-schema loader failed.
    #[error("Failed to load external schema {uri}: {message}")]
    Loader {
        /// Absolute URI handed to the loader.
        uri: String,
        /// The loader's own error message.
        message: String,
    },

    /// The input is not a JSON Schema (neither boolean nor object).
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
}

/// Fieldless category of a [`SchemaError`], for callers that branch on the
/// kind of failure rather than its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    CircularReference,
    MaxDepthExceeded,
    InvalidPointer,
    PointerNotFound,
    CannotResolveReference,
    CannotResolveDynamicReference,
    Loader,
    InvalidSchema,
}

impl SchemaError {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CircularReference { .. } => ErrorKind::CircularReference,
            Self::MaxDepthExceeded { .. } => ErrorKind::MaxDepthExceeded,
            Self::InvalidPointer { .. } => ErrorKind::InvalidPointer,
            Self::PointerNotFound { .. } => ErrorKind::PointerNotFound,
            Self::CannotResolveReference { .. } => ErrorKind::CannotResolveReference,
            Self::CannotResolveDynamicReference { .. } => {
                ErrorKind::CannotResolveDynamicReference
            }
            Self::Loader { .. } => ErrorKind::Loader,
            Self::InvalidSchema(_) => ErrorKind::InvalidSchema,
        }
    }

    /// Shorthand for [`SchemaError::CircularReference`].
    pub fn circular(reference: impl Into<String>) -> Self {
        Self::CircularReference {
            reference: reference.into(),
        }
    }

    /// Shorthand for [`SchemaError::InvalidPointer`].
    pub fn invalid_pointer(pointer: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::InvalidPointer {
            pointer: pointer.into(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CircularReference => "CircularReferenceDetected",
            Self::MaxDepthExceeded => "MaxDepthExceeded",
            Self::InvalidPointer => "InvalidPointer",
            Self::PointerNotFound => "PointerNotFound",
            Self::CannotResolveReference => "CannotResolveReference",
            Self::CannotResolveDynamicReference => "CannotResolveDynamicReference",
            Self::Loader => "LoaderFailure",
            Self::InvalidSchema => "InvalidSchema",
        };
        f.write_str(name)
    }
}
