//! # JSON Pointer Navigation
//!
//! Pure navigation of RFC 6901 pointers over the [`Schema`] AST. Accepts
//! fragment form (`#`, `#/a/b`) and bare form (`/a/b`, `a/b`).
//!
//! The walk is greedy: every intermediate value must be an object or an
//! array, and array index tokens are plain decimal strings. Whatever the
//! pointer lands on must itself be a schema (boolean or object).

use serde_json::Value;

use crate::error::SchemaError;
use crate::schema::{Keyword, Schema};

/// A reference split on its first `#`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceParts<'a> {
    /// Everything before `#`, if non-empty.
    pub uri: Option<&'a str>,
    /// Everything after `#`, if a `#` was present (may be empty).
    pub fragment: Option<&'a str>,
}

impl ReferenceParts<'_> {
    /// A reference with no URI and an empty fragment (`#`): the document root.
    pub fn is_root_fragment(&self) -> bool {
        self.uri.is_none() && self.fragment.map_or(true, str::is_empty)
    }
}

/// Split a reference into its URI and fragment parts.
pub fn split_reference(reference: &str) -> ReferenceParts<'_> {
    match reference.split_once('#') {
        Some((uri, fragment)) => ReferenceParts {
            uri: (!uri.is_empty()).then_some(uri),
            fragment: Some(fragment),
        },
        None => ReferenceParts {
            uri: (!reference.is_empty()).then_some(reference),
            fragment: None,
        },
    }
}

/// Decode one reference token: `~1` becomes `/`, then `~0` becomes `~`.
pub fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Encode one reference token: `~` becomes `~0`, then `/` becomes `~1`.
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Where the walk currently stands.
enum Cursor<'a> {
    Schema(&'a Schema),
    Keyword(&'a Keyword),
    Value(&'a Value),
}

/// Follow `pointer` from `root` and return the addressed subschema.
///
/// # Errors
///
/// - [`SchemaError::PointerNotFound`] when a key is missing or an index is
///   out of range or not a decimal number.
/// - [`SchemaError::InvalidPointer`] when the walk steps into a scalar, or
///   the pointer lands on something that is not a schema.
pub fn navigate(root: &Schema, pointer: &str) -> Result<Schema, SchemaError> {
    let path = pointer.strip_prefix('#').unwrap_or(pointer);
    if path.is_empty() {
        return Ok(root.clone());
    }

    let mut segments = path.split('/').peekable();
    if segments.peek() == Some(&"") {
        segments.next();
    }

    let mut cursor = Cursor::Schema(root);
    for raw in segments {
        let token = unescape_token(raw);
        cursor = step(cursor, &token, pointer)?;
    }

    landing(cursor, pointer)
}

fn step<'a>(cursor: Cursor<'a>, token: &str, pointer: &str) -> Result<Cursor<'a>, SchemaError> {
    let not_found = || SchemaError::PointerNotFound {
        pointer: pointer.to_string(),
        segment: token.to_string(),
    };

    match cursor {
        Cursor::Schema(Schema::Bool(b)) => Err(SchemaError::invalid_pointer(
            pointer,
            format_args!("cannot descend into boolean schema `{b}` at {token:?}"),
        )),
        Cursor::Schema(Schema::Object(obj)) => {
            obj.get(token).map(Cursor::Keyword).ok_or_else(not_found)
        }
        Cursor::Keyword(Keyword::Schema(schema)) => step(Cursor::Schema(schema), token, pointer),
        Cursor::Keyword(Keyword::Value(value)) => step(Cursor::Value(value), token, pointer),
        Cursor::Keyword(Keyword::List(items)) => parse_index(token)
            .and_then(|i| items.get(i))
            .map(Cursor::Keyword)
            .ok_or_else(not_found),
        Cursor::Keyword(Keyword::Map(map)) => {
            map.get(token).map(Cursor::Keyword).ok_or_else(not_found)
        }
        Cursor::Value(Value::Object(map)) => {
            map.get(token).map(Cursor::Value).ok_or_else(not_found)
        }
        Cursor::Value(Value::Array(items)) => parse_index(token)
            .and_then(|i| items.get(i))
            .map(Cursor::Value)
            .ok_or_else(not_found),
        Cursor::Value(scalar) => Err(SchemaError::invalid_pointer(
            pointer,
            format_args!("cannot descend into scalar `{scalar}` at {token:?}"),
        )),
    }
}

fn landing(cursor: Cursor<'_>, pointer: &str) -> Result<Schema, SchemaError> {
    let value = match cursor {
        Cursor::Schema(schema) | Cursor::Keyword(Keyword::Schema(schema)) => {
            return Ok(schema.clone())
        }
        Cursor::Keyword(keyword) => keyword.to_json(),
        Cursor::Value(value) => value.clone(),
    };
    Schema::from_json(&value).map_err(|_| {
        SchemaError::invalid_pointer(pointer, format_args!("target `{value}` is not a schema"))
    })
}

/// Array indices are plain decimal strings without sign or leading zeros.
fn parse_index(token: &str) -> Option<usize> {
    let canonical = token == "0" || (!token.starts_with('0') && !token.is_empty());
    if canonical && token.bytes().all(|b| b.is_ascii_digit()) {
        token.parse().ok()
    } else {
        None
    }
}
