//! # Schema AST
//!
//! The tagged value type every component reads and writes. A [`Schema`] is
//! either a boolean literal (`true` accepts everything, `false` accepts
//! nothing) or an object node carrying keywords.
//!
//! ## Identity
//!
//! Object nodes live behind an [`Arc`], so cloning a `Schema` is cheap and
//! every object node has a stable identity ([`Schema::node_id`]) for as long
//! as some clone of it is alive. Equality ([`PartialEq`]) is structural and
//! never looks at identity.
//!
//! ## Immutability
//!
//! Nodes are never mutated once wrapped. Resolution builds new
//! [`SchemaObject`]s and wraps them with [`SchemaObject::into_schema`].
//!
//! ## Keyword shapes
//!
//! Conversion from JSON follows [`crate::keywords::shape_of`]: applicator
//! keywords become nested schemas, definition containers are converted
//! generically (so `#/definitions/items/1` can address an array member), and
//! everything else is kept verbatim as a [`Keyword::Value`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::keywords::{self, KeywordShape};
use crate::pointer::escape_token;

/// A JSON Schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// `true` or `false`.
    Bool(bool),
    /// An object schema.
    Object(Arc<SchemaObject>),
}

/// The keywords of an object schema, keyed by keyword name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaObject {
    keywords: BTreeMap<String, Keyword>,
}

/// The value of one keyword.
#[derive(Debug, Clone, PartialEq)]
pub enum Keyword {
    /// A subschema.
    Schema(Schema),
    /// An array of keyword values (usually subschemas).
    List(Vec<Keyword>),
    /// A map of keyword values (usually named subschemas).
    Map(BTreeMap<String, Keyword>),
    /// Plain JSON data, never traversed as a schema.
    Value(Value),
}

/// A subschema sitting directly below an object node.
#[derive(Debug, Clone)]
pub struct Subschema<'a> {
    /// The keyword it was found under.
    pub keyword: &'a str,
    /// Escaped pointer from the parent node, without a leading `/`
    /// (e.g. `properties/a~1b`, `allOf/0`).
    pub pointer: String,
    pub schema: &'a Schema,
}

/// The reference keyword a node dispatches on, decided once per node.
///
/// Precedence when several are present: `$dynamicRef`, then
/// `$recursiveRef`, then `$ref`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference<'a> {
    /// `$dynamicRef` (draft 2020-12).
    Dynamic(&'a str),
    /// `$recursiveRef` (draft 2019-09).
    Recursive(&'a str),
    /// `$ref`.
    Static(&'a str),
}

impl<'a> Reference<'a> {
    /// The reference string as written.
    pub fn target(&self) -> &'a str {
        match self {
            Self::Dynamic(s) | Self::Recursive(s) | Self::Static(s) => s,
        }
    }

    /// The keyword this reference was read from.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Dynamic(_) => keywords::DYNAMIC_REF,
            Self::Recursive(_) => keywords::RECURSIVE_REF,
            Self::Static(_) => keywords::REF,
        }
    }
}

impl Schema {
    /// Convert a JSON document into a schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidSchema`] if the root value is neither a
    /// boolean nor an object.
    pub fn from_json(value: &Value) -> Result<Self, SchemaError> {
        Self::from_json_node(value).ok_or_else(|| {
            SchemaError::InvalidSchema(format!(
                "expected a boolean or an object, found {}",
                json_type_name(value)
            ))
        })
    }

    /// Convert a JSON value that may or may not be a schema.
    fn from_json_node(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Object(map) => {
                let keywords = map
                    .iter()
                    .map(|(name, v)| (name.clone(), Keyword::from_json(name, v)))
                    .collect();
                Some(Self::Object(Arc::new(SchemaObject { keywords })))
            }
            _ => None,
        }
    }

    /// Convert back to JSON.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Object(obj) => obj.to_json(),
        }
    }

    /// The object node, if this is not a boolean schema.
    pub fn as_object(&self) -> Option<&SchemaObject> {
        match self {
            Self::Object(obj) => Some(obj),
            Self::Bool(_) => None,
        }
    }

    /// Identity of this node: the address of the shared object allocation.
    ///
    /// Two clones of the same node report the same id; structurally equal
    /// but separately built nodes do not. Boolean schemas have no identity.
    pub fn node_id(&self) -> Option<usize> {
        match self {
            Self::Object(obj) => Some(Arc::as_ptr(obj) as *const () as usize),
            Self::Bool(_) => None,
        }
    }

    /// Shorthand for [`SchemaObject::reference`] on object nodes.
    pub fn reference(&self) -> Option<Reference<'_>> {
        self.as_object().and_then(SchemaObject::reference)
    }

    /// Shorthand for [`SchemaObject::get`] on object nodes.
    pub fn keyword(&self, name: &str) -> Option<&Keyword> {
        self.as_object().and_then(|obj| obj.get(name))
    }
}

impl SchemaObject {
    /// An object schema with no keywords (equivalent to `true`).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Keyword> {
        self.keywords.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.keywords.contains_key(name)
    }

    /// The keyword's value if it is a JSON string.
    pub fn str_keyword(&self, name: &str) -> Option<&str> {
        match self.keywords.get(name) {
            Some(Keyword::Value(Value::String(s))) => Some(s),
            _ => None,
        }
    }

    /// `$id`
    pub fn id(&self) -> Option<&str> {
        self.str_keyword(keywords::ID)
    }

    /// `$anchor`
    pub fn anchor(&self) -> Option<&str> {
        self.str_keyword(keywords::ANCHOR)
    }

    /// `$dynamicAnchor`
    pub fn dynamic_anchor(&self) -> Option<&str> {
        self.str_keyword(keywords::DYNAMIC_ANCHOR)
    }

    /// Whether the node declares `$recursiveAnchor: true`.
    pub fn recursive_anchor(&self) -> bool {
        matches!(
            self.keywords.get(keywords::RECURSIVE_ANCHOR),
            Some(Keyword::Value(Value::Bool(true)))
        )
    }

    /// Classify the node's reference keyword, if any.
    pub fn reference(&self) -> Option<Reference<'_>> {
        if let Some(s) = self.str_keyword(keywords::DYNAMIC_REF) {
            Some(Reference::Dynamic(s))
        } else if let Some(s) = self.str_keyword(keywords::RECURSIVE_REF) {
            Some(Reference::Recursive(s))
        } else {
            self.str_keyword(keywords::REF).map(Reference::Static)
        }
    }

    /// All reference keywords present on this node, in dispatch order.
    pub fn reference_keywords(&self) -> Vec<&'static str> {
        keywords::REFERENCE_KEYWORDS
            .iter()
            .copied()
            .filter(|k| self.str_keyword(k).is_some())
            .collect()
    }

    /// Every subschema one level below this node, including the members of
    /// `definitions`/`$defs`. Data keywords are never descended into.
    pub fn subschemas(&self) -> Vec<Subschema<'_>> {
        let mut out = Vec::new();
        for (name, keyword) in &self.keywords {
            if keywords::shape_of(name) != KeywordShape::Value {
                collect_subschemas(name, keyword, escape_token(name), &mut out);
            }
        }
        out
    }

    /// Iterate keywords in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Keyword)> {
        self.keywords.iter()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Set a keyword, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: Keyword) -> Option<Keyword> {
        self.keywords.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Keyword> {
        self.keywords.remove(name)
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: Keyword) -> Self {
        self.insert(name, value);
        self
    }

    /// Builder form of [`remove`](Self::remove).
    pub fn without(mut self, name: &str) -> Self {
        self.remove(name);
        self
    }

    /// Wrap into a shareable node.
    pub fn into_schema(self) -> Schema {
        Schema::Object(Arc::new(self))
    }

    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .keywords
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        Value::Object(map)
    }
}

impl FromIterator<(String, Keyword)> for SchemaObject {
    fn from_iter<I: IntoIterator<Item = (String, Keyword)>>(iter: I) -> Self {
        Self {
            keywords: iter.into_iter().collect(),
        }
    }
}

impl Keyword {
    /// Convert the JSON value of keyword `name` according to its shape.
    pub fn from_json(name: &str, value: &Value) -> Self {
        match (keywords::shape_of(name), value) {
            (KeywordShape::Single | KeywordShape::Items, Value::Bool(_) | Value::Object(_)) => {
                Self::generic(value)
            }
            (KeywordShape::List | KeywordShape::Items, Value::Array(_)) => Self::generic(value),
            (KeywordShape::Map | KeywordShape::Container, Value::Object(map)) => Self::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::generic(v)))
                    .collect(),
            ),
            _ => Self::Value(value.clone()),
        }
    }

    /// Shape-agnostic conversion: objects and booleans become schemas,
    /// arrays become lists, anything else stays data.
    fn generic(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self::List(items.iter().map(Self::generic).collect()),
            other => match Schema::from_json_node(other) {
                Some(schema) => Self::Schema(schema),
                None => Self::Value(other.clone()),
            },
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Schema(s) => s.to_json(),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::Value(v) => v.clone(),
        }
    }

    pub fn as_schema(&self) -> Option<&Schema> {
        match self {
            Self::Schema(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Keyword]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Keyword>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Schema> for Keyword {
    fn from(schema: Schema) -> Self {
        Self::Schema(schema)
    }
}

impl From<Value> for Keyword {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<bool> for Schema {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<SchemaObject> for Schema {
    fn from(obj: SchemaObject) -> Self {
        obj.into_schema()
    }
}

impl TryFrom<&Value> for Schema {
    type Error = SchemaError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Self::from_json(value)
    }
}

impl TryFrom<Value> for Schema {
    type Error = SchemaError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_json(&value)
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(&value).map_err(D::Error::custom)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

fn collect_subschemas<'a>(
    name: &'a str,
    keyword: &'a Keyword,
    pointer: String,
    out: &mut Vec<Subschema<'a>>,
) {
    match keyword {
        Keyword::Schema(schema) => out.push(Subschema {
            keyword: name,
            pointer,
            schema,
        }),
        Keyword::List(items) => {
            for (i, item) in items.iter().enumerate() {
                collect_subschemas(name, item, format!("{pointer}/{i}"), out);
            }
        }
        Keyword::Map(map) => {
            for (key, item) in map {
                collect_subschemas(name, item, format!("{pointer}/{}", escape_token(key)), out);
            }
        }
        Keyword::Value(_) => {}
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
