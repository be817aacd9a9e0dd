//! Keyword tables: which JSON Schema keywords carry subschemas, and in
//! what shape. AST conversion and traversal both consult these lists.

pub const ID: &str = "$id";
pub const ANCHOR: &str = "$anchor";
pub const REF: &str = "$ref";
pub const RECURSIVE_REF: &str = "$recursiveRef";
pub const RECURSIVE_ANCHOR: &str = "$recursiveAnchor";
pub const DYNAMIC_REF: &str = "$dynamicRef";
pub const DYNAMIC_ANCHOR: &str = "$dynamicAnchor";
pub const ITEMS: &str = "items";

/// Keywords whose value is a single subschema.
pub const SINGLE_KEYWORDS: &[&str] = &[
    "additionalProperties",
    "additionalItems",
    "unevaluatedProperties",
    "unevaluatedItems",
    "propertyNames",
    "contains",
    "contentSchema",
    "not",
    "if",
    "then",
    "else",
];

/// Keywords whose value is an array of subschemas.
pub const LIST_KEYWORDS: &[&str] = &["allOf", "anyOf", "oneOf", "prefixItems"];

/// Keywords whose value maps names to subschemas. Draft-07 `dependencies`
/// also allows arrays of property names as values; those stay data.
pub const MAP_KEYWORDS: &[&str] = &[
    "properties",
    "patternProperties",
    "dependentSchemas",
    "dependencies",
];

/// Keywords holding reusable definitions. These are copied verbatim during
/// resolution and only expanded when something references into them.
pub const CONTAINER_KEYWORDS: &[&str] = &["definitions", "$defs"];

/// Reference keywords in dispatch order.
pub const REFERENCE_KEYWORDS: &[&str] = &[DYNAMIC_REF, RECURSIVE_REF, REF];

/// How the value of a keyword is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordShape {
    /// A single subschema.
    Single,
    /// An array of subschemas.
    List,
    /// `items`: a single subschema, or an array of them (tuple form).
    Items,
    /// A map of named subschemas.
    Map,
    /// A map of definitions, resolved lazily.
    Container,
    /// Plain data (`type`, `enum`, `$ref`, ...).
    Value,
}

impl KeywordShape {
    /// Whether the resolver descends into values of this shape.
    pub fn is_applicator(self) -> bool {
        matches!(self, Self::Single | Self::List | Self::Items | Self::Map)
    }
}

/// Classify a keyword by name.
pub fn shape_of(keyword: &str) -> KeywordShape {
    if keyword == ITEMS {
        KeywordShape::Items
    } else if SINGLE_KEYWORDS.contains(&keyword) {
        KeywordShape::Single
    } else if LIST_KEYWORDS.contains(&keyword) {
        KeywordShape::List
    } else if MAP_KEYWORDS.contains(&keyword) {
        KeywordShape::Map
    } else if CONTAINER_KEYWORDS.contains(&keyword) {
        KeywordShape::Container
    } else {
        KeywordShape::Value
    }
}
