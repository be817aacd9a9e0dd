//! Best-effort URI joining.
//!
//! Base URIs come from `$id` values, which in real-world schemas are often
//! not URIs at all (`"user"`, `"my-schema.json"`). Joining therefore never
//! fails: whenever `url` cannot parse the base or the join, the literal
//! reference string is used as-is.

use url::Url;

/// Resolve `reference` against `base`.
///
/// - With a parseable base, returns the RFC 3986 join.
/// - Without a base, returns `reference` normalised if it is an absolute
///   URI, or verbatim otherwise.
/// - On any parse failure, returns `reference` verbatim.
pub fn join(base: Option<&str>, reference: &str) -> String {
    let joined = match base {
        Some(base) => Url::parse(base).and_then(|b| b.join(reference)),
        None => Url::parse(reference),
    };
    match joined {
        Ok(url) => url.to_string(),
        Err(_) => reference.to_string(),
    }
}

/// Drop an empty trailing fragment: `https://x/a.json#` → `https://x/a.json`.
pub fn strip_empty_fragment(uri: &str) -> &str {
    uri.strip_suffix('#').unwrap_or(uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_relative_paths() {
        assert_eq!(
            join(Some("https://example.com/schemas/root.json"), "child.json"),
            "https://example.com/schemas/child.json"
        );
        assert_eq!(
            join(Some("https://example.com/schemas/root.json"), "../other/x.json"),
            "https://example.com/other/x.json"
        );
    }

    #[test]
    fn absolute_reference_wins() {
        assert_eq!(
            join(Some("https://example.com/a.json"), "urn:example:b"),
            "urn:example:b"
        );
    }

    #[test]
    fn falls_back_to_literal() {
        assert_eq!(join(None, "user"), "user");
        assert_eq!(join(Some("not a base"), "child.json"), "child.json");
        assert_eq!(join(Some("urn:example:root"), "child.json"), "child.json");
    }

    #[test]
    fn strips_only_empty_fragments() {
        assert_eq!(strip_empty_fragment("https://x/a.json#"), "https://x/a.json");
        assert_eq!(strip_empty_fragment("https://x/a.json#/defs"), "https://x/a.json#/defs");
    }
}
