//! # Resolver Configuration
//!
//! Constructor options for [`crate::Resolver`]. Defaults match the
//! documented contract: `maxDepth = 10`, `circularHandling = error`,
//! `enableCache = true`.
//!
//! Options can be built in code, deserialized from a YAML/JSON file, or read
//! from the environment:
//!
//! - `SCHEMAREF_MAX_DEPTH` (default: 10)
//! - `SCHEMAREF_CIRCULAR_HANDLING` (`error` | `ignore` | `lazy`, default: `error`)
//! - `SCHEMAREF_ENABLE_CACHE` (`true` | `false`, default: `true`)

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default ceiling on reference expansions along one resolution path.
pub const DEFAULT_MAX_DEPTH: usize = 10;

const ENV_MAX_DEPTH: &str = "SCHEMAREF_MAX_DEPTH";
const ENV_CIRCULAR_HANDLING: &str = "SCHEMAREF_CIRCULAR_HANDLING";
const ENV_ENABLE_CACHE: &str = "SCHEMAREF_ENABLE_CACHE";

/// What to do when a reference reappears on its own resolution path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CircularHandling {
    /// Fail the whole resolution with `CircularReference`.
    #[default]
    Error,
    /// Keep the cyclic edge unexpanded, with its reference keyword intact.
    Ignore,
    /// Same tree as `Ignore`; the kept edges are meant to be expanded on
    /// demand by downstream consumers.
    Lazy,
}

impl CircularHandling {
    /// Whether cyclic edges survive in the output instead of failing.
    pub fn keeps_edges(self) -> bool {
        !matches!(self, Self::Error)
    }
}

impl fmt::Display for CircularHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Ignore => write!(f, "ignore"),
            Self::Lazy => write!(f, "lazy"),
        }
    }
}

impl FromStr for CircularHandling {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "ignore" => Ok(Self::Ignore),
            "lazy" => Ok(Self::Lazy),
            other => Err(ConfigError::InvalidValue {
                key: "circularHandling".to_string(),
                value: other.to_string(),
                reason: "expected one of: error, ignore, lazy".to_string(),
            }),
        }
    }
}

/// Resolver constructor options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ResolverOptions {
    /// Maximum number of reference hops on one resolution path.
    pub max_depth: usize,
    /// Cycle policy.
    pub circular_handling: CircularHandling,
    /// Whether the per-call reference and node caches are used.
    pub enable_cache: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            circular_handling: CircularHandling::Error,
            enable_cache: true,
        }
    }
}

/// Error loading resolver options.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A setting had a value that could not be parsed.
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        /// Setting or environment variable name.
        key: String,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The options file could not be read.
    #[error("cannot read options file {path}: {source}")]
    Read {
        /// Path to the options file.
        path: String,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The options file is not valid YAML/JSON or has unknown keys.
    #[error("cannot parse options file {path}: {reason}")]
    Parse {
        /// Path to the options file.
        path: String,
        /// Parser message.
        reason: String,
    },
}

impl ResolverOptions {
    /// Load options from `SCHEMAREF_*` environment variables. Unset
    /// variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load options through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();
        if let Some(raw) = lookup(ENV_MAX_DEPTH) {
            options.max_depth = raw.trim().parse::<usize>().map_err(|e| ConfigError::InvalidValue {
                key: ENV_MAX_DEPTH.to_string(),
                value: raw.clone(),
                reason: format!("{e}"),
            })?;
        }
        if let Some(raw) = lookup(ENV_CIRCULAR_HANDLING) {
            options.circular_handling = raw.parse().map_err(|e| match e {
                ConfigError::InvalidValue { value, reason, .. } => ConfigError::InvalidValue {
                    key: ENV_CIRCULAR_HANDLING.to_string(),
                    value,
                    reason,
                },
                other => other,
            })?;
        }
        if let Some(raw) = lookup(ENV_ENABLE_CACHE) {
            options.enable_cache = parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: ENV_ENABLE_CACHE.to_string(),
                value: raw.clone(),
                reason: "expected true/false, 1/0 or yes/no".to_string(),
            })?;
        }
        Ok(options)
    }

    /// Parse options from a YAML (or JSON) document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed input or unknown keys.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            path: "<inline>".to_string(),
            reason: e.to_string(),
        })
    }

    /// Load options from a YAML or JSON file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_match_contract() {
        let options = ResolverOptions::default();
        assert_eq!(options.max_depth, 10);
        assert_eq!(options.circular_handling, CircularHandling::Error);
        assert!(options.enable_cache);
    }

    #[test]
    fn circular_handling_parses_case_insensitively() {
        assert_eq!("IGNORE".parse::<CircularHandling>().unwrap(), CircularHandling::Ignore);
        assert_eq!(" lazy ".parse::<CircularHandling>().unwrap(), CircularHandling::Lazy);
        assert!("sometimes".parse::<CircularHandling>().is_err());
        assert_eq!(CircularHandling::Lazy.to_string(), "lazy");
        assert!(CircularHandling::Ignore.keeps_edges());
        assert!(!CircularHandling::Error.keeps_edges());
    }

    #[test]
    fn lookup_overrides_defaults() {
        let options = ResolverOptions::from_lookup(lookup(&[
            ("SCHEMAREF_MAX_DEPTH", "25"),
            ("SCHEMAREF_CIRCULAR_HANDLING", "ignore"),
            ("SCHEMAREF_ENABLE_CACHE", "no"),
        ]))
        .unwrap();
        assert_eq!(options.max_depth, 25);
        assert_eq!(options.circular_handling, CircularHandling::Ignore);
        assert!(!options.enable_cache);
    }

    #[test]
    fn empty_lookup_keeps_defaults() {
        let options = ResolverOptions::from_lookup(|_| None).unwrap();
        assert_eq!(options, ResolverOptions::default());
    }

    #[test]
    fn malformed_variables_name_the_variable() {
        let err = ResolverOptions::from_lookup(lookup(&[("SCHEMAREF_MAX_DEPTH", "ten")]))
            .unwrap_err();
        assert!(err.to_string().contains("SCHEMAREF_MAX_DEPTH"), "{err}");

        let err = ResolverOptions::from_lookup(lookup(&[("SCHEMAREF_CIRCULAR_HANDLING", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("SCHEMAREF_CIRCULAR_HANDLING"), "{err}");

        let err = ResolverOptions::from_lookup(lookup(&[("SCHEMAREF_ENABLE_CACHE", "perhaps")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn yaml_uses_camel_case_keys_with_defaults() {
        let options = ResolverOptions::from_yaml_str("maxDepth: 3\ncircularHandling: lazy\n").unwrap();
        assert_eq!(options.max_depth, 3);
        assert_eq!(options.circular_handling, CircularHandling::Lazy);
        assert!(options.enable_cache);

        let json = ResolverOptions::from_yaml_str(r#"{"enableCache": false}"#).unwrap();
        assert!(!json.enable_cache);
        assert_eq!(json.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn yaml_rejects_unknown_keys() {
        let err = ResolverOptions::from_yaml_str("max_depth: 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn options_file_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "maxDepth: 42").unwrap();
        let options = ResolverOptions::from_yaml_file(file.path()).unwrap();
        assert_eq!(options.max_depth, 42);

        let err = ResolverOptions::from_yaml_file("/nonexistent/options.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
