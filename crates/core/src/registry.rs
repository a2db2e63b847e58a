//! Namespaced registry keys.
//!
//! Registry keys name sounds, acoustics, effects, blocks and entity kinds
//! (e.g. `mdambient:waterfall/3`, `minecraft:block.fire.ambient`). They are
//! ordered and validated so configuration lookups are stable across runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default namespace used when a key omits an explicit namespace.
pub const DEFAULT_NAMESPACE: &str = "mdambient";

/// Namespace selected by the `@path` shorthand.
pub const MINECRAFT_NAMESPACE: &str = "minecraft";

/// Error returned when parsing an invalid [`RegistryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RegistryKeyError {
    message: String,
}

impl RegistryKeyError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A namespaced key of the form `namespace:path`.
///
/// Ordering is lexical by `(namespace, path)` and is stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegistryKey {
    namespace: String,
    path: String,
}

impl RegistryKey {
    /// Parse a registry key.
    ///
    /// Accepts either:
    /// - `namespace:path`
    /// - `path` (uses [`DEFAULT_NAMESPACE`])
    pub fn parse(input: &str) -> Result<Self, RegistryKeyError> {
        Self::parse_with_default_namespace(input, DEFAULT_NAMESPACE)
    }

    /// Parse a registry key using a caller-provided default namespace.
    pub fn parse_with_default_namespace(
        input: &str,
        default_namespace: &str,
    ) -> Result<Self, RegistryKeyError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(RegistryKeyError::new("RegistryKey cannot be empty"));
        }

        let (namespace, path) = match input.split_once(':') {
            Some((ns, p)) => (ns, p),
            None => (default_namespace, input),
        };

        Self::new(namespace, path)
    }

    /// Resolve a loosely written name the way acoustic and sound definitions do.
    ///
    /// - `@path` selects the [`MINECRAFT_NAMESPACE`]
    /// - `path` selects `default_namespace`
    /// - `namespace:path` is taken as written
    ///
    /// Input is lower-cased before validation.
    pub fn resolve(default_namespace: &str, name: &str) -> Result<Self, RegistryKeyError> {
        let name = name.trim().to_ascii_lowercase();
        if let Some(rest) = name.strip_prefix('@') {
            return Self::new(MINECRAFT_NAMESPACE, rest);
        }
        Self::parse_with_default_namespace(&name, default_namespace)
    }

    /// Build a key from already separated parts.
    pub fn new(namespace: &str, path: &str) -> Result<Self, RegistryKeyError> {
        let namespace = namespace.trim();
        let path = path.trim();

        validate_namespace(namespace)?;
        validate_path(path)?;

        Ok(Self {
            namespace: namespace.to_string(),
            path: path.to_string(),
        })
    }

    /// Key in the [`MINECRAFT_NAMESPACE`] for a path known at compile time.
    ///
    /// Paths are only checked in debug builds.
    pub fn minecraft(path: &'static str) -> Self {
        Self::builtin(MINECRAFT_NAMESPACE, path)
    }

    /// Key in the [`DEFAULT_NAMESPACE`] for a path known at compile time.
    pub fn local(path: &'static str) -> Self {
        Self::builtin(DEFAULT_NAMESPACE, path)
    }

    fn builtin(namespace: &'static str, path: &'static str) -> Self {
        debug_assert!(validate_path(path).is_ok(), "invalid builtin path {path}");
        Self {
            namespace: namespace.to_string(),
            path: path.to_string(),
        }
    }

    /// Registry key namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Registry key path.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl FromStr for RegistryKey {
    type Err = RegistryKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RegistryKey {
    type Error = RegistryKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RegistryKey> for String {
    fn from(key: RegistryKey) -> Self {
        key.to_string()
    }
}

fn validate_namespace(ns: &str) -> Result<(), RegistryKeyError> {
    validate_part("namespace", ns, 64, |c| matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.'))
}

fn validate_path(path: &str) -> Result<(), RegistryKeyError> {
    validate_part("path", path, 128, |c| {
        matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.' | '/')
    })
}

fn validate_part(
    what: &str,
    part: &str,
    max_len: usize,
    allowed: impl Fn(char) -> bool,
) -> Result<(), RegistryKeyError> {
    if part.is_empty() {
        return Err(RegistryKeyError::new(format!("RegistryKey {what} cannot be empty")));
    }
    if part.len() > max_len {
        return Err(RegistryKeyError::new(format!(
            "RegistryKey {what} too long (max {max_len})"
        )));
    }
    if let Some(bad) = part.chars().find(|c| !allowed(*c)) {
        return Err(RegistryKeyError::new(format!(
            "RegistryKey {what} has invalid character {bad:?} in {part:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_namespaced_key() {
        let key = RegistryKey::parse("mdambient:waterfall/3").unwrap();
        assert_eq!(key.namespace(), "mdambient");
        assert_eq!(key.path(), "waterfall/3");
        assert_eq!(key.to_string(), "mdambient:waterfall/3");
    }

    #[test]
    fn parses_with_default_namespace() {
        let key = RegistryKey::parse("breath").unwrap();
        assert_eq!(key.to_string(), "mdambient:breath");
    }

    #[test]
    fn resolve_handles_shorthand_forms() {
        let vanilla = RegistryKey::resolve("mobeffects", "@block.fire.ambient").unwrap();
        assert_eq!(vanilla.to_string(), "minecraft:block.fire.ambient");

        let local = RegistryKey::resolve("mobeffects", "Footstep.Grass").unwrap();
        assert_eq!(local.to_string(), "mobeffects:footstep.grass");

        let full = RegistryKey::resolve("mobeffects", "other:thing").unwrap();
        assert_eq!(full.namespace(), "other");
    }

    #[test]
    fn rejects_empty() {
        assert!(RegistryKey::parse("").is_err());
        assert!(RegistryKey::parse("   ").is_err());
        assert!(RegistryKey::resolve("mdambient", "@").is_err());
    }

    #[test]
    fn rejects_invalid_chars() {
        assert!(RegistryKey::parse("mdm:Stone").is_err());
        assert!(RegistryKey::parse("MDM:stone").is_err());
        assert!(RegistryKey::parse("mdm:stone?").is_err());
        assert!(RegistryKey::parse("mdm:").is_err());
        assert!(RegistryKey::parse(":stone").is_err());
    }

    #[test]
    fn string_conversions_round_trip() {
        let key = RegistryKey::try_from("minecraft:player".to_string()).unwrap();
        assert_eq!(String::from(key), "minecraft:player");
    }
}
