//! Name-keyed extension registry owned by one runtime.

use crate::extension::Extension;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

static EXTENSION_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]+(?:[._-][a-z0-9]+)*$").expect("valid extension name regex")
});

/// Extension registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionError {
    InvalidName(String),
    DuplicateName(String),
    NotFound(String),
    Hook { name: String, message: String },
}

impl Display for ExtensionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(value) => write!(f, "extension name is invalid: {value}"),
            Self::DuplicateName(value) => write!(f, "extension already registered: {value}"),
            Self::NotFound(value) => write!(f, "extension not found: {value}"),
            Self::Hook { name, message } => {
                write!(f, "extension `{name}` lifecycle hook failed: {message}")
            }
        }
    }
}

impl Error for ExtensionError {}

/// Mapping from extension name to extension object.
#[derive(Default)]
pub struct ExtensionRegistry {
    entries: BTreeMap<String, Arc<dyn Extension>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts one extension under a validated, unused name.
    pub fn insert(
        &mut self,
        name: &str,
        extension: Arc<dyn Extension>,
    ) -> Result<(), ExtensionError> {
        let name = self.check_insertable(name)?;
        self.entries.insert(name, extension);
        Ok(())
    }

    /// Validates `name` and returns its trimmed form when it is free.
    pub fn check_insertable(&self, name: &str) -> Result<String, ExtensionError> {
        let normalized = name.trim();
        if !is_valid_extension_name(normalized) {
            return Err(ExtensionError::InvalidName(name.to_string()));
        }
        if self.entries.contains_key(normalized) {
            return Err(ExtensionError::DuplicateName(normalized.to_string()));
        }
        Ok(normalized.to_string())
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn Extension>> {
        self.entries.remove(name.trim())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Extension>> {
        self.entries.get(name.trim()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name.trim())
    }

    /// Returns sorted extension names.
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("names", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn is_valid_extension_name(value: &str) -> bool {
    EXTENSION_NAME_RE.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::{ExtensionError, ExtensionRegistry};
    use crate::extension::Extension;
    use std::sync::Arc;

    struct Noop;

    impl Extension for Noop {}

    #[test]
    fn starts_empty() {
        let registry = ExtensionRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.names().is_empty());
    }

    #[test]
    fn inserts_and_looks_up_by_trimmed_name() {
        let mut registry = ExtensionRegistry::new();
        registry
            .insert(" notes.shell ", Arc::new(Noop))
            .expect("insert should succeed");
        assert!(registry.contains("notes.shell"));
        assert!(registry.get("  notes.shell").is_some());
        assert_eq!(registry.names(), vec!["notes.shell".to_string()]);
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut registry = ExtensionRegistry::new();
        registry
            .insert("sync", Arc::new(Noop))
            .expect("first insert should succeed");
        let err = registry
            .insert("sync", Arc::new(Noop))
            .expect_err("duplicate insert must fail");
        assert_eq!(err, ExtensionError::DuplicateName("sync".to_string()));
    }

    #[test]
    fn rejects_invalid_names() {
        let mut registry = ExtensionRegistry::new();
        for name in ["", "Upper", "a..b", "trailing-", "has space"] {
            let err = registry
                .insert(name, Arc::new(Noop))
                .expect_err("invalid name must fail");
            assert!(matches!(err, ExtensionError::InvalidName(_)));
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_returns_entry_once() {
        let mut registry = ExtensionRegistry::new();
        registry
            .insert("web_ui", Arc::new(Noop))
            .expect("insert should succeed");
        assert!(registry.remove("web_ui").is_some());
        assert!(registry.remove("web_ui").is_none());
        assert!(registry.is_empty());
    }
}
