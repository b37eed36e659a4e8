//! connection::registry
//!
//! Named source registry owned by the connection factory.
//!
//! # Design
//!
//! Sources are registered explicitly (register → use → unregister) instead
//! of being discovered through global state. The registry is safe to share
//! between threads; lookups take a read lock and hand out `Arc` clones, so
//! a source stays alive for connections opened before it was unregistered.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use tracing::info;

use crate::connector::RepositorySource;

/// Registration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("invalid source name '{0}': use lowercase letters, digits, '_' or '-'")]
    InvalidName(String),

    #[error("source '{0}' is already registered")]
    Duplicate(String),

    #[error("source '{0}' is not registered")]
    NotFound(String),
}

/// Trim and validate a source name.
///
/// ```
/// use repofed::connection::normalize_source_name;
///
/// assert_eq!(normalize_source_name("  docs-2 ").unwrap(), "docs-2");
/// assert!(normalize_source_name("Docs").is_err());
/// assert!(normalize_source_name("").is_err());
/// ```
pub fn normalize_source_name(name: &str) -> Result<String, RegistryError> {
    let trimmed = name.trim();
    let valid = !trimmed.is_empty()
        && trimmed
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-');
    if valid {
        Ok(trimmed.to_string())
    } else {
        Err(RegistryError::InvalidName(trimmed.to_string()))
    }
}

/// Thread-safe map from source name to source.
#[derive(Default)]
pub struct SourceRegistry {
    sources: RwLock<BTreeMap<String, Arc<dyn RepositorySource>>>,
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.names())
            .finish()
    }
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Map operations are single inserts/removes, so a poisoned lock still
    // guards a consistent map.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Arc<dyn RepositorySource>>> {
        self.sources.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Arc<dyn RepositorySource>>> {
        self.sources.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a source under its own name.
    pub fn register(&self, source: Arc<dyn RepositorySource>) -> Result<(), RegistryError> {
        let name = normalize_source_name(source.name())?;
        let mut sources = self.write();
        if sources.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        info!(source = %name, kind = source.kind(), "registered source");
        sources.insert(name, source);
        Ok(())
    }

    /// Remove a source. Open connections to it keep working.
    pub fn unregister(&self, name: &str) -> Result<Arc<dyn RepositorySource>, RegistryError> {
        let name = name.trim();
        let removed = self
            .write()
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        info!(source = %name, "unregistered source");
        Ok(removed)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn RepositorySource>> {
        self.read().get(name.trim()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name.trim())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::InMemorySource;

    fn memory(name: &str) -> Arc<dyn RepositorySource> {
        Arc::new(InMemorySource::new(name))
    }

    #[test]
    fn register_get_unregister() {
        let registry = SourceRegistry::new();
        assert!(registry.is_empty());
        registry.register(memory("beta")).unwrap();
        registry.register(memory("alpha")).unwrap();
        assert_eq!(registry.names(), ["alpha", "beta"]);
        assert!(registry.get(" alpha ").is_some());

        registry.unregister("alpha").unwrap();
        assert!(!registry.contains("alpha"));
        assert_eq!(
            registry.unregister("alpha").unwrap_err(),
            RegistryError::NotFound("alpha".into())
        );
    }

    #[test]
    fn duplicates_rejected() {
        let registry = SourceRegistry::new();
        registry.register(memory("alpha")).unwrap();
        assert_eq!(
            registry.register(memory(" alpha")).unwrap_err(),
            RegistryError::Duplicate("alpha".into())
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn invalid_names_rejected() {
        let registry = SourceRegistry::new();
        for bad in ["", "   ", "Alpha", "al pha", "al/pha"] {
            assert!(
                matches!(registry.register(memory(bad)), Err(RegistryError::InvalidName(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn debug_lists_names() {
        let registry = SourceRegistry::new();
        registry.register(memory("alpha")).unwrap();
        assert!(format!("{registry:?}").contains("alpha"));
    }
}
