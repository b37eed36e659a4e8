//! connection::factory
//!
//! Resolves source names to live connections.

use std::sync::Arc;

use tracing::{debug, info};

use super::registry::SourceRegistry;
use super::Connection;
use crate::connector::{create_source, ConnectorError, SourceCapabilities};
use crate::core::config::{Config, ConfigError};
use crate::core::error::RepositoryError;
use crate::mime::MimeTypeDetectors;

/// Hands out connections to registered sources.
///
/// Cloning shares the registry. Connections are never cached or pooled:
/// every call opens a fresh session.
#[derive(Debug, Clone, Default)]
pub struct ConnectionFactory {
    registry: Arc<SourceRegistry>,
}

impl ConnectionFactory {
    pub fn new(registry: Arc<SourceRegistry>) -> Self {
        Self { registry }
    }

    /// Build a registry holding every configured source.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidValue` for an invalid or duplicate source entry.
    pub fn from_config(config: &Config, detectors: Arc<MimeTypeDetectors>) -> Result<Self, ConfigError> {
        let registry = SourceRegistry::new();
        for entry in config.sources() {
            let source = create_source(entry, &detectors)?;
            registry
                .register(source)
                .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        }
        Ok(Self::new(Arc::new(registry)))
    }

    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    /// Capabilities of a registered source.
    pub fn capabilities(&self, name: &str) -> Option<SourceCapabilities> {
        self.registry.get(name).map(|s| s.capabilities())
    }

    /// Open a connection to the source called `name`.
    ///
    /// Returns `Ok(None)` when no such source is registered, so callers can
    /// look up sources without treating absence as a failure.
    ///
    /// # Errors
    ///
    /// `RepositoryError::Unavailable` when the source exists but cannot open
    /// a session.
    pub fn create_connection(&self, name: &str) -> Result<Option<Connection>, RepositoryError> {
        let Some(source) = self.registry.get(name) else {
            debug!(source = %name.trim(), "no such source");
            return Ok(None);
        };

        let session = source.open_session().map_err(|e| RepositoryError::Unavailable {
            source_name: source.name().to_string(),
            reason: match e {
                ConnectorError::Unavailable(reason) => reason,
                other => other.to_string(),
            },
        })?;

        info!(source = source.name(), kind = source.kind(), "connection opened");
        Ok(Some(Connection::new(
            source.name().to_string(),
            source.capabilities(),
            session,
        )))
    }
}

/// The detector chain described by `config`.
pub fn detectors_from_config(config: &Config) -> Arc<MimeTypeDetectors> {
    Arc::new(MimeTypeDetectors::with_defaults(
        config.default_mime_type().map(str::to_string),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{FailOn, InMemorySource};
    use crate::core::config::{RepofedConfig, SourceConfig};
    use crate::core::error::ErrorKind;

    #[test]
    fn unknown_source_is_none() {
        let factory = ConnectionFactory::default();
        assert!(factory.create_connection("beta").unwrap().is_none());
    }

    #[test]
    fn failing_source_is_unavailable() {
        let registry = Arc::new(SourceRegistry::new());
        registry
            .register(Arc::new(InMemorySource::new("alpha").fail_on(FailOn::OpenSession(
                ConnectorError::Unavailable("maintenance".into()),
            ))))
            .unwrap();
        let factory = ConnectionFactory::new(registry);
        let err = factory.create_connection("alpha").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectorUnavailable);
        assert!(err.to_string().contains("maintenance"));
    }

    #[test]
    fn from_config_registers_sources() {
        let config = Config::from_file(RepofedConfig {
            sources: vec![SourceConfig::new("alpha", "memory"), SourceConfig::new("beta", "memory")],
            ..Default::default()
        });
        let factory = ConnectionFactory::from_config(&config, detectors_from_config(&config)).unwrap();
        assert_eq!(factory.registry().names(), ["alpha", "beta"]);
        assert!(factory.capabilities("alpha").is_some());
        assert!(factory.create_connection("alpha").unwrap().is_some());
    }
}
