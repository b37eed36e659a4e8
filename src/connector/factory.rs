//! connector::factory
//!
//! Connector selection and construction.
//!
//! # Design
//!
//! Callers build sources through [`create_source`] rather than naming
//! connector types directly, so the configuration layer and the CLI stay
//! independent of individual connectors.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use repofed::connector::{create_source, ConnectorKind, RepositorySource};
//! use repofed::core::config::SourceConfig;
//! use repofed::mime::MimeTypeDetectors;
//!
//! let detectors = Arc::new(MimeTypeDetectors::new());
//! let source = create_source(&SourceConfig::new("alpha", "memory"), &detectors).unwrap();
//! assert_eq!(source.name(), "alpha");
//! assert_eq!(source.kind(), ConnectorKind::Memory.name());
//! ```

use std::sync::Arc;

use super::filesystem::FileSystemSource;
use super::memory::InMemorySource;
use super::traits::{IsolationLevel, RepositorySource};
use crate::core::config::{ConfigError, SourceConfig};
use crate::mime::MimeTypeDetectors;

/// Supported connector kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorKind {
    /// Process-local tree with snapshot transactions
    Memory,
    /// A directory on the local file system
    Filesystem,
}

impl ConnectorKind {
    pub fn all() -> &'static [ConnectorKind] {
        &[ConnectorKind::Memory, ConnectorKind::Filesystem]
    }

    /// The name used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            ConnectorKind::Memory => "memory",
            ConnectorKind::Filesystem => "filesystem",
        }
    }

    /// Parse a kind, case-insensitively.
    ///
    /// ```
    /// use repofed::connector::ConnectorKind;
    ///
    /// assert_eq!(ConnectorKind::parse("FileSystem"), Some(ConnectorKind::Filesystem));
    /// assert_eq!(ConnectorKind::parse("webdav"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Some(ConnectorKind::Memory),
            "filesystem" => Some(ConnectorKind::Filesystem),
            _ => None,
        }
    }

    /// Whether sources of this kind need a `root` directory.
    pub fn needs_root(&self) -> bool {
        matches!(self, ConnectorKind::Filesystem)
    }

    pub fn default_isolation(&self) -> IsolationLevel {
        match self {
            ConnectorKind::Memory => IsolationLevel::Snapshot,
            ConnectorKind::Filesystem => IsolationLevel::None,
        }
    }

    /// Isolation levels a source of this kind can run with.
    pub fn supported_isolation(&self) -> &'static [IsolationLevel] {
        match self {
            ConnectorKind::Memory => &[IsolationLevel::Snapshot],
            ConnectorKind::Filesystem => &[IsolationLevel::None],
        }
    }
}

impl std::fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Build a source from its configuration.
///
/// The source name is trimmed; name validity and uniqueness are checked by
/// the registry the source is registered with.
///
/// # Errors
///
/// `ConfigError::InvalidValue` when the entry fails validation.
pub fn create_source(
    config: &SourceConfig,
    detectors: &Arc<MimeTypeDetectors>,
) -> Result<Arc<dyn RepositorySource>, ConfigError> {
    config.validate()?;
    let name = config.name.trim();
    match config.kind()? {
        ConnectorKind::Memory => Ok(Arc::new(
            InMemorySource::new(name).read_only(config.read_only),
        )),
        ConnectorKind::Filesystem => {
            let root = config.root.clone().ok_or_else(|| {
                ConfigError::InvalidValue(format!("source '{}' requires 'root'", name))
            })?;
            Ok(Arc::new(
                FileSystemSource::new(name, root, Arc::clone(detectors)).read_only(config.read_only),
            ))
        }
    }
}
