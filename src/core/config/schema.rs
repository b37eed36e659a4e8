//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Location
//!
//! Searched in order of precedence:
//! 1. `--config <path>` on the command line
//! 2. `$REPOFED_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/repofed/config.toml`
//! 4. `~/.repofed/config.toml` (canonical write location)
//!
//! # Validation
//!
//! Values are validated after parsing: source names must be valid and
//! unique, connector kinds known, `root` present exactly when the connector
//! needs one, isolation levels supported by the connector and log levels
//! recognized.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::connection::normalize_source_name;
use crate::connector::{ConnectorKind, IsolationLevel};

/// Top-level configuration file.
///
/// # Example
///
/// ```toml
/// [logging]
/// level = "info"
///
/// [mime]
/// default_type = "application/octet-stream"
///
/// [[source]]
/// name = "alpha"
/// connector = "memory"
///
/// [[source]]
/// name = "docs"
/// connector = "filesystem"
/// root = "/srv/docs"
/// read_only = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepofedConfig {
    /// Logging defaults
    pub logging: Option<LoggingConfig>,

    /// MIME detection settings
    pub mime: Option<MimeConfig>,

    /// Configured sources, in declaration order
    #[serde(rename = "source")]
    pub sources: Vec<SourceConfig>,
}

impl RepofedConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(logging) = &self.logging {
            logging.validate()?;
        }
        if let Some(mime) = &self.mime {
            mime.validate()?;
        }

        let mut seen = BTreeSet::new();
        for source in &self.sources {
            source.validate()?;
            let name = normalize_source_name(&source.name)
                .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
            if !seen.insert(name.clone()) {
                return Err(ConfigError::InvalidValue(format!(
                    "source '{}' is defined more than once",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Find a source by name.
    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        let name = name.trim();
        self.sources.iter().find(|s| s.name.trim() == name)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset ("error" .. "trace")
    pub level: Option<String>,
}

impl LoggingConfig {
    /// Recognized log levels.
    pub const VALID_LEVELS: &'static [&'static str] =
        &["error", "warn", "info", "debug", "trace", "off"];

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(level) = &self.level {
            if !Self::VALID_LEVELS.contains(&level.to_lowercase().as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid log level '{}', must be one of: {}",
                    level,
                    Self::VALID_LEVELS.join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// MIME detection configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MimeConfig {
    /// Type reported when no detector recognizes the content
    pub default_type: Option<String>,
}

impl MimeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(default_type) = &self.default_type {
            let valid = default_type
                .split_once('/')
                .map(|(kind, sub)| !kind.trim().is_empty() && !sub.trim().is_empty())
                .unwrap_or(false);
            if !valid {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid default MIME type '{}', expected 'type/subtype'",
                    default_type
                )));
            }
        }
        Ok(())
    }
}

/// One configured source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Registered source name
    pub name: String,

    /// Connector kind ("memory" or "filesystem")
    pub connector: String,

    /// Directory exposed by filesystem sources
    pub root: Option<PathBuf>,

    /// Reject every write
    #[serde(default)]
    pub read_only: bool,

    /// Requested isolation level; defaults to the connector's
    pub isolation: Option<String>,
}

impl SourceConfig {
    /// A source entry with no root, read-write, default isolation.
    pub fn new(name: impl Into<String>, connector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connector: connector.into(),
            root: None,
            read_only: false,
            isolation: None,
        }
    }

    /// The parsed connector kind.
    pub fn kind(&self) -> Result<ConnectorKind, ConfigError> {
        ConnectorKind::parse(&self.connector).ok_or_else(|| {
            ConfigError::InvalidValue(format!(
                "source '{}': unknown connector '{}', must be one of: {}",
                self.name,
                self.connector,
                ConnectorKind::all()
                    .iter()
                    .map(ConnectorKind::name)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
    }

    /// The isolation level the source will run with.
    pub fn isolation_level(&self) -> Result<IsolationLevel, ConfigError> {
        let kind = self.kind()?;
        match &self.isolation {
            None => Ok(kind.default_isolation()),
            Some(requested) => IsolationLevel::parse(requested)
                .filter(|level| kind.supported_isolation().contains(level))
                .ok_or_else(|| {
                    ConfigError::InvalidValue(format!(
                        "source '{}': connector '{}' does not support isolation '{}'",
                        self.name, kind, requested
                    ))
                }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let kind = self.kind()?;
        match (kind.needs_root(), &self.root) {
            (true, None) => {
                return Err(ConfigError::InvalidValue(format!(
                    "source '{}': connector '{}' requires 'root'",
                    self.name, kind
                )))
            }
            (false, Some(_)) => {
                return Err(ConfigError::InvalidValue(format!(
                    "source '{}': connector '{}' does not take 'root'",
                    self.name, kind
                )))
            }
            _ => {}
        }
        self.isolation_level()?;
        Ok(())
    }
}
