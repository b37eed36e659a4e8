//! connector::traits
//!
//! Service provider interface implemented by every connector.
//!
//! # Design
//!
//! A connector contributes two things:
//!
//! - a [`RepositorySource`]: a named, configured, thread-safe entry point that
//!   the connection factory keeps in its registry, and
//! - a [`ConnectorSession`]: the per-connection state that talks to the
//!   backing store. Sessions are `Send` but not `Sync`; a connection owns
//!   exactly one and is used from one thread at a time.
//!
//! Sessions expose storage primitives only. Command dispatch, per-command
//! error recording and transaction bookkeeping live in
//! [`crate::connection::Connection`], so every connector gets the same
//! semantics for free.
//!
//! # Isolation
//!
//! Isolation between concurrently open transactions is connector-defined and
//! advertised through [`SourceCapabilities::isolation`]. Callers must not
//! assume more than the source reports.
//!
//! # Example
//!
//! ```
//! use repofed::connector::{InMemorySource, RepositorySource};
//! use repofed::core::path::Path;
//!
//! let source = InMemorySource::new("alpha");
//! let mut session = source.open_session().unwrap();
//! let root = session.read_node(&Path::root()).unwrap();
//! assert!(root.child_segments().is_empty());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::error::{CommandError, PathNotFound};
use crate::core::node::{PathNode, Property};
use crate::core::path::{Name, Path, PathSegment};
use crate::core::resolve::WalkError;

/// Errors reported by connector sessions and sources.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectorError {
    /// A path did not resolve.
    #[error("{0}")]
    NotFound(PathNotFound),

    /// The operation does not apply to the target node.
    #[error("invalid operation on {path}: {reason}")]
    InvalidOperation { path: Path, reason: String },

    /// Storage I/O failed for one node.
    #[error("I/O failure at {path}: {message}")]
    Io { path: Path, message: String },

    /// The backing store cannot service requests right now.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A commit or rollback could not be completed.
    #[error("transaction failed: {0}")]
    Transaction(String),
}

impl ConnectorError {
    pub fn invalid(path: &Path, reason: impl Into<String>) -> Self {
        ConnectorError::InvalidOperation {
            path: path.clone(),
            reason: reason.into(),
        }
    }

    pub fn io(path: &Path, err: &std::io::Error) -> Self {
        ConnectorError::Io {
            path: path.clone(),
            message: err.to_string(),
        }
    }

    /// Convert a per-node failure into the error recorded on a command.
    ///
    /// Returns `Err(self)` for store-wide failures, which must propagate.
    pub fn into_command_error(self) -> Result<CommandError, ConnectorError> {
        match self {
            ConnectorError::NotFound(details) => Ok(CommandError::NotFound(details)),
            ConnectorError::InvalidOperation { path, reason } => {
                Ok(CommandError::InvalidOperation { path, reason })
            }
            ConnectorError::Io { path, message } => Ok(CommandError::Io { path, message }),
            other => Err(other),
        }
    }
}

impl From<WalkError<ConnectorError>> for ConnectorError {
    fn from(value: WalkError<ConnectorError>) -> Self {
        match value {
            WalkError::NotFound(details) => ConnectorError::NotFound(details),
            WalkError::Step(err) => err,
        }
    }
}

/// Isolation offered between transactions on different connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IsolationLevel {
    /// Writes are visible to everyone as soon as they happen.
    None,
    /// Each transaction reads a snapshot taken when it began; conflicting
    /// commits fail (first committer wins).
    Snapshot,
}

impl IsolationLevel {
    pub fn name(&self) -> &'static str {
        match self {
            IsolationLevel::None => "none",
            IsolationLevel::Snapshot => "snapshot",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(IsolationLevel::None),
            "snapshot" => Some(IsolationLevel::Snapshot),
            _ => None,
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What a source supports. Reported by [`RepositorySource::capabilities`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceCapabilities {
    /// Isolation between transactions on different connections.
    pub isolation: IsolationLevel,
    /// Whether begin/commit/rollback do real work. When false they are no-ops.
    pub transactions: bool,
    /// Whether the source rejects every write.
    pub read_only: bool,
    /// Whether a parent may hold several children with the same name.
    pub same_name_siblings: bool,
    /// Whether children can be explicitly reordered.
    pub reorderable_children: bool,
}

/// A named, configured connector instance.
///
/// Implementations must be thread-safe: the connection factory shares one
/// source across every caller.
pub trait RepositorySource: Send + Sync + fmt::Debug {
    /// The registered source name.
    fn name(&self) -> &str;

    /// Connector kind (e.g. `"memory"`, `"filesystem"`).
    fn kind(&self) -> &'static str;

    fn capabilities(&self) -> SourceCapabilities;

    /// Open a new session against the backing store.
    ///
    /// # Errors
    ///
    /// `ConnectorError::Unavailable` when the store cannot accept connections.
    fn open_session(&self) -> Result<Box<dyn ConnectorSession>, ConnectorError>;
}

/// Per-connection access to a backing store.
///
/// Write primitives are only called by the connection after it has checked
/// read-only flags. Primitives resolve their paths with
/// [`crate::core::resolve::walk`] semantics and report unresolvable paths as
/// `ConnectorError::NotFound`.
pub trait ConnectorSession: Send {
    /// Begin a transaction. No-op for connectors without transactions.
    fn begin(&mut self, read_only: bool) -> Result<(), ConnectorError>;

    /// Commit the current transaction. No-op for connectors without transactions.
    fn commit(&mut self) -> Result<(), ConnectorError>;

    /// Discard the current transaction. No-op for connectors without transactions.
    fn rollback(&mut self) -> Result<(), ConnectorError>;

    /// Snapshot the node at `path`.
    fn read_node(&mut self, path: &Path) -> Result<PathNode, ConnectorError>;

    /// Create a child named `name` under `parent` and return its path.
    fn create_node(
        &mut self,
        parent: &Path,
        name: &Name,
        properties: Vec<Property>,
    ) -> Result<Path, ConnectorError>;

    /// Set (add or replace) properties on the node at `path`.
    fn set_properties(&mut self, path: &Path, properties: Vec<Property>)
        -> Result<(), ConnectorError>;

    /// Remove properties by name. Removing an absent property is not an error.
    fn remove_properties(&mut self, path: &Path, names: &[Name]) -> Result<(), ConnectorError>;

    /// Delete the node at `path` and everything beneath it.
    fn delete_branch(&mut self, path: &Path) -> Result<(), ConnectorError>;

    /// Move the node at `from` under `into`, optionally placing it before the
    /// existing child `before`. Returns the node's new path.
    fn move_branch(
        &mut self,
        from: &Path,
        into: &Path,
        before: Option<&PathSegment>,
    ) -> Result<Path, ConnectorError>;

    /// Release session resources. Called once when the connection closes.
    fn close(&mut self) -> Result<(), ConnectorError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    #[test]
    fn per_node_errors_become_command_errors() {
        let path = Path::parse("/a").unwrap();
        let recorded = ConnectorError::invalid(&path, "leaf").into_command_error();
        assert_eq!(recorded.unwrap().kind(), ErrorKind::InvalidOperation);

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let recorded = ConnectorError::io(&path, &io).into_command_error();
        assert_eq!(recorded.unwrap().kind(), ErrorKind::Io);

        let recorded =
            ConnectorError::NotFound(PathNotFound::at_depth(&path, 0)).into_command_error();
        assert_eq!(recorded.unwrap().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn store_wide_errors_stay_connector_errors() {
        let err = ConnectorError::Unavailable("down".into());
        assert!(err.into_command_error().is_err());
        let err = ConnectorError::Transaction("conflict".into());
        assert!(err.into_command_error().is_err());
    }

    #[test]
    fn isolation_parse() {
        assert_eq!(IsolationLevel::parse("Snapshot"), Some(IsolationLevel::Snapshot));
        assert_eq!(IsolationLevel::parse("none"), Some(IsolationLevel::None));
        assert_eq!(IsolationLevel::parse("serializable"), None);
        assert_eq!(IsolationLevel::Snapshot.to_string(), "snapshot");
    }
}
