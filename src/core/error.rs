//! core::error
//!
//! Error taxonomy shared by connections, commands and connectors.
//!
//! # Recorded vs Propagated
//!
//! - [`CommandError`] is recorded on a single command's result. It never
//!   aborts the rest of a batch.
//! - [`RepositoryError`] is returned from connection, transaction and factory
//!   calls. It always reaches the immediate caller.
//!
//! Every error maps to an [`ErrorKind`] whose [`code`](ErrorKind::code) is
//! stable, so presentation layers can localize messages without parsing them.

use std::fmt;

use thiserror::Error;

use super::path::Path;

/// Stable error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A path or named source does not exist.
    NotFound,
    /// The operation does not apply to the target node or current state.
    InvalidOperation,
    /// The backing store cannot currently service requests.
    ConnectorUnavailable,
    /// Commit or rollback did not complete cleanly.
    TransactionFailure,
    /// Storage or stream I/O failed.
    Io,
    /// The caller broke the connection/transaction protocol.
    Usage,
}

impl ErrorKind {
    /// Stable identifier for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidOperation => "invalid_operation",
            ErrorKind::ConnectorUnavailable => "connector_unavailable",
            ErrorKind::TransactionFailure => "transaction_failure",
            ErrorKind::Io => "io_failure",
            ErrorKind::Usage => "usage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Details of a failed path resolution.
///
/// `missing` is the shortest sub-path of `requested` that does not exist and
/// `lowest_existing` is its parent, the deepest ancestor that did resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathNotFound {
    pub requested: Path,
    pub missing: Path,
    pub lowest_existing: Path,
}

impl PathNotFound {
    /// Resolution of `requested` failed at segment number `depth` (0-based).
    pub fn at_depth(requested: &Path, depth: usize) -> Self {
        Self {
            requested: requested.clone(),
            missing: requested.prefix(depth + 1),
            lowest_existing: requested.prefix(depth),
        }
    }
}

impl fmt::Display for PathNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.missing == self.requested {
            write!(
                f,
                "path not found: {} (resolved up to {})",
                self.requested, self.lowest_existing
            )
        } else {
            write!(
                f,
                "path not found: {} (missing {}, resolved up to {})",
                self.requested, self.missing, self.lowest_existing
            )
        }
    }
}

/// An error recorded on one command's result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("{0}")]
    NotFound(PathNotFound),

    #[error("invalid operation on {path}: {reason}")]
    InvalidOperation { path: Path, reason: String },

    #[error("I/O failure at {path}: {message}")]
    Io { path: Path, message: String },
}

impl CommandError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommandError::NotFound(_) => ErrorKind::NotFound,
            CommandError::InvalidOperation { .. } => ErrorKind::InvalidOperation,
            CommandError::Io { .. } => ErrorKind::Io,
        }
    }

    /// Resolution details when this is a `NotFound`.
    pub fn not_found(&self) -> Option<&PathNotFound> {
        match self {
            CommandError::NotFound(details) => Some(details),
            _ => None,
        }
    }
}

/// Misuse of the connection/transaction protocol.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("a transaction is already open on this connection")]
    TransactionAlreadyOpen,

    #[error("no transaction is open on this connection")]
    NoOpenTransaction,
}

/// An error propagated to the caller of a connection or factory operation.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("usage error: {0}")]
    Usage(#[from] UsageError),

    #[error("source '{source_name}' is unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },

    #[error("transaction {transaction} on source '{source_name}' failed: {reason}")]
    Transaction {
        source_name: String,
        transaction: u64,
        reason: String,
    },
}

impl RepositoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepositoryError::Usage(_) => ErrorKind::Usage,
            RepositoryError::Unavailable { .. } => ErrorKind::ConnectorUnavailable,
            RepositoryError::Transaction { .. } => ErrorKind::TransactionFailure,
        }
    }
}
