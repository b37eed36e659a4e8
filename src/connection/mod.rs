//! connection
//!
//! Live connections to named sources, their transactions and command
//! execution.
//!
//! # Lifecycle
//!
//! 1. [`ConnectionFactory::create_connection`] opens a session on a source.
//! 2. The caller executes commands, optionally inside a transaction.
//! 3. [`Connection::close`] (or drop) rolls back any open transaction and
//!    closes the session.
//!
//! # Transactions
//!
//! A connection holds at most one [`RepositoryTransaction`]. Commit and
//! rollback remove it from the connection before asking the connector, so
//! it is closed whatever the connector reports. Calling either with no open
//! transaction is a usage error. Nothing is retried.
//!
//! # Command Errors
//!
//! `NotFound`, `InvalidOperation` and single-node I/O failures are recorded
//! on the command's [`CommandResult`] and the batch carries on. A store that
//! becomes unavailable aborts the batch with
//! [`RepositoryError::Unavailable`].
//!
//! # Threading
//!
//! `Connection` is `Send` but not `Sync`: hand it between threads, but only
//! one thread uses it at a time. The factory and registry are `Send + Sync`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use repofed::command::{ActsOnPath, Command};
//! use repofed::connection::{ConnectionFactory, SourceRegistry};
//! use repofed::connector::InMemorySource;
//! use repofed::core::path::{Name, Path};
//!
//! let registry = Arc::new(SourceRegistry::new());
//! registry.register(Arc::new(InMemorySource::new("alpha"))).unwrap();
//! let factory = ConnectionFactory::new(registry);
//!
//! let mut conn = factory.create_connection("alpha").unwrap().unwrap();
//! let report = conn
//!     .execute_batch(vec![
//!         Command::create_node(Path::root(), Name::new("a").unwrap(), vec![]),
//!         Command::read_node(Path::parse("/a/b").unwrap()),
//!     ])
//!     .unwrap();
//! assert!(report.results()[0].is_ok());
//! assert_eq!(report.results()[1].path(), &Path::parse("/a/b").unwrap());
//! assert!(!report.all_succeeded());
//! conn.close().unwrap();
//! ```

mod factory;
mod registry;

pub use factory::{detectors_from_config, ConnectionFactory};
pub use registry::{normalize_source_name, RegistryError, SourceRegistry};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::command::{ActsOnPath, BatchReport, Command, CommandOutput, CommandResult};
use crate::connector::{ConnectorError, ConnectorSession, SourceCapabilities};
use crate::core::error::{CommandError, RepositoryError, UsageError};
use crate::core::path::Path;

static NEXT_TRANSACTION: AtomicU64 = AtomicU64::new(1);

/// Process-unique transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(u64);

impl TransactionId {
    fn next() -> Self {
        TransactionId(NEXT_TRANSACTION.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx-{}", self.0)
    }
}

/// The open transaction on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryTransaction {
    id: TransactionId,
    read_only: bool,
    started_at: DateTime<Utc>,
}

impl RepositoryTransaction {
    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

/// A live handle to one named source.
pub struct Connection {
    source_name: String,
    capabilities: SourceCapabilities,
    session: Box<dyn ConnectorSession>,
    transaction: Option<RepositoryTransaction>,
    closed: bool,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("source_name", &self.source_name)
            .field("capabilities", &self.capabilities)
            .field("transaction", &self.transaction)
            .finish_non_exhaustive()
    }
}

impl Connection {
    pub(crate) fn new(
        source_name: String,
        capabilities: SourceCapabilities,
        session: Box<dyn ConnectorSession>,
    ) -> Self {
        Self {
            source_name,
            capabilities,
            session,
            transaction: None,
            closed: false,
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn capabilities(&self) -> SourceCapabilities {
        self.capabilities
    }

    /// The open transaction, if any.
    pub fn transaction(&self) -> Option<&RepositoryTransaction> {
        self.transaction.as_ref()
    }

    /// Start a transaction. `read_only` makes write commands fail.
    ///
    /// # Errors
    ///
    /// - `UsageError::TransactionAlreadyOpen` if one is already open
    /// - `RepositoryError::Unavailable` if the connector cannot begin
    pub fn start_transaction(&mut self, read_only: bool) -> Result<TransactionId, RepositoryError> {
        if self.transaction.is_some() {
            return Err(UsageError::TransactionAlreadyOpen.into());
        }
        self.session
            .begin(read_only)
            .map_err(|e| unavailable(&self.source_name, e))?;
        let transaction = RepositoryTransaction {
            id: TransactionId::next(),
            read_only,
            started_at: Utc::now(),
        };
        debug!(source = %self.source_name, tx = %transaction.id, read_only, "transaction started");
        let id = transaction.id;
        self.transaction = Some(transaction);
        Ok(id)
    }

    /// Commit and close the open transaction.
    ///
    /// # Errors
    ///
    /// - `UsageError::NoOpenTransaction` if none is open
    /// - `RepositoryError::Transaction` if the connector fails; the
    ///   transaction is closed anyway
    pub fn commit(&mut self) -> Result<(), RepositoryError> {
        let transaction = self.transaction.take().ok_or(UsageError::NoOpenTransaction)?;
        debug!(source = %self.source_name, tx = %transaction.id, "committing");
        self.session
            .commit()
            .map_err(|e| transaction_failed(&self.source_name, transaction.id, e))
    }

    /// Roll back and close the open transaction.
    ///
    /// # Errors
    ///
    /// As for [`Connection::commit`].
    pub fn rollback(&mut self) -> Result<(), RepositoryError> {
        let transaction = self.transaction.take().ok_or(UsageError::NoOpenTransaction)?;
        debug!(source = %self.source_name, tx = %transaction.id, "rolling back");
        self.session
            .rollback()
            .map_err(|e| transaction_failed(&self.source_name, transaction.id, e))
    }

    /// Run `f` inside a transaction: commit when it returns `Ok`, roll back
    /// when it returns `Err`.
    ///
    /// A rollback failure after `f` fails is logged and the error from `f`
    /// is returned.
    pub fn in_transaction<T, E, F>(&mut self, read_only: bool, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Connection) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        self.start_transaction(read_only)?;
        match f(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(err) => {
                if self.transaction.is_some() {
                    if let Err(rollback) = self.rollback() {
                        warn!(source = %self.source_name, error = %rollback, "rollback after failure did not complete");
                    }
                }
                Err(err)
            }
        }
    }

    /// Execute one command.
    ///
    /// # Errors
    ///
    /// `RepositoryError::Unavailable` when the store cannot service the
    /// request. Per-node failures are recorded on the result instead.
    pub fn execute(&mut self, command: Command) -> Result<CommandResult, RepositoryError> {
        debug!(
            source = %self.source_name,
            command = command.kind(),
            path = %command.path(),
            "executing"
        );
        if let Some(reason) = self.write_denied(&command) {
            let error = CommandError::InvalidOperation {
                path: command.path().clone(),
                reason: reason.to_string(),
            };
            return Ok(CommandResult::failure(command, error));
        }

        match self.dispatch(&command) {
            Ok((path, output)) => Ok(CommandResult::success(command, path, output)),
            Err(err) => match err.into_command_error() {
                Ok(recorded) => {
                    debug!(command = command.kind(), error = %recorded, "command failed");
                    Ok(CommandResult::failure(command, recorded))
                }
                Err(fatal) => Err(self.store_error(fatal)),
            },
        }
    }

    /// Execute commands in order. Later commands see earlier writes.
    ///
    /// # Errors
    ///
    /// Stops at the first store-wide failure; see [`Connection::execute`].
    pub fn execute_batch(
        &mut self,
        commands: impl IntoIterator<Item = Command>,
    ) -> Result<BatchReport, RepositoryError> {
        let results = commands
            .into_iter()
            .map(|command| self.execute(command))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BatchReport::new(results))
    }

    /// Roll back any open transaction and close the session.
    ///
    /// # Errors
    ///
    /// Reports the first failure; the session is closed regardless.
    pub fn close(mut self) -> Result<(), RepositoryError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), RepositoryError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let rolled_back = match self.transaction.take() {
            Some(transaction) => {
                warn!(source = %self.source_name, tx = %transaction.id, "rolling back uncommitted transaction on close");
                self.session
                    .rollback()
                    .map_err(|e| transaction_failed(&self.source_name, transaction.id, e))
            }
            None => Ok(()),
        };
        let closed = self
            .session
            .close()
            .map_err(|e| unavailable(&self.source_name, e));
        debug!(source = %self.source_name, "connection closed");
        rolled_back.and(closed)
    }

    fn write_denied(&self, command: &Command) -> Option<&'static str> {
        if !command.is_write() {
            return None;
        }
        if self.capabilities.read_only {
            return Some("source is read-only");
        }
        match &self.transaction {
            Some(tx) if tx.read_only => Some("transaction is read-only"),
            _ => None,
        }
    }

    fn dispatch(&mut self, command: &Command) -> Result<(Path, CommandOutput), ConnectorError> {
        let session = &mut self.session;
        match command {
            Command::ReadNode { path } => {
                let node = session.read_node(path)?;
                Ok((path.clone(), CommandOutput::Node(node)))
            }
            Command::ReadChildren { path } => {
                let node = session.read_node(path)?;
                Ok((path.clone(), CommandOutput::Children(node.child_segments().to_vec())))
            }
            Command::ReadProperty { path, name } => {
                let node = session.read_node(path)?;
                Ok((path.clone(), CommandOutput::Property(node.property(name).cloned())))
            }
            Command::CreateNode {
                parent,
                name,
                properties,
            } => {
                let created = session.create_node(parent, name, properties.clone())?;
                Ok((created.clone(), CommandOutput::Created(created)))
            }
            Command::SetProperties { path, properties } => {
                session.set_properties(path, properties.clone())?;
                Ok((path.clone(), CommandOutput::Done))
            }
            Command::RemoveProperties { path, names } => {
                session.remove_properties(path, names)?;
                Ok((path.clone(), CommandOutput::Done))
            }
            Command::DeleteBranch { path } => {
                if path.is_root() {
                    return Err(ConnectorError::invalid(path, "the root node cannot be deleted"));
                }
                session.delete_branch(path)?;
                Ok((path.clone(), CommandOutput::Done))
            }
            Command::MoveBranch { from, into, before } => {
                if from.is_root() {
                    return Err(ConnectorError::invalid(from, "the root node cannot be moved"));
                }
                if before.is_some() && !self.capabilities.reorderable_children {
                    return Err(ConnectorError::invalid(
                        into,
                        format!("source '{}' does not support reordering children", self.source_name),
                    ));
                }
                let moved = session.move_branch(from, into, before.as_ref())?;
                Ok((moved.clone(), CommandOutput::Moved(moved)))
            }
        }
    }

    fn store_error(&self, err: ConnectorError) -> RepositoryError {
        match (err, &self.transaction) {
            (ConnectorError::Transaction(reason), Some(tx)) => RepositoryError::Transaction {
                source_name: self.source_name.clone(),
                transaction: tx.id.get(),
                reason,
            },
            (other, _) => unavailable(&self.source_name, other),
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            warn!(source = %self.source_name, error = %err, "implicit close failed");
        }
    }
}

fn unavailable(source_name: &str, err: ConnectorError) -> RepositoryError {
    RepositoryError::Unavailable {
        source_name: source_name.to_string(),
        reason: match err {
            ConnectorError::Unavailable(reason) => reason,
            other => other.to_string(),
        },
    }
}

fn transaction_failed(source_name: &str, id: TransactionId, err: ConnectorError) -> RepositoryError {
    RepositoryError::Transaction {
        source_name: source_name.to_string(),
        transaction: id.get(),
        reason: err.to_string(),
    }
}
