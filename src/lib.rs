//! Repofed - federated access to hierarchical content stores
//!
//! Repofed exposes memory-backed and filesystem-backed stores as trees of
//! nodes addressed by paths, behind one connection and transaction model.
//! Clients submit commands through a connection and get one result per
//! command, with per-node failures recorded rather than raised.
//!
//! # Architecture
//!
//! - [`core`] - Paths, nodes, error types, configuration
//! - [`command`] - Commands, results and batch reports
//! - [`connection`] - Connections, transactions, source registry and factory
//! - [`connector`] - The connector SPI and the memory and filesystem connectors
//! - [`mime`] - MIME type detection chain
//! - [`cli`] - Command-line interface (`rfed`)
//! - [`ui`] - Output formatting
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use repofed::command::Command;
//! use repofed::connection::{ConnectionFactory, SourceRegistry};
//! use repofed::connector::InMemorySource;
//! use repofed::core::path::Path;
//!
//! let registry = Arc::new(SourceRegistry::default());
//! registry.register(Arc::new(InMemorySource::new("alpha"))).unwrap();
//! let factory = ConnectionFactory::new(registry);
//!
//! let mut conn = factory.create_connection("alpha").unwrap().unwrap();
//! let result = conn.execute(Command::read_node(Path::root())).unwrap();
//! assert!(result.is_ok());
//! conn.close().unwrap();
//! ```

pub mod cli;
pub mod command;
pub mod connection;
pub mod connector;
pub mod core;
pub mod mime;
pub mod ui;
