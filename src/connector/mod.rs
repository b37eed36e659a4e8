//! connector
//!
//! Backing-store adapters.
//!
//! # Architecture
//!
//! Every connector implements the SPI in `traits`: a thread-safe
//! [`RepositorySource`] that opens per-connection [`ConnectorSession`]s.
//! The rest of the crate talks to stores only through these traits and
//! builds sources with [`create_source`].
//!
//! # Modules
//!
//! - `traits`: SPI, capability flags and connector errors
//! - [`memory`]: in-memory store with snapshot transactions
//! - [`filesystem`]: a local directory tree
//! - `factory`: connector kinds and construction from configuration

mod factory;
pub mod filesystem;
pub mod memory;
mod traits;

pub use factory::{create_source, ConnectorKind};
pub use filesystem::FileSystemSource;
pub use memory::{FailOn, InMemorySource, MemoryOperation};
pub use traits::*;
