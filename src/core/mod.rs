//! core
//!
//! Domain types shared by every layer.
//!
//! # Modules
//!
//! - [`path`] - Names, path segments and absolute paths
//! - [`node`] - Nodes and typed property values
//! - [`error`] - Error taxonomy for commands and connections
//! - [`resolve`] - Walking a path through a store, one segment at a time
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Names and paths are validated at construction
//! - Schemas are strict and self-describing

pub mod config;
pub mod error;
pub mod node;
pub mod path;
pub mod resolve;
