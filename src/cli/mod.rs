//! cli
//!
//! Command-line interface layer for rfed.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Initialise logging
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. Handlers load configuration, open a connection
//! through [`crate::connection::ConnectionFactory`] and submit commands;
//! every store access goes through a connection.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::core::config::Config;
use crate::ui::output::Verbosity;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    // An unreadable config must not stop logging; handlers report it.
    let config_level = Config::load(cli.config.as_deref())
        .ok()
        .and_then(|r| r.config.log_level().map(str::to_string));
    init_tracing(cli.debug, config_level.as_deref());

    let ctx = commands::Context {
        config_path: cli.config.clone(),
        verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
        json: cli.json,
    };

    commands::dispatch(cli.command, &ctx)
}

/// Install the global subscriber. `RUST_LOG` wins, then `--debug`, then the
/// configured level, then `warn`.
pub fn init_tracing(debug: bool, config_level: Option<&str>) {
    let fallback = if debug {
        "debug"
    } else {
        config_level.unwrap_or("warn")
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
