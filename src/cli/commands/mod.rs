//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads configuration and opens a connection to the named source
//! 2. Submits commands, inside a transaction when they write
//! 3. Formats and displays the results
//!
//! A handler fails (non-zero exit) when any submitted command recorded an
//! error.

mod completion;
mod detect;
mod edit;
mod node;
mod sources;

pub use completion::completion;
pub use detect::detect;
pub use edit::{mkdir, move_node, remove, set, touch, write};
pub use node::{get, ls};
pub use sources::{add_source, list_sources, remove_source};

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context as _, Result};
use serde_json::json;

use crate::cli::args::{Command, SourceAction};
use crate::command::{ActsOnPath, BatchReport, Command as RepoCommand};
use crate::connection::{detectors_from_config, Connection, ConnectionFactory};
use crate::core::config::Config;
use crate::ui::output::{self, Verbosity};

/// Settings shared by every handler.
#[derive(Debug, Clone)]
pub struct Context {
    pub config_path: Option<PathBuf>,
    pub verbosity: Verbosity,
    pub json: bool,
}

impl Context {
    /// Load configuration, printing any load warnings.
    pub fn load_config(&self) -> Result<Config> {
        let result =
            Config::load(self.config_path.as_deref()).context("Failed to load config")?;
        for warning in &result.warnings {
            output::warn(
                format!("{} ({})", warning.message, warning.path.display()),
                self.verbosity,
            );
        }
        Ok(result.config)
    }

    /// Open a connection to a configured source.
    pub fn connect(&self, source: &str) -> Result<Connection> {
        let config = self.load_config()?;
        let factory = ConnectionFactory::from_config(&config, detectors_from_config(&config))
            .context("Invalid source configuration")?;
        factory
            .create_connection(source)
            .with_context(|| format!("Cannot connect to source '{}'", source))?
            .ok_or_else(|| {
                let names = factory.registry().names();
                if names.is_empty() {
                    anyhow!(
                        "Unknown source '{}'. No sources are configured; add one with 'rfed source add'.",
                        source
                    )
                } else {
                    anyhow!(
                        "Unknown source '{}'. Configured sources: {}",
                        source,
                        names.join(", ")
                    )
                }
            })
    }
}

/// Run `commands` against `source` inside one transaction and report the
/// results.
pub(crate) fn run_batch(
    ctx: &Context,
    source: &str,
    read_only: bool,
    commands: Vec<RepoCommand>,
) -> Result<BatchReport> {
    let mut conn = ctx.connect(source)?;
    let report = conn.in_transaction(read_only, |conn| conn.execute_batch(commands))?;
    conn.close()?;
    Ok(report)
}

/// Print results of a write batch; fail if any command recorded an error.
pub(crate) fn report(ctx: &Context, report: &BatchReport) -> Result<()> {
    if ctx.json {
        let rendered: Vec<_> = report
            .results()
            .iter()
            .map(|r| {
                json!({
                    "command": r.command().kind(),
                    "path": r.path().to_string(),
                    "ok": r.is_ok(),
                    "error": r.error().map(|e| json!({
                        "code": e.kind().code(),
                        "message": e.to_string(),
                    })),
                })
            })
            .collect();
        output::json(&rendered)?;
    } else {
        for result in report.results() {
            if result.is_ok() {
                output::print(output::format_result(result), ctx.verbosity);
            } else {
                output::error(output::format_result(result));
            }
        }
    }

    let failed = report.failures().count();
    if failed > 0 {
        bail!("{} of {} command(s) failed", failed, report.len());
    }
    Ok(())
}

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Sources => sources::list_sources(ctx),
        Command::Source { action } => match action {
            SourceAction::Add {
                name,
                connector,
                root,
                read_only,
                isolation,
            } => sources::add_source(ctx, &name, &connector, root, read_only, isolation),
            SourceAction::Remove { name } => sources::remove_source(ctx, &name),
        },
        Command::Get { source, path } => node::get(ctx, &source, path),
        Command::Ls { source, path } => node::ls(ctx, &source, path),
        Command::Mkdir {
            source,
            parent,
            name,
        } => edit::mkdir(ctx, &source, parent, name),
        Command::Touch {
            source,
            parent,
            name,
        } => edit::touch(ctx, &source, parent, name),
        Command::Set {
            source,
            path,
            assignments,
        } => edit::set(ctx, &source, path, &assignments),
        Command::Write { source, path, file } => edit::write(ctx, &source, path, &file),
        Command::Rm { source, path } => edit::remove(ctx, &source, path),
        Command::Mv {
            source,
            from,
            into,
            before,
        } => edit::move_node(ctx, &source, from, into, before),
        Command::Detect { file } => detect::detect(ctx, &file),
        Command::Completion { shell } => completion::completion(shell),
    }
}
