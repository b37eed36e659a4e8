//! sources commands - List, add and remove configured sources

use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use serde_json::json;

use super::Context;
use crate::core::config::SourceConfig;
use crate::ui::output;

/// List configured sources.
pub fn list_sources(ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?;

    if ctx.json {
        let rendered = config
            .sources()
            .iter()
            .map(|s| -> Result<serde_json::Value> {
                Ok(json!({
                    "name": s.name,
                    "connector": s.connector,
                    "isolation": s.isolation_level()?.name(),
                    "read_only": s.read_only,
                    "root": s.root,
                }))
            })
            .collect::<Result<Vec<_>>>()?;
        output::json(&rendered)?;
        return Ok(());
    }

    if config.sources().is_empty() {
        output::print("No sources configured.", ctx.verbosity);
        return Ok(());
    }
    for source in config.sources() {
        let mut line = format!(
            "{}\t{}\t{}",
            source.name,
            source.connector,
            source.isolation_level()?
        );
        if source.read_only {
            line.push_str("\tread-only");
        }
        if let Some(root) = &source.root {
            line.push_str(&format!("\t{}", root.display()));
        }
        println!("{}", line);
    }
    Ok(())
}

/// Add a source and save the config file.
pub fn add_source(
    ctx: &Context,
    name: &str,
    connector: &str,
    root: Option<PathBuf>,
    read_only: bool,
    isolation: Option<String>,
) -> Result<()> {
    let mut config = ctx.load_config()?;
    if config.file.source(name).is_some() {
        bail!("Source '{}' already exists", name.trim());
    }

    let root = match root {
        Some(root) => Some(
            std::path::absolute(&root)
                .with_context(|| format!("Invalid root '{}'", root.display()))?,
        ),
        None => None,
    };
    config.file.sources.push(SourceConfig {
        root,
        read_only,
        isolation,
        ..SourceConfig::new(name.trim(), connector)
    });

    let path = config.save().context("Failed to write config")?;
    output::print(
        format!("Added source '{}' to {}", name.trim(), path.display()),
        ctx.verbosity,
    );
    Ok(())
}

/// Remove a source and save the config file.
pub fn remove_source(ctx: &Context, name: &str) -> Result<()> {
    let mut config = ctx.load_config()?;
    let before = config.file.sources.len();
    config.file.sources.retain(|s| s.name.trim() != name.trim());
    if config.file.sources.len() == before {
        bail!("Unknown source '{}'", name.trim());
    }

    let path = config.save().context("Failed to write config")?;
    output::print(
        format!("Removed source '{}' from {}", name.trim(), path.display()),
        ctx.verbosity,
    );
    Ok(())
}
