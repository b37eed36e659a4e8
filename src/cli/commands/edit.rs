//! edit commands - Create, update, delete and move nodes
//!
//! Each handler submits its commands in one write transaction and fails if
//! any command recorded an error.

use std::path::Path as FsPath;

use anyhow::{anyhow, Context as _, Result};

use super::{report, run_batch, Context};
use crate::command::{BatchReport, Command};
use crate::core::node::{names, Property};
use crate::core::path::{Name, Path, PathSegment};

fn submit(ctx: &Context, source: &str, commands: Vec<Command>) -> Result<()> {
    let batch = run_batch(ctx, source, false, commands)?;
    report(ctx, &batch)
}

fn create(ctx: &Context, source: &str, parent: Path, name: Name, primary: &str) -> Result<()> {
    let properties = vec![Property::single(names::primary_type(), primary)];
    submit(ctx, source, vec![Command::create_node(parent, name, properties)])
}

/// Create a folder.
pub fn mkdir(ctx: &Context, source: &str, parent: Path, name: Name) -> Result<()> {
    create(ctx, source, parent, name, names::FOLDER_TYPE)
}

/// Create an empty file.
pub fn touch(ctx: &Context, source: &str, parent: Path, name: Name) -> Result<()> {
    create(ctx, source, parent, name, names::FILE_TYPE)
}

/// Parse `NAME=VALUE` into a string property.
fn parse_assignment(assignment: &str) -> Result<Property> {
    let (name, value) = assignment
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected NAME=VALUE, got '{}'", assignment))?;
    let name = Name::new(name.trim()).with_context(|| format!("Invalid property name in '{}'", assignment))?;
    Ok(Property::single(name, value))
}

/// Set string properties.
pub fn set(ctx: &Context, source: &str, path: Path, assignments: &[String]) -> Result<()> {
    let properties = assignments
        .iter()
        .map(|a| parse_assignment(a))
        .collect::<Result<Vec<_>>>()?;
    submit(ctx, source, vec![Command::set_properties(path, properties)])
}

/// Replace binary data. A file node's data lives on its `jcr:content` child.
pub fn write(ctx: &Context, source: &str, path: Path, file: &FsPath) -> Result<()> {
    let data = std::fs::read(file).with_context(|| format!("Failed to read '{}'", file.display()))?;

    let mut conn = ctx.connect(source)?;
    let batch = conn.in_transaction(false, |conn| -> Result<BatchReport> {
        let read = conn.execute(Command::read_node(path.clone()))?;
        let target = match read.node() {
            Some(node) if node.unique_child_names().contains(&names::content()) => {
                path.child_named(names::content())
            }
            Some(_) => path.clone(),
            None => return Ok(BatchReport::new(vec![read])),
        };
        let set = conn.execute(Command::set_properties(
            target,
            vec![Property::single(names::data(), data)],
        ))?;
        Ok(BatchReport::new(vec![set]))
    })?;
    conn.close()?;
    report(ctx, &batch)
}

/// Delete a node and its descendants.
pub fn remove(ctx: &Context, source: &str, path: Path) -> Result<()> {
    submit(ctx, source, vec![Command::delete_branch(path)])
}

/// Move a node under a new parent, optionally before an existing child.
pub fn move_node(ctx: &Context, source: &str, from: Path, into: Path, before: Option<PathSegment>) -> Result<()> {
    submit(ctx, source, vec![Command::move_branch(from, into, before)])
}
