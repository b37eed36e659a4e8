//! node commands - Read nodes and list children

use anyhow::{bail, Result};

use super::{run_batch, Context};
use crate::command::{Command, CommandOutput, CommandResult};
use crate::core::path::Path;
use crate::ui::output;

/// Run one read command and return its output, failing if it recorded an
/// error.
fn read_one(ctx: &Context, source: &str, command: Command) -> Result<CommandOutput> {
    let result: CommandResult = run_batch(ctx, source, true, vec![command])?
        .into_results()
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("no result returned"))?;
    match result.into_outcome() {
        Ok(out) => Ok(out),
        Err(err) => bail!("[{}] {}", err.kind().code(), err),
    }
}

/// Print one node with its properties and children.
pub fn get(ctx: &Context, source: &str, path: Path) -> Result<()> {
    match read_one(ctx, source, Command::read_node(path))? {
        CommandOutput::Node(node) => {
            if ctx.json {
                output::json(&node)?;
            } else {
                println!("{}", output::format_node(&node));
            }
            Ok(())
        }
        other => bail!("unexpected output for read_node: {:?}", other),
    }
}

/// Print the paths of a node's children.
pub fn ls(ctx: &Context, source: &str, path: Path) -> Result<()> {
    match read_one(ctx, source, Command::read_children(path.clone()))? {
        CommandOutput::Children(children) => {
            let paths: Vec<String> = children
                .into_iter()
                .map(|seg| path.child(seg).to_string())
                .collect();
            if ctx.json {
                output::json(&paths)?;
            } else {
                for p in &paths {
                    println!("{}", p);
                }
            }
            Ok(())
        }
        other => bail!("unexpected output for read_children: {:?}", other),
    }
}
