//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag.
//! When `--json` is enabled, output is machine-readable JSON.

use std::fmt::Display;

use serde::Serialize;

use crate::command::{ActsOnPath, CommandOutput, CommandResult};
use crate::core::node::PathNode;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print a value as pretty JSON.
pub fn json<T: Serialize>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Multi-line rendering of a node.
pub fn format_node(node: &PathNode) -> String {
    let mut lines = vec![node.path().to_string()];
    let properties: Vec<String> = node.properties().map(ToString::to_string).collect();
    if !properties.is_empty() {
        lines.push("properties:".to_string());
        lines.push(format_list(&properties, "  "));
    }
    if node.has_children() {
        lines.push("children:".to_string());
        lines.push(format_list(node.child_segments(), "  "));
    }
    lines.join("\n")
}

/// One-line summary of a command result.
pub fn format_result(result: &CommandResult) -> String {
    match result.outcome() {
        Ok(CommandOutput::Created(path)) => format!("created {}", path),
        Ok(CommandOutput::Moved(path)) => format!("moved to {}", path),
        Ok(_) => format!("{} {}", result.command().kind(), result.path()),
        Err(err) => format!("[{}] {}", err.kind().code(), err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::core::error::CommandError;
    use crate::core::node::{names, Property};
    use crate::core::path::{index_siblings, Name, Path};

    #[test]
    fn verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn node_rendering() {
        let node = PathNode::new(
            Path::parse("/docs").unwrap(),
            index_siblings(["a", "a"].map(|n| Name::new(n).unwrap())),
            vec![Property::single(names::primary_type(), names::FOLDER_TYPE)],
        );
        assert_eq!(
            format_node(&node),
            "/docs\nproperties:\n  jcr:primaryType = nt:folder\nchildren:\n  a\n  a[2]"
        );
    }

    #[test]
    fn failure_rendering_uses_code() {
        let result = CommandResult::failure(
            Command::delete_branch(Path::root()),
            CommandError::InvalidOperation {
                path: Path::root(),
                reason: "the root node cannot be deleted".into(),
            },
        );
        assert!(format_result(&result).starts_with("[invalid_operation]"));
    }
}
