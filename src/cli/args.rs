//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Use this config file
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--json`: Machine-readable output

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::core::path::{Name, Path as NodePath, PathSegment};

/// rfed - Browse and edit federated hierarchical stores
#[derive(Parser, Debug)]
#[command(name = "rfed")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Read configuration from this file instead of the default locations
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List configured sources
    #[command(
        name = "sources",
        long_about = "List every source in the configuration file.\n\n\
            Shows each source's name, connector kind, isolation level and \
            whether it is read-only.",
        after_help = "\
WORKFLOW EXAMPLES:
    # What can I connect to?
    rfed sources

    # Same, for scripts
    rfed sources --json"
    )]
    Sources,

    /// Add or remove configured sources
    #[command(name = "source")]
    Source {
        #[command(subcommand)]
        action: SourceAction,
    },

    /// Show a node: children and properties
    #[command(
        name = "get",
        after_help = "\
WORKFLOW EXAMPLES:
    # Inspect the root of a source
    rfed get docs /

    # Inspect a file's content node (data, MIME type)
    rfed get docs /reports/q1.pdf/jcr:content"
    )]
    Get {
        /// Source name
        source: String,
        /// Absolute node path
        path: NodePath,
    },

    /// List the children of a node
    #[command(name = "ls")]
    Ls {
        /// Source name
        source: String,
        /// Absolute node path
        #[arg(default_value = "/")]
        path: NodePath,
    },

    /// Create a folder node
    #[command(name = "mkdir")]
    Mkdir {
        /// Source name
        source: String,
        /// Parent path
        parent: NodePath,
        /// New node name
        name: Name,
    },

    /// Create an empty file node
    #[command(name = "touch")]
    Touch {
        /// Source name
        source: String,
        /// Parent path
        parent: NodePath,
        /// New node name
        name: Name,
    },

    /// Set string properties on a node
    #[command(
        name = "set",
        after_help = "\
WORKFLOW EXAMPLES:
    # Tag a node
    rfed set alpha /articles/intro title=Introduction status=draft"
    )]
    Set {
        /// Source name
        source: String,
        /// Node path
        path: NodePath,
        /// Properties to set
        #[arg(required = true, value_name = "NAME=VALUE")]
        assignments: Vec<String>,
    },

    /// Replace a file node's data with a local file
    #[command(name = "write")]
    Write {
        /// Source name
        source: String,
        /// File node path
        path: NodePath,
        /// Local file to upload
        file: PathBuf,
    },

    /// Delete a node and everything beneath it
    #[command(name = "rm")]
    Rm {
        /// Source name
        source: String,
        /// Node path
        path: NodePath,
    },

    /// Move a node under a new parent
    #[command(
        name = "mv",
        after_help = "\
WORKFLOW EXAMPLES:
    # Move into another folder
    rfed mv docs /drafts/intro.md /published

    # Reorder siblings (connectors with ordered children only)
    rfed mv alpha /chapters/three /chapters --before one"
    )]
    Mv {
        /// Source name
        source: String,
        /// Node to move
        from: NodePath,
        /// New parent
        into: NodePath,
        /// Place before this existing child of the new parent
        #[arg(long, value_name = "SEGMENT")]
        before: Option<PathSegment>,
    },

    /// Detect the MIME type of a local file
    #[command(name = "detect")]
    Detect {
        /// File to inspect
        file: PathBuf,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        long_about = "Generate shell completion scripts for tab-completion.\n\n\
            Outputs a completion script for the specified shell. Add the output \
            to your shell's configuration to enable tab-completion for rfed commands.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash
    rfed completion bash >> ~/.bashrc

    # Zsh
    rfed completion zsh > \"${fpath[1]}/_rfed\"

    # Fish
    rfed completion fish > ~/.config/fish/completions/rfed.fish

    # PowerShell
    rfed completion powershell >> $PROFILE"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Source configuration subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum SourceAction {
    /// Add a source to the configuration file
    Add {
        /// Source name (lowercase letters, digits, '_' or '-')
        name: String,
        /// Connector kind: memory or filesystem
        #[arg(long)]
        connector: String,
        /// Directory exposed by a filesystem source
        #[arg(long)]
        root: Option<PathBuf>,
        /// Reject writes
        #[arg(long)]
        read_only: bool,
        /// Isolation level (defaults to the connector's)
        #[arg(long)]
        isolation: Option<String>,
    },
    /// Remove a source from the configuration file
    Remove {
        /// Source name
        name: String,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_paths_and_names() {
        let cli = Cli::try_parse_from(["rfed", "mkdir", "docs", "/a", "b"]).unwrap();
        match cli.command {
            Command::Mkdir { parent, name, .. } => {
                assert_eq!(parent.to_string(), "/a");
                assert_eq!(name.as_str(), "b");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_relative_path() {
        assert!(Cli::try_parse_from(["rfed", "get", "docs", "a/b"]).is_err());
    }

    #[test]
    fn ls_defaults_to_root() {
        let cli = Cli::try_parse_from(["rfed", "--json", "ls", "docs"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Command::Ls { path, .. } => assert!(path.is_root()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["rfed", "sources", "--config", "/tmp/c.toml", "-q"]).unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }
}
