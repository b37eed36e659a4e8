//! command
//!
//! Commands submitted to a connection, and their results.
//!
//! # Design
//!
//! A [`Command`] is an immutable request. Executing it produces a separate
//! [`CommandResult`] that is either a success carrying [`CommandOutput`] or
//! a recorded [`CommandError`]. Every command targets a path, exposed
//! through [`ActsOnPath`].
//!
//! # Example
//!
//! ```
//! use repofed::command::{ActsOnPath, Command};
//! use repofed::core::path::{Name, Path};
//!
//! let cmd = Command::create_node(Path::root(), Name::new("docs").unwrap(), vec![]);
//! assert!(cmd.is_write());
//! assert_eq!(cmd.path(), &Path::root());
//! assert_eq!(cmd.kind(), "create_node");
//! ```

use serde::{Deserialize, Serialize};

use crate::core::error::{CommandError, ErrorKind};
use crate::core::node::{PathNode, Property};
use crate::core::path::{Name, Path, PathSegment};

/// Anything that targets a repository path.
pub trait ActsOnPath {
    /// The location this acts on.
    fn path(&self) -> &Path;
}

/// A request against one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Snapshot the node at `path`.
    ReadNode { path: Path },

    /// List the child segments of `path`.
    ReadChildren { path: Path },

    /// Read one property. A missing property is a success with no value.
    ReadProperty { path: Path, name: Name },

    /// Create `name` under `parent`.
    CreateNode {
        parent: Path,
        name: Name,
        #[serde(default)]
        properties: Vec<Property>,
    },

    /// Add or replace properties.
    SetProperties { path: Path, properties: Vec<Property> },

    /// Remove properties by name.
    RemoveProperties { path: Path, names: Vec<Name> },

    /// Delete the node and all its descendants.
    DeleteBranch { path: Path },

    /// Move `from` under `into`, optionally before an existing child.
    MoveBranch {
        from: Path,
        into: Path,
        #[serde(default)]
        before: Option<PathSegment>,
    },
}

impl Command {
    pub fn read_node(path: Path) -> Self {
        Command::ReadNode { path }
    }

    pub fn read_children(path: Path) -> Self {
        Command::ReadChildren { path }
    }

    pub fn read_property(path: Path, name: Name) -> Self {
        Command::ReadProperty { path, name }
    }

    pub fn create_node(parent: Path, name: Name, properties: Vec<Property>) -> Self {
        Command::CreateNode {
            parent,
            name,
            properties,
        }
    }

    pub fn set_properties(path: Path, properties: Vec<Property>) -> Self {
        Command::SetProperties { path, properties }
    }

    pub fn remove_properties(path: Path, names: Vec<Name>) -> Self {
        Command::RemoveProperties { path, names }
    }

    pub fn delete_branch(path: Path) -> Self {
        Command::DeleteBranch { path }
    }

    pub fn move_branch(from: Path, into: Path, before: Option<PathSegment>) -> Self {
        Command::MoveBranch { from, into, before }
    }

    /// Whether the command modifies the store.
    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            Command::ReadNode { .. } | Command::ReadChildren { .. } | Command::ReadProperty { .. }
        )
    }

    /// Stable name of the command kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::ReadNode { .. } => "read_node",
            Command::ReadChildren { .. } => "read_children",
            Command::ReadProperty { .. } => "read_property",
            Command::CreateNode { .. } => "create_node",
            Command::SetProperties { .. } => "set_properties",
            Command::RemoveProperties { .. } => "remove_properties",
            Command::DeleteBranch { .. } => "delete_branch",
            Command::MoveBranch { .. } => "move_branch",
        }
    }
}

impl ActsOnPath for Command {
    /// The target path. For `CreateNode` this is the parent, for
    /// `MoveBranch` the node being moved.
    fn path(&self) -> &Path {
        match self {
            Command::ReadNode { path }
            | Command::ReadChildren { path }
            | Command::ReadProperty { path, .. }
            | Command::SetProperties { path, .. }
            | Command::RemoveProperties { path, .. }
            | Command::DeleteBranch { path } => path,
            Command::CreateNode { parent, .. } => parent,
            Command::MoveBranch { from, .. } => from,
        }
    }
}

/// What a successful command produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "output", content = "value", rename_all = "snake_case")]
pub enum CommandOutput {
    Node(PathNode),
    Children(Vec<PathSegment>),
    Property(Option<Property>),
    Created(Path),
    Moved(Path),
    Done,
}

/// The outcome of one executed command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    command: Command,
    path: Path,
    outcome: Result<CommandOutput, CommandError>,
}

impl CommandResult {
    /// A success. `path` is the resolved, created or moved location.
    pub fn success(command: Command, path: Path, output: CommandOutput) -> Self {
        Self {
            command,
            path,
            outcome: Ok(output),
        }
    }

    /// A recorded failure, reported at the command's own target path.
    pub fn failure(command: Command, error: CommandError) -> Self {
        let path = command.path().clone();
        Self {
            command,
            path,
            outcome: Err(error),
        }
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn outcome(&self) -> Result<&CommandOutput, &CommandError> {
        self.outcome.as_ref()
    }

    pub fn output(&self) -> Option<&CommandOutput> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&CommandError> {
        self.outcome.as_ref().err()
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Kind of the recorded error, if any.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error().map(CommandError::kind)
    }

    /// The node, when the command was a successful `ReadNode`.
    pub fn node(&self) -> Option<&PathNode> {
        match self.output() {
            Some(CommandOutput::Node(node)) => Some(node),
            _ => None,
        }
    }

    pub fn into_outcome(self) -> Result<CommandOutput, CommandError> {
        self.outcome
    }
}

impl ActsOnPath for CommandResult {
    /// Always set: the result location on success, otherwise the target.
    fn path(&self) -> &Path {
        &self.path
    }
}

/// Results of a batch, in submission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    results: Vec<CommandResult>,
}

impl BatchReport {
    pub fn new(results: Vec<CommandResult>) -> Self {
        Self { results }
    }

    pub fn results(&self) -> &[CommandResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Results that recorded an error.
    pub fn failures(&self) -> impl Iterator<Item = &CommandResult> {
        self.results.iter().filter(|r| !r.is_ok())
    }

    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(CommandResult::is_ok)
    }

    pub fn into_results(self) -> Vec<CommandResult> {
        self.results
    }
}

impl IntoIterator for BatchReport {
    type Item = CommandResult;
    type IntoIter = std::vec::IntoIter<CommandResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}
