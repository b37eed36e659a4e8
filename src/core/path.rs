//! core::path
//!
//! Immutable, structurally comparable repository paths.
//!
//! # Types
//!
//! - [`Name`] - Validated node or property name
//! - [`PathSegment`] - One step in a path: a name plus a same-name-sibling index
//! - [`Path`] - Ordered sequence of segments; the empty sequence is the root
//!
//! # Textual Form
//!
//! The root is written `/`. Other paths are slash-delimited segments, each
//! optionally followed by a 1-based same-name-sibling index in brackets:
//! `/a/b[2]/c`. An index of `1` is omitted when displayed.
//!
//! # Examples
//!
//! ```
//! use repofed::core::path::{Name, Path};
//!
//! let path: Path = "/docs/report[2]/jcr:content".parse().unwrap();
//! assert_eq!(path.len(), 3);
//! assert_eq!(path.to_string(), "/docs/report[2]/jcr:content");
//! assert_eq!(path.parent().unwrap().to_string(), "/docs/report[2]");
//!
//! // Paths never imply existence and never touch storage.
//! let child = Path::root().child_named(Name::new("a").unwrap());
//! assert_eq!(child.to_string(), "/a");
//!
//! assert!(Path::parse("relative/path").is_err());
//! assert!(Name::new("a/b").is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from path and name validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}

/// A validated node or property name.
///
/// Names must be non-empty, cannot be `.` or `..`, and cannot contain `/`,
/// `[`, `]` or control characters. A namespace prefix such as `jcr:` is
/// allowed but only one `:` may appear.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Name(String);

impl Name {
    /// Create a new validated name.
    ///
    /// # Errors
    ///
    /// Returns `PathError::InvalidName` if the name violates the naming rules.
    pub fn new(name: impl Into<String>) -> Result<Self, PathError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// Build a name from a compile-time constant known to be valid.
    pub(crate) fn trusted(name: &'static str) -> Self {
        debug_assert!(Self::validate(name).is_ok(), "invalid constant name {name}");
        Self(name.to_string())
    }

    fn validate(name: &str) -> Result<(), PathError> {
        let fail = |reason: &str| {
            Err(PathError::InvalidName {
                name: name.to_string(),
                reason: reason.to_string(),
            })
        };

        if name.is_empty() {
            return fail("name cannot be empty");
        }
        if name == "." || name == ".." {
            return fail("name cannot be '.' or '..'");
        }
        if name.trim() != name {
            return fail("name cannot start or end with whitespace");
        }
        for c in ['/', '[', ']'] {
            if name.contains(c) {
                return fail(&format!("name cannot contain '{c}'"));
            }
        }
        if name.chars().any(|c| c.is_control()) {
            return fail("name cannot contain control characters");
        }
        if name.matches(':').count() > 1 {
            return fail("name can have at most one namespace prefix");
        }
        if name.starts_with(':') || name.ends_with(':') {
            return fail("namespace prefix and local name cannot be empty");
        }

        Ok(())
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The namespace prefix, if any (`jcr` for `jcr:uuid`).
    pub fn prefix(&self) -> Option<&str> {
        self.0.split_once(':').map(|(prefix, _)| prefix)
    }

    /// The local part of the name (`uuid` for `jcr:uuid`).
    pub fn local_name(&self) -> &str {
        self.0.split_once(':').map_or(&self.0, |(_, local)| local)
    }
}

impl TryFrom<String> for Name {
    type Error = PathError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for Name {
    type Error = PathError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Name> for String {
    fn from(name: Name) -> Self {
        name.0
    }
}

impl FromStr for Name {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One step in a path: a name plus a 1-based same-name-sibling index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathSegment {
    name: Name,
    index: u32,
}

impl PathSegment {
    /// Create a segment with an explicit same-name-sibling index.
    ///
    /// # Errors
    ///
    /// Returns `PathError::InvalidPath` if `index` is zero.
    pub fn new(name: Name, index: u32) -> Result<Self, PathError> {
        if index == 0 {
            return Err(PathError::InvalidPath {
                path: format!("{name}[0]"),
                reason: "same-name-sibling indexes start at 1".into(),
            });
        }
        Ok(Self { name, index })
    }

    /// Create a segment for the first (or only) sibling with this name.
    pub fn first(name: Name) -> Self {
        Self { name, index: 1 }
    }

    /// The segment's name.
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// The 1-based same-name-sibling index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Parse a single segment such as `report` or `report[2]`.
    pub fn parse(text: &str) -> Result<Self, PathError> {
        let invalid = |reason: &str| PathError::InvalidPath {
            path: text.to_string(),
            reason: reason.to_string(),
        };

        match text.find('[') {
            None => Ok(Self::first(Name::new(text)?)),
            Some(open) => {
                let digits = text[open + 1..]
                    .strip_suffix(']')
                    .ok_or_else(|| invalid("unterminated same-name-sibling index"))?;
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid("same-name-sibling index must be a positive integer"));
                }
                let index: u32 = digits
                    .parse()
                    .map_err(|_| invalid("same-name-sibling index must be a positive integer"))?;
                Self::new(Name::new(&text[..open])?, index)
            }
        }
    }
}

impl TryFrom<String> for PathSegment {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PathSegment::parse(&value)
    }
}

impl From<PathSegment> for String {
    fn from(value: PathSegment) -> Self {
        value.to_string()
    }
}

impl FromStr for PathSegment {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.index == 1 {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}[{}]", self.name, self.index)
        }
    }
}

/// An absolute repository path.
///
/// Paths are values: cloning is cheap enough for command payloads, equality
/// and ordering compare segments one by one, and nothing here performs I/O.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Path {
    segments: Vec<PathSegment>,
}

impl Path {
    /// The root path (`/`).
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from segments.
    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    /// Parse an absolute path.
    ///
    /// A single trailing slash is tolerated (`/a/` equals `/a`).
    ///
    /// # Errors
    ///
    /// Returns `PathError::InvalidPath` for relative paths, empty segments,
    /// and malformed indexes, or `PathError::InvalidName` for bad names.
    pub fn parse(text: &str) -> Result<Self, PathError> {
        let rest = text.strip_prefix('/').ok_or_else(|| PathError::InvalidPath {
            path: text.to_string(),
            reason: "path must start with '/'".into(),
        })?;
        if rest.is_empty() {
            return Ok(Self::root());
        }
        let rest = rest.strip_suffix('/').unwrap_or(rest);

        let segments = rest
            .split('/')
            .map(|part| {
                if part.is_empty() {
                    Err(PathError::InvalidPath {
                        path: text.to_string(),
                        reason: "path cannot contain empty segments".into(),
                    })
                } else {
                    PathSegment::parse(part)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { segments })
    }

    /// Check if this is the root path.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments (0 for the root).
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Same as [`Path::is_root`].
    pub fn is_empty(&self) -> bool {
        self.is_root()
    }

    /// The segments of this path, outermost first.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// The final segment, or `None` for the root.
    pub fn last_segment(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// The parent path, or `None` for the root.
    pub fn parent(&self) -> Option<Path> {
        if self.is_root() {
            None
        } else {
            Some(self.prefix(self.len() - 1))
        }
    }

    /// A new path with `segment` appended.
    pub fn child(&self, segment: PathSegment) -> Path {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Path { segments }
    }

    /// A new path with a first-index segment for `name` appended.
    pub fn child_named(&self, name: Name) -> Path {
        self.child(PathSegment::first(name))
    }

    /// The ancestor made of the first `depth` segments.
    ///
    /// `depth` is clamped to the length of the path.
    pub fn prefix(&self, depth: usize) -> Path {
        let depth = depth.min(self.len());
        Path {
            segments: self.segments[..depth].to_vec(),
        }
    }

    /// Check if this path is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        self.len() < other.len() && other.segments.starts_with(&self.segments)
    }
}

impl TryFrom<String> for Path {
    type Error = PathError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.to_string()
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, "/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

/// Assign same-name-sibling indexes to an ordered list of child names.
///
/// Connectors use this to turn their native child listing into the
/// segment list exposed by a [`PathNode`](crate::core::node::PathNode).
///
/// ```
/// use repofed::core::path::{index_siblings, Name};
///
/// let names = ["a", "b", "a"].map(|n| Name::new(n).unwrap());
/// let segments = index_siblings(names);
/// let rendered: Vec<String> = segments.iter().map(|s| s.to_string()).collect();
/// assert_eq!(rendered, ["a", "b", "a[2]"]);
/// ```
pub fn index_siblings(names: impl IntoIterator<Item = Name>) -> Vec<PathSegment> {
    let mut seen: std::collections::HashMap<Name, u32> = std::collections::HashMap::new();
    names
        .into_iter()
        .map(|name| {
            let counter = seen.entry(name.clone()).or_insert(0);
            *counter += 1;
            PathSegment { name, index: *counter }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        Name::new(s).unwrap()
    }

    mod names {
        use super::*;

        #[test]
        fn accepts_plain_and_prefixed() {
            assert_eq!(name("docs").as_str(), "docs");
            let prefixed = name("jcr:uuid");
            assert_eq!(prefixed.prefix(), Some("jcr"));
            assert_eq!(prefixed.local_name(), "uuid");
            assert_eq!(name("docs").prefix(), None);
        }

        #[test]
        fn rejects_invalid() {
            for bad in ["", ".", "..", "a/b", "a[1]", " a", "a ", "a:b:c", ":a", "a:", "a\nb"] {
                assert!(Name::new(bad).is_err(), "{bad:?} should be rejected");
            }
        }
    }

    mod parsing {
        use super::*;

        #[test]
        fn root() {
            let root = Path::parse("/").unwrap();
            assert!(root.is_root());
            assert_eq!(root.to_string(), "/");
            assert_eq!(root, Path::root());
            assert!(root.parent().is_none());
        }

        #[test]
        fn indexes() {
            let path = Path::parse("/a/b[2]/c[1]").unwrap();
            assert_eq!(path.segments()[1].index(), 2);
            assert_eq!(path.segments()[2].index(), 1);
            assert_eq!(path.to_string(), "/a/b[2]/c");
        }

        #[test]
        fn trailing_slash_tolerated() {
            assert_eq!(Path::parse("/a/").unwrap(), Path::parse("/a").unwrap());
        }

        #[test]
        fn rejects_malformed() {
            for bad in ["", "a", "//", "/a//b", "/a[0]", "/a[", "/a[x]", "/a[-1]"] {
                assert!(Path::parse(bad).is_err(), "{bad:?} should be rejected");
            }
        }

        #[test]
        fn index_must_be_plain_digits() {
            for bad in ["a[+2]", "a[ 2]", "a[2 ]", "a[]"] {
                assert!(PathSegment::parse(bad).is_err(), "{bad:?} should be rejected");
            }
            assert_eq!(PathSegment::parse("a[02]").unwrap().to_string(), "a[2]");
        }
    }

    mod structure {
        use super::*;

        #[test]
        fn parent_child_relationship() {
            let parent = Path::parse("/a/b").unwrap();
            let child = parent.child_named(name("c"));
            assert_eq!(child.parent(), Some(parent.clone()));
            assert!(parent.is_ancestor_of(&child));
            assert!(Path::root().is_ancestor_of(&child));
            assert!(!child.is_ancestor_of(&parent));
            assert!(!parent.is_ancestor_of(&parent));
        }

        #[test]
        fn prefix_is_clamped() {
            let path = Path::parse("/a/b").unwrap();
            assert_eq!(path.prefix(1).to_string(), "/a");
            assert_eq!(path.prefix(0), Path::root());
            assert_eq!(path.prefix(10), path);
        }

        #[test]
        fn ordering_is_segment_wise() {
            let a = Path::parse("/a").unwrap();
            let a_b = Path::parse("/a/b").unwrap();
            let a2 = Path::parse("/a[2]").unwrap();
            let b = Path::parse("/b").unwrap();
            let mut paths = vec![b.clone(), a2.clone(), a_b.clone(), a.clone()];
            paths.sort();
            assert_eq!(paths, vec![a, a_b, a2, b]);
        }

        #[test]
        fn serde_as_string() {
            let path = Path::parse("/a/b[3]").unwrap();
            let json = serde_json::to_string(&path).unwrap();
            assert_eq!(json, "\"/a/b[3]\"");
            let back: Path = serde_json::from_str(&json).unwrap();
            assert_eq!(back, path);
            assert!(serde_json::from_str::<Path>("\"nope\"").is_err());
        }
    }
}
