//! core::node
//!
//! Read-only node snapshots and property values.
//!
//! # Design
//!
//! A [`PathNode`] is what every connector hands back when asked to read a
//! location. It carries no handle to storage: writes go through commands,
//! and a node read earlier does not change when the store does.
//!
//! # Example
//!
//! ```
//! use repofed::core::node::{names, PathNode, Property, PropertyValue};
//! use repofed::core::path::{index_siblings, Name, Path};
//!
//! let node = PathNode::new(
//!     Path::parse("/docs").unwrap(),
//!     index_siblings(["a", "b", "a"].map(|n| Name::new(n).unwrap())),
//!     vec![Property::single(names::primary_type(), "nt:folder")],
//! );
//!
//! assert_eq!(node.child_segments().len(), 3);
//! assert_eq!(node.unique_child_names().len(), 2);
//! assert_eq!(
//!     node.property(&names::primary_type()).and_then(|p| p.first()),
//!     Some(&PropertyValue::from("nt:folder"))
//! );
//! assert!(node.property(&Name::new("missing").unwrap()).is_none());
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::path::{Name, Path, PathSegment};

/// Well-known property and node names.
pub mod names {
    use crate::core::path::Name;

    pub const PRIMARY_TYPE: &str = "jcr:primaryType";
    pub const UUID: &str = "jcr:uuid";
    pub const DATA: &str = "jcr:data";
    pub const MIME_TYPE: &str = "jcr:mimeType";
    pub const LAST_MODIFIED: &str = "jcr:lastModified";
    pub const CONTENT: &str = "jcr:content";

    pub const ROOT_TYPE: &str = "mode:root";
    pub const UNSTRUCTURED_TYPE: &str = "nt:unstructured";
    pub const FOLDER_TYPE: &str = "nt:folder";
    pub const FILE_TYPE: &str = "nt:file";
    pub const RESOURCE_TYPE: &str = "nt:resource";

    pub fn primary_type() -> Name {
        Name::trusted(PRIMARY_TYPE)
    }

    pub fn uuid() -> Name {
        Name::trusted(UUID)
    }

    pub fn data() -> Name {
        Name::trusted(DATA)
    }

    pub fn mime_type() -> Name {
        Name::trusted(MIME_TYPE)
    }

    pub fn last_modified() -> Name {
        Name::trusted(LAST_MODIFIED)
    }

    pub fn content() -> Name {
        Name::trusted(CONTENT)
    }
}

/// A single property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PropertyValue {
    String(String),
    Long(i64),
    Double(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
    Binary(Vec<u8>),
    Path(Path),
}

impl PropertyValue {
    /// Name of the value's type, as used in serialized form.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::String(_) => "string",
            PropertyValue::Long(_) => "long",
            PropertyValue::Double(_) => "double",
            PropertyValue::Boolean(_) => "boolean",
            PropertyValue::Date(_) => "date",
            PropertyValue::Binary(_) => "binary",
            PropertyValue::Path(_) => "path",
        }
    }

    /// Borrow the value as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the value as bytes. Strings are viewed as their UTF-8 bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PropertyValue::Binary(b) => Some(b),
            PropertyValue::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Long(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Double(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(value: DateTime<Utc>) -> Self {
        PropertyValue::Date(value)
    }
}

impl From<Vec<u8>> for PropertyValue {
    fn from(value: Vec<u8>) -> Self {
        PropertyValue::Binary(value)
    }
}

impl From<Path> for PropertyValue {
    fn from(value: Path) -> Self {
        PropertyValue::Path(value)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "{s}"),
            PropertyValue::Long(n) => write!(f, "{n}"),
            PropertyValue::Double(n) => write!(f, "{n}"),
            PropertyValue::Boolean(b) => write!(f, "{b}"),
            PropertyValue::Date(d) => write!(f, "{}", d.to_rfc3339()),
            PropertyValue::Binary(b) => write!(f, "<{} bytes>", b.len()),
            PropertyValue::Path(p) => write!(f, "{p}"),
        }
    }
}

/// A named property with one or more values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    name: Name,
    values: Vec<PropertyValue>,
}

impl Property {
    /// A single-valued property.
    pub fn single(name: Name, value: impl Into<PropertyValue>) -> Self {
        Self {
            name,
            values: vec![value.into()],
        }
    }

    /// A property holding every value in `values`, in order.
    pub fn multiple(name: Name, values: Vec<PropertyValue>) -> Self {
        Self { name, values }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn values(&self) -> &[PropertyValue] {
        &self.values
    }

    /// The first value, which is the only one for single-valued properties.
    pub fn first(&self) -> Option<&PropertyValue> {
        self.values.first()
    }

    pub fn is_multiple(&self) -> bool {
        self.values.len() > 1
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.values.iter().map(ToString::to_string).collect();
        if self.is_multiple() {
            write!(f, "{} = [{}]", self.name, rendered.join(", "))
        } else {
            write!(f, "{} = {}", self.name, rendered.join(""))
        }
    }
}

/// Read-only snapshot of one location in a store.
///
/// # Invariants
///
/// - `path` is the parent's path plus one segment; the root has the empty path
/// - `child_segments` order is the store's sibling order
/// - property names are unique
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathNode {
    path: Path,
    children: Vec<PathSegment>,
    properties: BTreeMap<Name, Property>,
}

impl PathNode {
    /// Build a snapshot. Later properties with a duplicate name replace
    /// earlier ones.
    pub fn new(path: Path, children: Vec<PathSegment>, properties: Vec<Property>) -> Self {
        let properties = properties
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();
        Self {
            path,
            children,
            properties,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Child segments in sibling order.
    pub fn child_segments(&self) -> &[PathSegment] {
        &self.children
    }

    /// Distinct child names. Same-name siblings share one entry.
    pub fn unique_child_names(&self) -> BTreeSet<&Name> {
        self.children.iter().map(PathSegment::name).collect()
    }

    /// Full paths of the children, in sibling order.
    pub fn child_paths(&self) -> Vec<Path> {
        self.children
            .iter()
            .map(|segment| self.path.child(segment.clone()))
            .collect()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    /// Look up a property. A missing property is `None`, not an error.
    pub fn property(&self, name: &Name) -> Option<&Property> {
        self.properties.get(name)
    }

    /// Shorthand for the `jcr:primaryType` value, when it is a string.
    pub fn primary_type(&self) -> Option<&str> {
        self.property(&names::primary_type())
            .and_then(Property::first)
            .and_then(PropertyValue::as_str)
    }
}
