//! connector::memory
//!
//! In-memory connector with snapshot transactions.
//!
//! # Design
//!
//! All sessions opened from one [`InMemorySource`] (and its clones) share a
//! single tree behind a lock. Each node carries a `jcr:uuid`; same-name
//! siblings and explicit reordering are supported.
//!
//! # Transactions
//!
//! - Outside a transaction every write commits immediately.
//! - `begin` clones the tree; reads and writes then go to the private copy.
//! - `commit` publishes the copy, unless another writer committed after this
//!   transaction began, in which case the commit fails and the copy is
//!   discarded (first committer wins). Read-only and unmodified
//!   transactions always commit.
//! - `rollback` discards the copy.
//!
//! # Testing Hooks
//!
//! Failures can be injected per operation with [`FailOn`], the store can be
//! taken offline with [`InMemorySource::set_available`], and lifecycle calls
//! are recorded for inspection.
//!
//! # Example
//!
//! ```
//! use repofed::connector::{FailOn, InMemorySource, MemoryOperation, RepositorySource};
//! use repofed::connector::ConnectorError;
//!
//! let source = InMemorySource::new("alpha")
//!     .fail_on(FailOn::Commit(ConnectorError::Transaction("disk full".into())));
//! let mut session = source.open_session().unwrap();
//! session.begin(false).unwrap();
//! assert!(session.commit().is_err());
//! assert!(source.operations().contains(&MemoryOperation::Commit));
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tracing::debug;
use uuid::Uuid;

use super::traits::{
    ConnectorError, ConnectorSession, IsolationLevel, RepositorySource, SourceCapabilities,
};
use crate::core::error::PathNotFound;
use crate::core::node::{names, PathNode, Property};
use crate::core::path::{index_siblings, Name, Path, PathSegment};
use crate::core::resolve::walk;

/// Operation to fail, with the error to report.
#[derive(Debug, Clone)]
pub enum FailOn {
    OpenSession(ConnectorError),
    Begin(ConnectorError),
    Commit(ConnectorError),
    Rollback(ConnectorError),
}

/// Recorded lifecycle call, for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryOperation {
    OpenSession,
    Begin { read_only: bool },
    Commit,
    Rollback,
    CloseSession,
}

#[derive(Debug, Clone)]
struct MemoryNode {
    /// `None` only for the root.
    name: Option<Name>,
    parent: Option<Uuid>,
    children: Vec<Uuid>,
    properties: BTreeMap<Name, Property>,
}

#[derive(Debug, Clone)]
struct MemoryTree {
    nodes: HashMap<Uuid, MemoryNode>,
    root: Uuid,
    /// Bumped on every published change.
    generation: u64,
}

impl MemoryTree {
    fn new() -> Self {
        let root = Uuid::new_v4();
        let mut properties = BTreeMap::new();
        properties.insert(
            names::primary_type(),
            Property::single(names::primary_type(), names::ROOT_TYPE),
        );
        properties.insert(
            names::uuid(),
            Property::single(names::uuid(), root.to_string()),
        );
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            MemoryNode {
                name: None,
                parent: None,
                children: Vec::new(),
                properties,
            },
        );
        Self {
            nodes,
            root,
            generation: 0,
        }
    }

    fn node(&self, id: Uuid) -> Result<&MemoryNode, ConnectorError> {
        self.nodes
            .get(&id)
            .ok_or_else(|| ConnectorError::Unavailable(format!("dangling node id {id}")))
    }

    fn node_mut(&mut self, id: Uuid) -> Result<&mut MemoryNode, ConnectorError> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| ConnectorError::Unavailable(format!("dangling node id {id}")))
    }

    /// The `segment.index()`-th child of `parent` named `segment.name()`.
    fn child_matching(&self, parent: Uuid, segment: &PathSegment) -> Result<Option<Uuid>, ConnectorError> {
        let parent = self.node(parent)?;
        let mut seen = 0;
        for child in &parent.children {
            if self.node(*child)?.name.as_ref() == Some(segment.name()) {
                seen += 1;
                if seen == segment.index() {
                    return Ok(Some(*child));
                }
            }
        }
        Ok(None)
    }

    fn resolve(&self, path: &Path) -> Result<Uuid, ConnectorError> {
        Ok(walk(path, self.root, |current, segment| {
            self.child_matching(*current, segment)
        })?)
    }

    fn child_names(&self, id: Uuid) -> Result<Vec<Name>, ConnectorError> {
        self.node(id)?
            .children
            .iter()
            .map(|child| {
                self.node(*child)?
                    .name
                    .clone()
                    .ok_or_else(|| ConnectorError::Unavailable("root listed as a child".into()))
            })
            .collect()
    }

    /// The path of `id`, a child of the node at `parent_path`.
    fn path_of(&self, parent_path: &Path, id: Uuid) -> Result<Path, ConnectorError> {
        Ok(parent_path.child(self.segment_of(id)?))
    }

    /// The segment naming `id` under its parent.
    fn segment_of(&self, id: Uuid) -> Result<PathSegment, ConnectorError> {
        let node = self.node(id)?;
        let parent = node
            .parent
            .ok_or_else(|| ConnectorError::Unavailable("root has no segment".into()))?;
        let names = self.child_names(parent)?;
        let position = self
            .node(parent)?
            .children
            .iter()
            .position(|child| *child == id)
            .ok_or_else(|| ConnectorError::Unavailable(format!("node {id} detached")))?;
        index_siblings(names)
            .into_iter()
            .nth(position)
            .ok_or_else(|| ConnectorError::Unavailable(format!("node {id} detached")))
    }

    /// The current path of `id`, rebuilt from parent links.
    fn absolute_path(&self, id: Uuid) -> Result<Path, ConnectorError> {
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(parent) = self.node(current)?.parent {
            segments.push(self.segment_of(current)?);
            current = parent;
        }
        segments.reverse();
        Ok(Path::from_segments(segments))
    }

    fn snapshot(&self, path: &Path) -> Result<PathNode, ConnectorError> {
        let id = self.resolve(path)?;
        let node = self.node(id)?;
        Ok(PathNode::new(
            path.clone(),
            index_siblings(self.child_names(id)?),
            node.properties.values().cloned().collect(),
        ))
    }

    fn is_descendant_or_self(&self, candidate: Uuid, ancestor: Uuid) -> Result<bool, ConnectorError> {
        let mut current = Some(candidate);
        while let Some(id) = current {
            if id == ancestor {
                return Ok(true);
            }
            current = self.node(id)?.parent;
        }
        Ok(false)
    }

    fn create(
        &mut self,
        parent_path: &Path,
        name: &Name,
        properties: Vec<Property>,
    ) -> Result<Path, ConnectorError> {
        let parent = self.resolve(parent_path)?;
        reject_protected(parent_path, &properties)?;

        let id = Uuid::new_v4();
        let mut props: BTreeMap<Name, Property> = BTreeMap::new();
        props.insert(
            names::primary_type(),
            Property::single(names::primary_type(), names::UNSTRUCTURED_TYPE),
        );
        for property in properties {
            props.insert(property.name().clone(), property);
        }
        props.insert(names::uuid(), Property::single(names::uuid(), id.to_string()));

        self.nodes.insert(
            id,
            MemoryNode {
                name: Some(name.clone()),
                parent: Some(parent),
                children: Vec::new(),
                properties: props,
            },
        );
        self.node_mut(parent)?.children.push(id);
        self.path_of(parent_path, id)
    }

    fn set_properties(&mut self, path: &Path, properties: Vec<Property>) -> Result<(), ConnectorError> {
        let id = self.resolve(path)?;
        reject_protected(path, &properties)?;
        let node = self.node_mut(id)?;
        for property in properties {
            node.properties.insert(property.name().clone(), property);
        }
        Ok(())
    }

    fn remove_properties(&mut self, path: &Path, names: &[Name]) -> Result<(), ConnectorError> {
        let id = self.resolve(path)?;
        if names.iter().any(|n| is_protected(n)) {
            return Err(ConnectorError::invalid(path, "jcr:uuid cannot be removed"));
        }
        let node = self.node_mut(id)?;
        for name in names {
            node.properties.remove(name);
        }
        Ok(())
    }

    fn delete(&mut self, path: &Path) -> Result<(), ConnectorError> {
        if path.is_root() {
            return Err(ConnectorError::invalid(path, "the root node cannot be deleted"));
        }
        let id = self.resolve(path)?;
        if let Some(parent) = self.node(id)?.parent {
            self.node_mut(parent)?.children.retain(|child| *child != id);
        }
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                pending.extend(node.children);
            }
        }
        Ok(())
    }

    fn move_branch(
        &mut self,
        from: &Path,
        into: &Path,
        before: Option<&PathSegment>,
    ) -> Result<Path, ConnectorError> {
        if from.is_root() {
            return Err(ConnectorError::invalid(from, "the root node cannot be moved"));
        }
        let id = self.resolve(from)?;
        let target = self.resolve(into)?;
        if self.is_descendant_or_self(target, id)? {
            return Err(ConnectorError::invalid(
                from,
                format!("cannot move a node beneath itself ({into})"),
            ));
        }
        let anchor = match before {
            Some(segment) => Some(self.child_matching(target, segment)?.ok_or_else(|| {
                ConnectorError::NotFound(PathNotFound::at_depth(
                    &into.child(segment.clone()),
                    into.len(),
                ))
            })?),
            None => None,
        };

        let old_parent = self
            .node(id)?
            .parent
            .ok_or_else(|| ConnectorError::invalid(from, "the root node cannot be moved"))?;
        self.node_mut(old_parent)?.children.retain(|child| *child != id);

        let siblings = &mut self.node_mut(target)?.children;
        match anchor.and_then(|a| siblings.iter().position(|child| *child == a)) {
            Some(position) => siblings.insert(position, id),
            // Anchoring on itself keeps the node last among its new siblings.
            None => siblings.push(id),
        }
        self.node_mut(id)?.parent = Some(target);
        // Detaching `id` may have shifted sibling indexes along `into`.
        self.absolute_path(id)
    }
}

fn is_protected(name: &Name) -> bool {
    name.as_str() == names::UUID
}

fn reject_protected(path: &Path, properties: &[Property]) -> Result<(), ConnectorError> {
    if properties.iter().any(|p| p.name().as_str() == names::UUID) {
        return Err(ConnectorError::invalid(path, "jcr:uuid is assigned by the store"));
    }
    Ok(())
}

#[derive(Debug)]
struct SharedStore {
    tree: RwLock<MemoryTree>,
    fail_on: Mutex<Option<FailOn>>,
    operations: Mutex<Vec<MemoryOperation>>,
    available: AtomicBool,
}

impl SharedStore {
    fn record(&self, op: MemoryOperation) {
        if let Ok(mut ops) = self.operations.lock() {
            ops.push(op);
        }
    }

    fn check_fail(&self, op: &MemoryOperation) -> Result<(), ConnectorError> {
        let fail_on = self.fail_on.lock().map_err(|_| poisoned())?;
        match (fail_on.as_ref(), op) {
            (Some(FailOn::OpenSession(e)), MemoryOperation::OpenSession)
            | (Some(FailOn::Begin(e)), MemoryOperation::Begin { .. })
            | (Some(FailOn::Commit(e)), MemoryOperation::Commit)
            | (Some(FailOn::Rollback(e)), MemoryOperation::Rollback) => Err(e.clone()),
            _ => Ok(()),
        }
    }

    fn ensure_available(&self) -> Result<(), ConnectorError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ConnectorError::Unavailable("memory store is offline".into()))
        }
    }
}

fn poisoned() -> ConnectorError {
    ConnectorError::Unavailable("memory store lock poisoned".into())
}

/// In-memory source. Clones share the same tree.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    name: String,
    read_only: bool,
    store: Arc<SharedStore>,
}

impl InMemorySource {
    /// Create a source holding an empty tree (just the root).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            read_only: false,
            store: Arc::new(SharedStore {
                tree: RwLock::new(MemoryTree::new()),
                fail_on: Mutex::new(None),
                operations: Mutex::new(Vec::new()),
                available: AtomicBool::new(true),
            }),
        }
    }

    /// Mark the source read-only.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Configure an operation to fail.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        if let Ok(mut slot) = self.store.fail_on.lock() {
            *slot = Some(fail_on);
        }
        self
    }

    pub fn clear_fail_on(&self) {
        if let Ok(mut slot) = self.store.fail_on.lock() {
            *slot = None;
        }
    }

    /// Take the store offline (`false`) or bring it back (`true`).
    ///
    /// While offline, opening sessions and every session primitive fail
    /// with `ConnectorError::Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.store.available.store(available, Ordering::SeqCst);
    }

    /// Recorded lifecycle calls, oldest first.
    pub fn operations(&self) -> Vec<MemoryOperation> {
        self.store
            .operations
            .lock()
            .map(|ops| ops.clone())
            .unwrap_or_default()
    }

    pub fn clear_operations(&self) {
        if let Ok(mut ops) = self.store.operations.lock() {
            ops.clear();
        }
    }

    /// Number of published changes so far.
    pub fn generation(&self) -> u64 {
        self.store.tree.read().map(|t| t.generation).unwrap_or(0)
    }
}

impl RepositorySource for InMemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "memory"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities {
            isolation: IsolationLevel::Snapshot,
            transactions: true,
            read_only: self.read_only,
            same_name_siblings: true,
            reorderable_children: true,
        }
    }

    fn open_session(&self) -> Result<Box<dyn ConnectorSession>, ConnectorError> {
        self.store.record(MemoryOperation::OpenSession);
        self.store.ensure_available()?;
        self.store.check_fail(&MemoryOperation::OpenSession)?;
        Ok(Box::new(MemorySession {
            store: Arc::clone(&self.store),
            transaction: None,
        }))
    }
}

#[derive(Debug)]
struct MemoryTransaction {
    working: MemoryTree,
    base_generation: u64,
    dirty: bool,
}

#[derive(Debug)]
struct MemorySession {
    store: Arc<SharedStore>,
    transaction: Option<MemoryTransaction>,
}

impl MemorySession {
    fn read<R>(&self, f: impl FnOnce(&MemoryTree) -> Result<R, ConnectorError>) -> Result<R, ConnectorError> {
        self.store.ensure_available()?;
        match &self.transaction {
            Some(tx) => f(&tx.working),
            None => {
                let tree = self.store.tree.read().map_err(|_| poisoned())?;
                f(&tree)
            }
        }
    }

    fn write<R>(
        &mut self,
        f: impl FnOnce(&mut MemoryTree) -> Result<R, ConnectorError>,
    ) -> Result<R, ConnectorError> {
        self.store.ensure_available()?;
        match &mut self.transaction {
            Some(tx) => {
                let result = f(&mut tx.working)?;
                tx.dirty = true;
                Ok(result)
            }
            None => {
                let mut tree = self.store.tree.write().map_err(|_| poisoned())?;
                let result = f(&mut tree)?;
                tree.generation += 1;
                Ok(result)
            }
        }
    }
}

impl ConnectorSession for MemorySession {
    fn begin(&mut self, read_only: bool) -> Result<(), ConnectorError> {
        self.store.record(MemoryOperation::Begin { read_only });
        self.store.ensure_available()?;
        self.store.check_fail(&MemoryOperation::Begin { read_only })?;
        if self.transaction.is_some() {
            return Err(ConnectorError::Transaction(
                "a transaction is already in progress".into(),
            ));
        }
        let working = self.store.tree.read().map_err(|_| poisoned())?.clone();
        debug!(generation = working.generation, "memory snapshot taken");
        self.transaction = Some(MemoryTransaction {
            base_generation: working.generation,
            working,
            dirty: false,
        });
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ConnectorError> {
        self.store.record(MemoryOperation::Commit);
        let Some(tx) = self.transaction.take() else {
            return Ok(());
        };
        self.store.check_fail(&MemoryOperation::Commit)?;
        if !tx.dirty {
            return Ok(());
        }
        self.store.ensure_available()?;
        let mut tree = self.store.tree.write().map_err(|_| poisoned())?;
        if tree.generation != tx.base_generation {
            return Err(ConnectorError::Transaction(format!(
                "store changed since the transaction began (generation {} -> {})",
                tx.base_generation, tree.generation
            )));
        }
        let mut working = tx.working;
        working.generation = tx.base_generation + 1;
        *tree = working;
        debug!(generation = tree.generation, "memory transaction published");
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), ConnectorError> {
        self.store.record(MemoryOperation::Rollback);
        self.transaction = None;
        self.store.check_fail(&MemoryOperation::Rollback)
    }

    fn read_node(&mut self, path: &Path) -> Result<PathNode, ConnectorError> {
        self.read(|tree| tree.snapshot(path))
    }

    fn create_node(
        &mut self,
        parent: &Path,
        name: &Name,
        properties: Vec<Property>,
    ) -> Result<Path, ConnectorError> {
        self.write(|tree| tree.create(parent, name, properties))
    }

    fn set_properties(
        &mut self,
        path: &Path,
        properties: Vec<Property>,
    ) -> Result<(), ConnectorError> {
        self.write(|tree| tree.set_properties(path, properties))
    }

    fn remove_properties(&mut self, path: &Path, names: &[Name]) -> Result<(), ConnectorError> {
        self.write(|tree| tree.remove_properties(path, names))
    }

    fn delete_branch(&mut self, path: &Path) -> Result<(), ConnectorError> {
        self.write(|tree| tree.delete(path))
    }

    fn move_branch(
        &mut self,
        from: &Path,
        into: &Path,
        before: Option<&PathSegment>,
    ) -> Result<Path, ConnectorError> {
        self.write(|tree| tree.move_branch(from, into, before))
    }

    fn close(&mut self) -> Result<(), ConnectorError> {
        self.store.record(MemoryOperation::CloseSession);
        self.transaction = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        Name::new(s).unwrap()
    }

    fn path(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    fn session(source: &InMemorySource) -> Box<dyn ConnectorSession> {
        source.open_session().unwrap()
    }

    #[test]
    fn empty_root() {
        let source = InMemorySource::new("alpha");
        let root = session(&source).read_node(&Path::root()).unwrap();
        assert!(root.child_segments().is_empty());
        assert_eq!(root.primary_type(), Some(names::ROOT_TYPE));
        assert!(root.property(&names::uuid()).is_some());
    }

    #[test]
    fn same_name_siblings_get_indexes() {
        let source = InMemorySource::new("alpha");
        let mut s = session(&source);
        assert_eq!(s.create_node(&Path::root(), &name("a"), vec![]).unwrap(), path("/a"));
        assert_eq!(s.create_node(&Path::root(), &name("b"), vec![]).unwrap(), path("/b"));
        assert_eq!(s.create_node(&Path::root(), &name("a"), vec![]).unwrap(), path("/a[2]"));

        let root = s.read_node(&Path::root()).unwrap();
        let rendered: Vec<String> = root.child_segments().iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["a", "b", "a[2]"]);
        assert_eq!(root.unique_child_names().len(), 2);
    }

    #[test]
    fn uuid_is_protected() {
        let source = InMemorySource::new("alpha");
        let mut s = session(&source);
        s.create_node(&Path::root(), &name("a"), vec![]).unwrap();
        let err = s
            .set_properties(&path("/a"), vec![Property::single(names::uuid(), "x")])
            .unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidOperation { .. }));
        let err = s.remove_properties(&path("/a"), &[names::uuid()]).unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidOperation { .. }));
    }

    #[test]
    fn delete_removes_descendants() {
        let source = InMemorySource::new("alpha");
        let mut s = session(&source);
        s.create_node(&Path::root(), &name("a"), vec![]).unwrap();
        s.create_node(&path("/a"), &name("b"), vec![]).unwrap();
        s.delete_branch(&path("/a")).unwrap();
        assert!(matches!(s.read_node(&path("/a")), Err(ConnectorError::NotFound(_))));
        let tree = source.store.tree.read().unwrap();
        assert_eq!(tree.nodes.len(), 1);
    }

    #[test]
    fn move_with_reorder() {
        let source = InMemorySource::new("alpha");
        let mut s = session(&source);
        for n in ["a", "b", "c"] {
            s.create_node(&Path::root(), &name(n), vec![]).unwrap();
        }
        let moved = s
            .move_branch(&path("/c"), &Path::root(), Some(&PathSegment::first(name("a"))))
            .unwrap();
        assert_eq!(moved, path("/c"));
        let root = s.read_node(&Path::root()).unwrap();
        let rendered: Vec<String> = root.child_segments().iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["c", "a", "b"]);
    }

    #[test]
    fn move_beneath_itself_is_invalid() {
        let source = InMemorySource::new("alpha");
        let mut s = session(&source);
        s.create_node(&Path::root(), &name("a"), vec![]).unwrap();
        s.create_node(&path("/a"), &name("b"), vec![]).unwrap();
        let err = s.move_branch(&path("/a"), &path("/a/b"), None).unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidOperation { .. }));
        let err = s.move_branch(&path("/a"), &path("/a"), None).unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidOperation { .. }));
    }

    #[test]
    fn transaction_isolated_until_commit() {
        let source = InMemorySource::new("alpha");
        let mut writer = session(&source);
        let mut reader = session(&source);

        writer.begin(false).unwrap();
        writer.create_node(&Path::root(), &name("a"), vec![]).unwrap();
        assert!(reader.read_node(&path("/a")).is_err());
        writer.commit().unwrap();
        assert!(reader.read_node(&path("/a")).is_ok());
    }

    #[test]
    fn first_committer_wins() {
        let source = InMemorySource::new("alpha");
        let mut first = session(&source);
        let mut second = session(&source);

        first.begin(false).unwrap();
        second.begin(false).unwrap();
        first.create_node(&Path::root(), &name("a"), vec![]).unwrap();
        second.create_node(&Path::root(), &name("b"), vec![]).unwrap();
        first.commit().unwrap();
        let err = second.commit().unwrap_err();
        assert!(matches!(err, ConnectorError::Transaction(_)));

        let root = first.read_node(&Path::root()).unwrap();
        assert_eq!(root.child_segments().len(), 1);
    }

    #[test]
    fn offline_store_is_unavailable() {
        let source = InMemorySource::new("alpha");
        let mut s = session(&source);
        source.set_available(false);
        assert!(matches!(s.read_node(&Path::root()), Err(ConnectorError::Unavailable(_))));
        assert!(matches!(source.open_session(), Err(ConnectorError::Unavailable(_))));
        source.set_available(true);
        assert!(s.read_node(&Path::root()).is_ok());
    }
}
