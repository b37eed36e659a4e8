//! connector::filesystem
//!
//! Connector exposing a local directory tree.
//!
//! # Mapping
//!
//! - directories are `nt:folder` nodes (the configured root is `mode:root`)
//! - regular files are `nt:file` nodes with a single `jcr:content` child
//! - `jcr:content` is an `nt:resource` carrying `jcr:data` (file bytes),
//!   `jcr:mimeType` (from the detector chain) and `jcr:lastModified`
//!
//! Children are listed by file name. Entries whose names are not valid node
//! names are skipped.
//!
//! # Restrictions
//!
//! - No same-name siblings and no explicit ordering.
//! - Only `jcr:data` on a content node can be written; other properties are
//!   computed from the file system.
//! - Transactions are no-ops and every write is immediately visible
//!   ([`IsolationLevel::None`]).
//!
//! Content writes are atomic: bytes go to a temporary file in the same
//! directory, which is then renamed over the target.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::traits::{
    ConnectorError, ConnectorSession, IsolationLevel, RepositorySource, SourceCapabilities,
};
use crate::core::node::{names, PathNode, Property, PropertyValue};
use crate::core::path::{Name, Path, PathSegment};
use crate::core::resolve::walk;
use crate::mime::MimeTypeDetectors;

/// Source backed by a directory on the local file system.
#[derive(Debug, Clone)]
pub struct FileSystemSource {
    name: String,
    root: PathBuf,
    read_only: bool,
    detectors: Arc<MimeTypeDetectors>,
}

impl FileSystemSource {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>, detectors: Arc<MimeTypeDetectors>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            read_only: false,
            detectors,
        }
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// The directory exposed as `/`.
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl RepositorySource for FileSystemSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "filesystem"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities {
            isolation: IsolationLevel::None,
            transactions: false,
            read_only: self.read_only,
            same_name_siblings: false,
            reorderable_children: false,
        }
    }

    fn open_session(&self) -> Result<Box<dyn ConnectorSession>, ConnectorError> {
        match fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => Ok(Box::new(FileSystemSession {
                root: self.root.clone(),
                detectors: Arc::clone(&self.detectors),
            })),
            Ok(_) => Err(ConnectorError::Unavailable(format!(
                "{} is not a directory",
                self.root.display()
            ))),
            Err(e) => Err(ConnectorError::Unavailable(format!(
                "cannot open {}: {}",
                self.root.display(),
                e
            ))),
        }
    }
}

/// What a resolved path points at.
#[derive(Debug, Clone)]
enum Location {
    Folder(PathBuf),
    File(PathBuf),
    Content(PathBuf),
}

#[derive(Debug)]
struct FileSystemSession {
    root: PathBuf,
    detectors: Arc<MimeTypeDetectors>,
}

impl FileSystemSession {
    fn locate(&self, path: &Path) -> Result<Location, ConnectorError> {
        Ok(walk(path, Location::Folder(self.root.clone()), |current, segment| {
            step(path, current, segment)
        })?)
    }

    fn folder(&self, path: &Path, reason: &str) -> Result<PathBuf, ConnectorError> {
        match self.locate(path)? {
            Location::Folder(dir) => Ok(dir),
            Location::File(_) => Err(ConnectorError::invalid(path, format!("files {reason}"))),
            Location::Content(_) => Err(ConnectorError::invalid(path, format!("content nodes {reason}"))),
        }
    }

    fn folder_node(&self, path: &Path, dir: &std::path::Path) -> Result<PathNode, ConnectorError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| ConnectorError::io(path, &e))? {
            let entry = entry.map_err(|e| ConnectorError::io(path, &e))?;
            let file_name = entry.file_name();
            match file_name.to_str().map(Name::new) {
                Some(Ok(name)) if !is_temp(name.as_str()) => names.push(name),
                _ => debug!(entry = ?file_name, "skipping entry without a valid node name"),
            }
        }
        names.sort();
        let meta = fs::metadata(dir).map_err(|e| ConnectorError::io(path, &e))?;
        let primary = if path.is_root() {
            names::ROOT_TYPE
        } else {
            names::FOLDER_TYPE
        };
        Ok(PathNode::new(
            path.clone(),
            names.into_iter().map(PathSegment::first).collect(),
            vec![
                Property::single(names::primary_type(), primary),
                Property::single(names::last_modified(), modified(path, &meta)?),
            ],
        ))
    }

    fn content_node(&self, path: &Path, file: &std::path::Path) -> Result<PathNode, ConnectorError> {
        let data = fs::read(file).map_err(|e| ConnectorError::io(path, &e))?;
        let meta = fs::metadata(file).map_err(|e| ConnectorError::io(path, &e))?;
        let file_name = file.file_name().and_then(|n| n.to_str());
        let mime = self
            .detectors
            .detect_bytes(file_name, &data)
            .map_err(|e| ConnectorError::Io {
                path: path.clone(),
                message: e.to_string(),
            })?;

        let mut properties = vec![
            Property::single(names::primary_type(), names::RESOURCE_TYPE),
            Property::single(names::last_modified(), modified(path, &meta)?),
            Property::single(names::data(), data),
        ];
        if let Some(mime) = mime {
            properties.push(Property::single(names::mime_type(), mime));
        }
        Ok(PathNode::new(path.clone(), vec![], properties))
    }
}

fn step(requested: &Path, current: &Location, segment: &PathSegment) -> Result<Option<Location>, ConnectorError> {
    if segment.index() != 1 {
        return Ok(None);
    }
    match current {
        Location::Folder(dir) => {
            if is_temp(segment.name().as_str()) {
                return Ok(None);
            }
            let candidate = dir.join(segment.name().as_str());
            match fs::metadata(&candidate) {
                Ok(meta) if meta.is_dir() => Ok(Some(Location::Folder(candidate))),
                Ok(meta) if meta.is_file() => Ok(Some(Location::File(candidate))),
                Ok(_) => Ok(None),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(ConnectorError::io(requested, &e)),
            }
        }
        Location::File(file) if segment.name().as_str() == names::CONTENT => {
            Ok(Some(Location::Content(file.clone())))
        }
        Location::File(_) | Location::Content(_) => Ok(None),
    }
}

const TEMP_PREFIX: &str = ".rfed-tmp-";

fn is_temp(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX)
}

fn modified(path: &Path, meta: &fs::Metadata) -> Result<DateTime<Utc>, ConnectorError> {
    meta.modified()
        .map(DateTime::<Utc>::from)
        .map_err(|e| ConnectorError::io(path, &e))
}

/// Replace `target`'s bytes via a temp file and rename.
fn write_atomic(path: &Path, target: &std::path::Path, data: &[u8]) -> Result<(), ConnectorError> {
    let dir = target
        .parent()
        .ok_or_else(|| ConnectorError::invalid(path, "file has no parent directory"))?;
    let file_name = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ConnectorError::invalid(path, "file name is not valid UTF-8"))?;
    let temp = dir.join(format!("{TEMP_PREFIX}{file_name}"));

    let result = (|| -> io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp)?;
        file.write_all(data)?;
        file.sync_all()?;
        fs::rename(&temp, target)
    })();
    if let Err(e) = result {
        let _ = fs::remove_file(&temp);
        return Err(ConnectorError::io(path, &e));
    }
    Ok(())
}

/// Bytes of a `jcr:data` property. Only single binary or string values qualify.
fn data_bytes<'a>(path: &Path, property: &'a Property) -> Result<&'a [u8], ConnectorError> {
    match property.values() {
        [value] => value
            .as_bytes()
            .ok_or_else(|| ConnectorError::invalid(path, "jcr:data must be binary or string")),
        _ => Err(ConnectorError::invalid(path, "jcr:data must have exactly one value")),
    }
}

impl ConnectorSession for FileSystemSession {
    fn begin(&mut self, read_only: bool) -> Result<(), ConnectorError> {
        debug!(read_only, "filesystem transaction begin (no-op)");
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ConnectorError> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), ConnectorError> {
        Ok(())
    }

    fn read_node(&mut self, path: &Path) -> Result<PathNode, ConnectorError> {
        match self.locate(path)? {
            Location::Folder(dir) => self.folder_node(path, &dir),
            Location::File(file) => {
                let meta = fs::metadata(&file).map_err(|e| ConnectorError::io(path, &e))?;
                Ok(PathNode::new(
                    path.clone(),
                    vec![PathSegment::first(names::content())],
                    vec![
                        Property::single(names::primary_type(), names::FILE_TYPE),
                        Property::single(names::last_modified(), modified(path, &meta)?),
                    ],
                ))
            }
            Location::Content(file) => self.content_node(path, &file),
        }
    }

    fn create_node(
        &mut self,
        parent: &Path,
        name: &Name,
        properties: Vec<Property>,
    ) -> Result<Path, ConnectorError> {
        let dir = self.folder(parent, "cannot have children")?;
        if name.as_str() == names::CONTENT || is_temp(name.as_str()) {
            return Err(ConnectorError::invalid(parent, format!("'{name}' is a reserved name")));
        }

        let mut primary = names::FOLDER_TYPE;
        let mut data: Option<&Property> = None;
        for property in &properties {
            match property.name().as_str() {
                names::PRIMARY_TYPE => {
                    primary = match property.first().and_then(PropertyValue::as_str) {
                        Some(names::FOLDER_TYPE) => names::FOLDER_TYPE,
                        Some(names::FILE_TYPE) => names::FILE_TYPE,
                        other => {
                            return Err(ConnectorError::invalid(
                                parent,
                                format!("unsupported primary type {other:?}; use nt:folder or nt:file"),
                            ))
                        }
                    }
                }
                names::DATA => data = Some(property),
                other => {
                    return Err(ConnectorError::invalid(
                        parent,
                        format!("property '{other}' cannot be stored on the file system"),
                    ))
                }
            }
        }
        if data.is_some() && primary != names::FILE_TYPE {
            return Err(ConnectorError::invalid(parent, "only files can carry jcr:data"));
        }

        let created = parent.child_named(name.clone());
        let target = dir.join(name.as_str());
        let exists = fs::symlink_metadata(&target).is_ok();
        if exists {
            return Err(ConnectorError::invalid(
                &created,
                "same-name siblings are not supported",
            ));
        }

        if primary == names::FILE_TYPE {
            let bytes = data.map(|p| data_bytes(&created, p)).transpose()?;
            File::options()
                .write(true)
                .create_new(true)
                .open(&target)
                .map_err(|e| ConnectorError::io(&created, &e))?;
            if let Some(bytes) = bytes {
                if let Err(err) = write_atomic(&created, &target, bytes) {
                    let _ = fs::remove_file(&target);
                    return Err(err);
                }
            }
        } else {
            fs::create_dir(&target).map_err(|e| ConnectorError::io(&created, &e))?;
        }
        debug!(path = %created, primary, "created filesystem node");
        Ok(created)
    }

    fn set_properties(
        &mut self,
        path: &Path,
        properties: Vec<Property>,
    ) -> Result<(), ConnectorError> {
        let location = self.locate(path)?;
        let Location::Content(file) = location else {
            if properties.is_empty() {
                return Ok(());
            }
            return Err(ConnectorError::invalid(
                path,
                "properties of folders and files are computed; write jcr:data on jcr:content",
            ));
        };
        for property in &properties {
            if property.name().as_str() != names::DATA {
                return Err(ConnectorError::invalid(
                    path,
                    format!("'{}' is computed and cannot be set", property.name()),
                ));
            }
        }
        for property in &properties {
            write_atomic(path, &file, data_bytes(path, property)?)?;
        }
        Ok(())
    }

    fn remove_properties(&mut self, path: &Path, names: &[Name]) -> Result<(), ConnectorError> {
        let node = self.read_node(path)?;
        if let Some(present) = names.iter().find(|n| node.property(n).is_some()) {
            return Err(ConnectorError::invalid(
                path,
                format!("'{present}' is computed and cannot be removed"),
            ));
        }
        Ok(())
    }

    fn delete_branch(&mut self, path: &Path) -> Result<(), ConnectorError> {
        if path.is_root() {
            return Err(ConnectorError::invalid(path, "the root node cannot be deleted"));
        }
        match self.locate(path)? {
            Location::Folder(dir) => fs::remove_dir_all(&dir).map_err(|e| ConnectorError::io(path, &e)),
            Location::File(file) => fs::remove_file(&file).map_err(|e| ConnectorError::io(path, &e)),
            Location::Content(_) => Err(ConnectorError::invalid(
                path,
                "jcr:content is removed with its file",
            )),
        }
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
        if before.is_some() {
            return Err(ConnectorError::invalid(
                into,
                "children are ordered by name and cannot be reordered",
            ));
        }
        let source = match self.locate(from)? {
            Location::Folder(p) | Location::File(p) => p,
            Location::Content(_) => {
                return Err(ConnectorError::invalid(from, "jcr:content moves with its file"))
            }
        };
        let dir = self.folder(into, "cannot have children")?;
        if dir.starts_with(&source) {
            return Err(ConnectorError::invalid(
                from,
                format!("cannot move a node beneath itself ({into})"),
            ));
        }

        let name = from
            .last_segment()
            .map(|s| s.name().clone())
            .ok_or_else(|| ConnectorError::invalid(from, "the root node cannot be moved"))?;
        let moved = into.child_named(name.clone());
        let target = dir.join(name.as_str());
        if target == source {
            debug!(path = %from, "node already under target parent");
            return Ok(moved);
        }
        if fs::symlink_metadata(&target).is_ok() {
            return Err(ConnectorError::invalid(&moved, "same-name siblings are not supported"));
        }
        fs::rename(&source, &target).map_err(|e| ConnectorError::io(from, &e))?;
        debug!(from = %from, to = %moved, "moved filesystem node");
        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Box<dyn ConnectorSession>) {
        let dir = TempDir::new().unwrap();
        let source = FileSystemSource::new(
            "docs",
            dir.path(),
            Arc::new(MimeTypeDetectors::with_defaults(None)),
        );
        let session = source.open_session().unwrap();
        (dir, session)
    }

    fn path(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    fn name(s: &str) -> Name {
        Name::new(s).unwrap()
    }

    #[test]
    fn missing_root_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let source = FileSystemSource::new(
            "docs",
            dir.path().join("nope"),
            Arc::new(MimeTypeDetectors::new()),
        );
        assert!(matches!(source.open_session(), Err(ConnectorError::Unavailable(_))));
    }

    #[test]
    fn lists_sorted_children() {
        let (dir, mut session) = setup();
        fs::create_dir(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("a.txt"), "hi").unwrap();
        fs::write(dir.path().join("bad[1]"), "skipped").unwrap();

        let root = session.read_node(&Path::root()).unwrap();
        let rendered: Vec<String> = root.child_segments().iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["a.txt", "b"]);
        assert_eq!(root.primary_type(), Some(names::ROOT_TYPE));
        assert_eq!(
            session.read_node(&path("/b")).unwrap().primary_type(),
            Some(names::FOLDER_TYPE)
        );
    }

    #[test]
    fn file_has_content_child() {
        let (dir, mut session) = setup();
        fs::write(dir.path().join("a.txt"), "hello").unwrap();

        let file = session.read_node(&path("/a.txt")).unwrap();
        assert_eq!(file.primary_type(), Some(names::FILE_TYPE));
        assert_eq!(file.child_paths(), vec![path("/a.txt/jcr:content")]);

        let content = session.read_node(&path("/a.txt/jcr:content")).unwrap();
        assert_eq!(
            content.property(&names::data()).and_then(Property::first),
            Some(&PropertyValue::Binary(b"hello".to_vec()))
        );
        assert_eq!(
            content.property(&names::mime_type()).and_then(Property::first),
            Some(&PropertyValue::from("text/plain"))
        );
        assert!(content.property(&names::last_modified()).is_some());
    }

    #[test]
    fn create_file_and_write_content() {
        let (dir, mut session) = setup();
        let created = session
            .create_node(
                &Path::root(),
                &name("notes.md"),
                vec![Property::single(names::primary_type(), names::FILE_TYPE)],
            )
            .unwrap();
        assert_eq!(created, path("/notes.md"));

        session
            .set_properties(
                &path("/notes.md/jcr:content"),
                vec![Property::single(names::data(), "# Title")],
            )
            .unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("notes.md")).unwrap(), "# Title");
        assert!(!dir.path().join(format!("{TEMP_PREFIX}notes.md")).exists());
    }

    #[test]
    fn leaves_cannot_have_children() {
        let (dir, mut session) = setup();
        fs::write(dir.path().join("a.txt"), "x").unwrap();
        for parent in ["/a.txt", "/a.txt/jcr:content"] {
            let err = session.create_node(&path(parent), &name("x"), vec![]).unwrap_err();
            assert!(matches!(err, ConnectorError::InvalidOperation { .. }), "{parent}");
        }
    }

    #[test]
    fn same_name_and_indexed_segments() {
        let (_dir, mut session) = setup();
        session.create_node(&Path::root(), &name("a"), vec![]).unwrap();
        let err = session.create_node(&Path::root(), &name("a"), vec![]).unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidOperation { .. }));
        assert!(matches!(session.read_node(&path("/a[2]")), Err(ConnectorError::NotFound(_))));
    }

    #[test]
    fn computed_properties_are_read_only() {
        let (dir, mut session) = setup();
        fs::write(dir.path().join("a.txt"), "x").unwrap();
        let err = session
            .set_properties(
                &path("/a.txt/jcr:content"),
                vec![Property::single(names::mime_type(), "text/html")],
            )
            .unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidOperation { .. }));
        let err = session
            .remove_properties(&path("/a.txt/jcr:content"), &[names::data()])
            .unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidOperation { .. }));
        session
            .remove_properties(&path("/a.txt"), &[name("absent")])
            .unwrap();
    }

    #[test]
    fn move_renames_and_rejects_reorder() {
        let (dir, mut session) = setup();
        fs::create_dir_all(dir.path().join("src/inner")).unwrap();
        fs::create_dir(dir.path().join("dst")).unwrap();

        let moved = session.move_branch(&path("/src"), &path("/dst"), None).unwrap();
        assert_eq!(moved, path("/dst/src"));
        assert!(dir.path().join("dst/src/inner").is_dir());

        let err = session
            .move_branch(&path("/dst"), &path("/dst/src/inner"), None)
            .unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidOperation { .. }));

        let err = session
            .move_branch(&path("/dst/src"), &Path::root(), Some(&PathSegment::first(name("dst"))))
            .unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidOperation { .. }));
    }

    #[test]
    fn delete_folder_and_file() {
        let (dir, mut session) = setup();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("f.txt"), "x").unwrap();
        session.delete_branch(&path("/a")).unwrap();
        session.delete_branch(&path("/f.txt")).unwrap();
        assert!(!dir.path().join("a").exists());
        assert!(!dir.path().join("f.txt").exists());
        let err = session.delete_branch(&Path::root()).unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidOperation { .. }));
    }
}
