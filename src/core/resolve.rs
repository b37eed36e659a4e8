//! core::resolve
//!
//! Segment-by-segment path resolution shared by connectors.
//!
//! # Algorithm
//!
//! Starting from a handle for the root (or a cached ancestor), each segment
//! of the requested path is looked up in the current node with a
//! connector-supplied `step`. The first segment that `step` cannot find
//! stops the walk with a [`PathNotFound`] naming the shortest missing
//! sub-path, so callers can see how far resolution got.

use super::error::PathNotFound;
use super::path::{Path, PathSegment};

/// Outcome of a step-wise lookup that may also fail for storage reasons.
#[derive(Debug)]
pub enum WalkError<E> {
    NotFound(PathNotFound),
    Step(E),
}

impl<E> From<PathNotFound> for WalkError<E> {
    fn from(value: PathNotFound) -> Self {
        WalkError::NotFound(value)
    }
}

/// Resolve `path` starting at `start`, which must be the handle for
/// `path.prefix(start_depth)`.
///
/// `step(current, segment)` returns `Ok(Some(child))` when the segment
/// exists under `current`, `Ok(None)` when it does not, and `Err` for a
/// storage failure.
pub fn walk_from<T, E, F>(
    path: &Path,
    start: T,
    start_depth: usize,
    mut step: F,
) -> Result<T, WalkError<E>>
where
    F: FnMut(&T, &PathSegment) -> Result<Option<T>, E>,
{
    let mut current = start;
    for (depth, segment) in path.segments().iter().enumerate().skip(start_depth) {
        match step(&current, segment).map_err(WalkError::Step)? {
            Some(next) => current = next,
            None => return Err(PathNotFound::at_depth(path, depth).into()),
        }
    }
    Ok(current)
}

/// Resolve `path` from the root handle.
pub fn walk<T, E, F>(path: &Path, root: T, step: F) -> Result<T, WalkError<E>>
where
    F: FnMut(&T, &PathSegment) -> Result<Option<T>, E>,
{
    walk_from(path, root, 0, step)
}
