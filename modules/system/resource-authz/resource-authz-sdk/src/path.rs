//! Store path helpers.
//!
//! Paths are `/`-separated. A segment starting with `{` (a namespaced name)
//! addresses a property rather than a node; the `/{` marker is what separates
//! the real node path from its property pseudo-segments.

/// Path of the store root.
pub const ROOT_PATH: &str = "/";

/// Marker introducing a property pseudo-segment.
pub const PROPERTY_MARKER: &str = "/{";

/// Normalise an empty path to the root path.
#[must_use]
pub fn or_root(path: &str) -> &str {
    if path.is_empty() { ROOT_PATH } else { path }
}

#[must_use]
pub fn is_root(path: &str) -> bool {
    path.is_empty() || path == ROOT_PATH
}

/// Parent of `path`, obtained by trimming the last segment.
///
/// Returns `None` for the root. A top-level path yields the root.
#[must_use]
pub fn parent_path(path: &str) -> Option<&str> {
    if is_root(path) {
        return None;
    }
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    match trimmed.rfind('/') {
        Some(0) | None => Some(ROOT_PATH),
        Some(idx) => Some(&trimmed[..idx]),
    }
}

/// Last segment of `path` (empty for the root).
#[must_use]
pub fn name_of(path: &str) -> &str {
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    trimmed.rsplit('/').next().unwrap_or_default()
}

/// Join a child segment onto a parent path.
#[must_use]
pub fn join(parent: &str, child: &str) -> String {
    if is_root(parent) {
        format!("/{child}")
    } else {
        format!("{parent}/{child}")
    }
}

/// The part of `path` before its first property pseudo-segment, or the root.
#[must_use]
pub fn property_stem(path: &str) -> &str {
    match path.find(PROPERTY_MARKER) {
        Some(idx) => or_root(&path[..idx]),
        None => or_root(path),
    }
}

/// Candidate node paths for a possibly property-qualified path, nearest first.
///
/// The path itself is yielded first, then the path with its trailing property
/// pseudo-segments trimmed one at a time. The root is not included; callers
/// fall back to it when no candidate exists.
pub fn real_node_candidates(path: &str) -> impl Iterator<Item = &str> {
    let first = (!is_root(path)).then_some(path);
    std::iter::successors(first, |p| {
        p.rfind(PROPERTY_MARKER)
            .map(|idx| &p[..idx])
            .filter(|p| !p.is_empty())
    })
}
