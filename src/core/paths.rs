//! Path helpers shared by the discovery strategies and the deduplicator.

use std::borrow::Cow;
use std::env;
use std::path::{Component, Path, PathBuf};

/// Canonical absolute form of `path`, used as the dedup key.
///
/// Existing paths go through `fs::canonicalize` so that `a/./b`, `a/x/../b`
/// and symlinked parents collapse to one key. Paths that vanished between
/// discovery and merge fall back to a syntactic normalization against the
/// current directory.
pub fn canonical_key(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };

    std::fs::canonicalize(&absolute).unwrap_or_else(|_| normalize_syntactic(&absolute))
}

/// File name of `path` as a lossy string; empty when the path has no name.
pub fn file_name_lossy(path: &Path) -> Cow<'_, str> {
    path.file_name()
        .map_or(Cow::Borrowed(""), |name| name.to_string_lossy())
}

fn normalize_syntactic(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.last(), Some(Component::Normal(_))) {
                    out.pop();
                }
            }
            other => out.push(other),
        }
    }
    out.into_iter().collect()
}
