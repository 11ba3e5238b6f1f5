// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.
//!
//! Everything here is purely lexical: no function in this module consults
//! the filesystem, so matching never races with the described file's
//! continued existence.

use std::path::{Component, Path, PathBuf};

/// Lexically normalise a path: drop `.` components and resolve `..` against
/// the preceding component. Leading `..` on a relative path is kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                ) && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Make `path` absolute against `base` (if needed) and normalise it.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Render a path with forward slashes, the form the exclusion rules match.
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
