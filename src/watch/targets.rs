// src/watch/targets.rs

//! Watch targets and the directory registrations they translate into.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::{Result, WhenChangedError};
use crate::fs::FileSystem;
use crate::watch::patterns::ExcludeRuleSet;

/// Whether a target names a single file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    File,
    Directory,
}

/// A path the user asked to monitor, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    /// Absolute, normalised path.
    pub path: PathBuf,
    pub kind: TargetKind,
    pub recursive: bool,
}

impl WatchTarget {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: TargetKind::File,
            recursive: false,
        }
    }

    pub fn directory(path: impl Into<PathBuf>, recursive: bool) -> Self {
        Self {
            path: path.into(),
            kind: TargetKind::Directory,
            recursive,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == TargetKind::Directory
    }
}

/// Resolve user-supplied target strings into absolute [`WatchTarget`]s.
///
/// A target that does not exist is a startup error.
pub fn resolve_targets(
    fs: &dyn FileSystem,
    raw: &[String],
    recursive: bool,
) -> Result<Vec<WatchTarget>> {
    let mut targets = Vec::with_capacity(raw.len());
    for entry in raw {
        let path = Path::new(entry);
        let abs = fs.canonicalize(path).map_err(|e| {
            WhenChangedError::Startup(format!("cannot watch '{entry}': {e:#}"))
        })?;

        let target = if fs.is_dir(&abs) {
            WatchTarget::directory(abs, recursive)
        } else {
            WatchTarget::file(abs)
        };
        debug!(?target, "resolved watch target");
        if !targets.contains(&target) {
            targets.push(target);
        }
    }
    Ok(targets)
}

/// Directories that must be registered with the event source, each with a
/// non-recursive subscription.
///
/// - A file target registers its parent directory, so editors that save by
///   renaming a fresh file over the old one keep being observed.
/// - A directory target registers itself, plus every non-excluded
///   subdirectory when it is recursive.
pub fn plan_registrations(
    fs: &dyn FileSystem,
    targets: &[WatchTarget],
    excludes: &ExcludeRuleSet,
) -> Vec<PathBuf> {
    let mut dirs = BTreeSet::new();

    for target in targets {
        match target.kind {
            TargetKind::File => {
                if let Some(parent) = target.path.parent() {
                    dirs.insert(parent.to_path_buf());
                }
            }
            TargetKind::Directory if target.recursive => {
                collect_subdirs(fs, &target.path, excludes, &mut dirs);
            }
            TargetKind::Directory => {
                dirs.insert(target.path.clone());
            }
        }
    }

    dirs.into_iter().collect()
}

/// Depth-first enumeration of `root` and all of its non-excluded
/// subdirectories.
pub fn collect_subdirs(
    fs: &dyn FileSystem,
    root: &Path,
    excludes: &ExcludeRuleSet,
    out: &mut BTreeSet<PathBuf>,
) {
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        if !out.insert(dir.clone()) {
            continue;
        }
        let children = match fs.read_dir(&dir) {
            Ok(children) => children,
            Err(err) => {
                warn!(?dir, error = %err, "cannot list directory; skipping its subtree");
                continue;
            }
        };
        for child in children {
            if fs.is_dir(&child) && !excludes.is_excluded(&child) {
                stack.push(child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn tree() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/a.txt");
        fs.add_file("/proj/sub/b.txt");
        fs.add_file("/proj/sub/deep/c.txt");
        fs.add_file("/proj/.git/HEAD");
        fs.add_file("/other/notes.md");
        fs
    }

    #[test]
    fn resolves_kinds_and_rejects_missing_paths() {
        let fs = tree();
        let targets =
            resolve_targets(&fs, &["/proj".into(), "/other/notes.md".into()], true).unwrap();
        assert_eq!(
            targets,
            vec![
                WatchTarget::directory("/proj", true),
                WatchTarget::file("/other/notes.md"),
            ]
        );

        let err = resolve_targets(&fs, &["/missing".into()], false).unwrap_err();
        assert!(matches!(err, WhenChangedError::Startup(_)));
    }

    #[test]
    fn non_recursive_directory_registers_only_itself() {
        let fs = tree();
        let excludes = ExcludeRuleSet::builtin().unwrap();
        let dirs = plan_registrations(&fs, &[WatchTarget::directory("/proj", false)], &excludes);
        assert_eq!(dirs, vec![PathBuf::from("/proj")]);
    }

    #[test]
    fn recursive_directory_enumerates_subdirs_but_skips_excluded() {
        let fs = tree();
        let excludes = ExcludeRuleSet::builtin().unwrap();
        let dirs = plan_registrations(&fs, &[WatchTarget::directory("/proj", true)], &excludes);
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/proj"),
                PathBuf::from("/proj/sub"),
                PathBuf::from("/proj/sub/deep"),
            ]
        );
    }

    #[test]
    fn file_target_registers_parent_directory() {
        let fs = tree();
        let excludes = ExcludeRuleSet::builtin().unwrap();
        let dirs = plan_registrations(
            &fs,
            &[
                WatchTarget::file("/other/notes.md"),
                WatchTarget::directory("/other", false),
            ],
            &excludes,
        );
        assert_eq!(dirs, vec![PathBuf::from("/other")]);
    }
}
