// src/watch/matcher.rs

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::watch::path_utils::normalize;
use crate::watch::patterns::ExcludeRuleSet;
use crate::watch::targets::WatchTarget;

/// Decides whether a changed path is interesting.
///
/// A pure function of the exclusion rules, the registered targets and the
/// recursive option: it never looks at the filesystem.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    excludes: ExcludeRuleSet,
    /// Every registered target path (files and directories).
    targets: HashSet<PathBuf>,
    /// Directory targets only; nested paths are matched against these.
    dirs: HashSet<PathBuf>,
    recursive: bool,
}

impl PathMatcher {
    pub fn new(excludes: ExcludeRuleSet, targets: &[WatchTarget], recursive: bool) -> Self {
        let targets_set = targets.iter().map(|t| normalize(&t.path)).collect();
        let dirs = targets
            .iter()
            .filter(|t| t.is_dir())
            .map(|t| normalize(&t.path))
            .collect();
        Self {
            excludes,
            targets: targets_set,
            dirs,
            recursive,
        }
    }

    /// Returns true if a change to `path` should be fed to the run policy.
    ///
    /// - Exclusions always win, even over an explicitly registered path.
    /// - A registered path matches directly.
    /// - A direct child of a registered directory matches.
    /// - In recursive mode, any descendant of a registered directory matches;
    ///   ancestors are walked upward until a target or the root is found.
    pub fn is_interested(&self, path: &Path) -> bool {
        let path = normalize(path);

        if self.excludes.is_excluded(&path) {
            return false;
        }

        if self.targets.contains(&path) {
            return true;
        }

        let Some(parent) = path.parent() else {
            return false;
        };

        if self.dirs.contains(parent) {
            return true;
        }

        if self.recursive {
            return parent.ancestors().skip(1).any(|anc| self.dirs.contains(anc));
        }

        false
    }

    pub fn excludes(&self) -> &ExcludeRuleSet {
        &self.excludes
    }

    pub fn recursive(&self) -> bool {
        self.recursive
    }
}
