// src/watch/patterns.rs

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::RegexSet;

use crate::watch::path_utils::to_slash;

/// Built-in exclusion rules as `(name, pattern)` pairs.
///
/// Each pattern is matched against the slash-separated path and prefixed with
/// `^(?:.*/)?` when compiled, so it applies to a path component anywhere in
/// the path and not only at the root.
pub const BUILTIN_EXCLUDES: &[(&str, &str)] = &[
    // Vim swap files (.foo.swp, .foo.swx, ...)
    ("vim-swap", r"\.[^/]*\.sw[a-px]$"),
    // Vim creates 4913 to test write permission
    ("vim-write-check", r"4913$"),
    // Backup files
    ("backup", r"[^/]+~$"),
    // Version-control metadata directories
    ("vcs-metadata", r"\.(?:git|hg|svn)(?:/|$)"),
    // Python bytecode caches
    ("bytecode-cache", r"__pycache__(?:/|$)"),
];

/// Ordered exclusion rules compiled once at startup.
///
/// The built-in rules are always active. Optional user globs (from
/// `--exclude` or `[watch].exclude`) are checked after them.
#[derive(Clone)]
pub struct ExcludeRuleSet {
    names: Vec<&'static str>,
    builtin: RegexSet,
    user_globs: Option<GlobSet>,
}

impl fmt::Debug for ExcludeRuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExcludeRuleSet")
            .field("builtin", &self.names)
            .field("user_globs", &self.user_globs.as_ref().map(GlobSet::len))
            .finish()
    }
}

impl ExcludeRuleSet {
    /// Compile the built-in rules plus the given user globs.
    pub fn new(user_globs: &[String]) -> Result<Self> {
        let names = BUILTIN_EXCLUDES.iter().map(|(name, _)| *name).collect();
        let builtin = RegexSet::new(
            BUILTIN_EXCLUDES
                .iter()
                .map(|(_, pattern)| format!("^(?:.*/)?{pattern}")),
        )
        .context("compiling built-in exclusion rules")?;

        let user_globs = if user_globs.is_empty() {
            None
        } else {
            Some(build_globset(user_globs)?)
        };

        Ok(Self {
            names,
            builtin,
            user_globs,
        })
    }

    /// Only the built-in rules.
    pub fn builtin() -> Result<Self> {
        Self::new(&[])
    }

    /// Name of the first rule that excludes `path`, if any.
    ///
    /// User globs are reported as `"user-glob"`.
    pub fn matching_rule(&self, path: &Path) -> Option<&'static str> {
        let slashed = to_slash(path);
        if let Some(idx) = self.builtin.matches(&slashed).iter().next() {
            return Some(self.names[idx]);
        }
        if let Some(globs) = &self.user_globs {
            let name_hit = path.file_name().is_some_and(|n| globs.is_match(n));
            if name_hit || globs.is_match(&slashed) {
                return Some("user-glob");
            }
        }
        None
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        self.matching_rule(path).is_some()
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
