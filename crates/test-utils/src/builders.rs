#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use when_changed::engine::{CoreRuntime, DispatchTable, RunPolicy, RuntimeOptions};
use when_changed::watch::{ExcludeRuleSet, PathMatcher, WatchTarget};

/// Builder for `CoreRuntime` to simplify test setup.
///
/// Targets are taken as already-absolute paths; nothing touches the
/// filesystem.
pub struct CoreBuilder {
    targets: Vec<WatchTarget>,
    recursive: bool,
    run_once: bool,
    run_at_start: bool,
    quiet: bool,
    verbosity: u8,
    command: String,
    exclude: Vec<String>,
    dispatch: DispatchTable,
    timeout: Option<Duration>,
}

impl CoreBuilder {
    pub fn new(command: &str) -> Self {
        Self {
            targets: Vec::new(),
            recursive: false,
            run_once: false,
            run_at_start: false,
            quiet: false,
            verbosity: 0,
            command: command.to_string(),
            exclude: Vec::new(),
            dispatch: DispatchTable::default(),
            timeout: None,
        }
    }

    pub fn watch_dir(mut self, path: &str) -> Self {
        self.targets.push(WatchTarget::directory(path, false));
        self
    }

    pub fn watch_file(mut self, path: &str) -> Self {
        self.targets.push(WatchTarget::file(path));
        self
    }

    /// Applies to every directory target, including ones added later.
    pub fn recursive(mut self, val: bool) -> Self {
        self.recursive = val;
        self
    }

    pub fn run_once(mut self, val: bool) -> Self {
        self.run_once = val;
        self
    }

    pub fn run_at_start(mut self, val: bool) -> Self {
        self.run_at_start = val;
        self
    }

    pub fn quiet(mut self, val: bool) -> Self {
        self.quiet = val;
        self
    }

    pub fn verbosity(mut self, val: u8) -> Self {
        self.verbosity = val;
        self
    }

    pub fn exclude(mut self, glob: &str) -> Self {
        self.exclude.push(glob.to_string());
        self
    }

    pub fn dispatch(mut self, table: DispatchTable) -> Self {
        self.dispatch = table;
        self
    }

    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    pub fn build(self) -> CoreRuntime {
        let targets: Vec<WatchTarget> = self
            .targets
            .into_iter()
            .map(|mut t| {
                if t.is_dir() {
                    t.recursive = self.recursive;
                }
                t
            })
            .collect();

        let excludes = ExcludeRuleSet::new(&self.exclude).expect("valid exclude globs");
        let matcher = PathMatcher::new(excludes, &targets, self.recursive);
        let startup_path = targets
            .first()
            .map(|t| t.path.clone())
            .unwrap_or_else(|| PathBuf::from("/"));

        CoreRuntime::new(
            matcher,
            self.dispatch,
            RunPolicy::new(self.run_once, self.run_at_start),
            RuntimeOptions {
                command: self.command,
                quiet: self.quiet,
                verbosity: self.verbosity,
                timeout: self.timeout,
                shutdown_grace: Duration::ZERO,
            },
            startup_path,
        )
    }
}
