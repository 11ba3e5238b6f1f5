use std::path::{Path, PathBuf};
use std::time::SystemTime;

use clap::ValueEnum;
use serde::Deserialize;

/// Kind of filesystem change carried by a [`ChangeEvent`].
///
/// `Startup` is synthetic: it is never produced by the event source and only
/// exists so the run-at-start execution flows through the same pipeline as
/// real changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
    Renamed,
    ChmodChanged,
    Startup,
}

impl ChangeKind {
    /// Short lowercase label used in logs and banners.
    pub fn label(self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Modified => "modified",
            ChangeKind::Removed => "deleted",
            ChangeKind::Renamed => "moved",
            ChangeKind::ChmodChanged => "chmod",
            ChangeKind::Startup => "startup",
        }
    }
}

/// One filesystem notification flowing through the dispatch pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
    /// Modification time of `path` as observed by the intake task, if the
    /// file still existed when the event was received.
    pub modified_at: Option<SystemTime>,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
            modified_at: None,
        }
    }

    pub fn with_modified_at(mut self, at: SystemTime) -> Self {
        self.modified_at = Some(at);
        self
    }

    /// Synthetic event used for the run-at-start execution.
    pub fn startup(path: impl AsRef<Path>) -> Self {
        Self::new(path.as_ref(), ChangeKind::Startup)
    }

    pub fn is_startup(&self) -> bool {
        self.kind == ChangeKind::Startup
    }
}

/// Raw change kinds that can be configured to trigger a command run.
///
/// Used both on the command line (`--on modified`) and in the config file
/// (`trigger_on = ["modified"]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    #[serde(alias = "create")]
    #[value(alias = "create")]
    Created,
    #[serde(alias = "modify", alias = "write")]
    #[value(alias = "modify", alias = "write")]
    Modified,
    #[serde(alias = "move", alias = "rename")]
    #[value(alias = "move", alias = "rename")]
    Moved,
    #[serde(alias = "delete", alias = "remove")]
    #[value(alias = "delete", alias = "remove")]
    Deleted,
    Chmod,
}

impl TriggerKind {
    /// Default trigger set: every content or namespace mutation, but not
    /// permission-only changes.
    pub const DEFAULTS: [TriggerKind; 4] = [
        TriggerKind::Created,
        TriggerKind::Modified,
        TriggerKind::Moved,
        TriggerKind::Deleted,
    ];

    pub fn change_kind(self) -> ChangeKind {
        match self {
            TriggerKind::Created => ChangeKind::Created,
            TriggerKind::Modified => ChangeKind::Modified,
            TriggerKind::Moved => ChangeKind::Renamed,
            TriggerKind::Deleted => ChangeKind::Removed,
            TriggerKind::Chmod => ChangeKind::ChmodChanged,
        }
    }
}
