// src/exec/context.rs

//! Environment exposed to the child command.
//!
//! The two variables below are the only external contract of the tool and
//! their names must never change.

use std::collections::BTreeMap;

use crate::types::{ChangeEvent, ChangeKind};

pub const EVENT_VAR: &str = "WHEN_CHANGED_EVENT";
pub const FILE_VAR: &str = "WHEN_CHANGED_FILE";

/// Value of `WHEN_CHANGED_EVENT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    FileCreated,
    FileModified,
    FileMoved,
    FileDeleted,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::FileCreated => "file_created",
            EventType::FileModified => "file_modified",
            EventType::FileMoved => "file_moved",
            EventType::FileDeleted => "file_deleted",
        }
    }

    /// Permission changes count as modifications; the synthetic startup
    /// kind has no event type.
    pub fn from_kind(kind: ChangeKind) -> Option<Self> {
        match kind {
            ChangeKind::Created => Some(EventType::FileCreated),
            ChangeKind::Modified | ChangeKind::ChmodChanged => Some(EventType::FileModified),
            ChangeKind::Renamed => Some(EventType::FileMoved),
            ChangeKind::Removed => Some(EventType::FileDeleted),
            ChangeKind::Startup => None,
        }
    }
}

/// Overrides layered on top of the inherited environment for one run.
///
/// The runner passes these to the child with `Command::envs`, so every
/// inherited entry survives unless its key is one of the two variables.
///
/// A startup run produces no overrides: the command sees exactly the
/// watcher's environment.
pub fn build_env(event: &ChangeEvent) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    if let Some(event_type) = EventType::from_kind(event.kind) {
        env.insert(EVENT_VAR.to_string(), event_type.as_str().to_string());
        env.insert(FILE_VAR.to_string(), event.path.to_string_lossy().into_owned());
    }
    env
}
