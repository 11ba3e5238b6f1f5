// src/config/model.rs

use std::collections::BTreeSet;
use std::time::Duration;

use serde::Deserialize;

use crate::types::TriggerKind;
use crate::watch::DEFAULT_SETTLE;

/// Optional config file as read from TOML.
///
/// ```toml
/// [watch]
/// paths = ["src", "Cargo.toml"]
/// recursive = true
/// exclude = ["*.log"]
/// settle_ms = 50
///
/// [run]
/// command = "cargo test"
/// run_once = true
/// verbose = 1
/// trigger_on = ["modified", "created"]
/// timeout_secs = 120
///
/// [shutdown]
/// grace_secs = 5
/// ```
///
/// Every section and key is optional; command-line arguments are merged on
/// top by [`crate::config::resolve_options`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub run: RunSection,

    #[serde(default)]
    pub shutdown: ShutdownSection,
}

/// `[watch]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    #[serde(default)]
    pub paths: Vec<String>,

    #[serde(default)]
    pub recursive: bool,

    /// User globs ignored on top of the built-in exclusion rules.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Milliseconds to collect a burst of notifications before acting.
    pub settle_ms: Option<u64>,
}

/// `[run]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSection {
    pub command: Option<String>,

    #[serde(default)]
    pub run_once: bool,

    #[serde(default)]
    pub run_at_start: bool,

    #[serde(default)]
    pub quiet: bool,

    pub verbose: Option<u8>,

    pub trigger_on: Option<Vec<TriggerKind>>,

    pub timeout_secs: Option<u64>,
}

/// `[shutdown]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShutdownSection {
    pub grace_secs: Option<u64>,
}

/// Fully resolved, immutable options for one watcher process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Watch targets exactly as given by the user (resolved to absolute paths
    /// later, at registration time).
    pub targets: Vec<String>,
    pub recursive: bool,
    pub verbosity: u8,
    pub run_once: bool,
    pub run_at_start: bool,
    pub quiet: bool,
    pub command: String,
    pub exclude: Vec<String>,
    pub trigger_on: BTreeSet<TriggerKind>,
    /// `None` means the command always runs to completion.
    pub timeout: Option<Duration>,
    /// Zero means exit immediately on a shutdown signal.
    pub shutdown_grace: Duration,
    /// Quiet period that collapses one burst of notifications per path.
    pub settle: Duration,
}

impl Options {
    /// Options with the given targets and command and every other knob at its
    /// default value.
    pub fn new(targets: Vec<String>, command: impl Into<String>) -> Self {
        Self {
            targets,
            recursive: false,
            verbosity: 0,
            run_once: false,
            run_at_start: false,
            quiet: false,
            command: command.into(),
            exclude: Vec::new(),
            trigger_on: TriggerKind::DEFAULTS.into_iter().collect(),
            timeout: None,
            shutdown_grace: Duration::ZERO,
            settle: DEFAULT_SETTLE,
        }
    }
}
