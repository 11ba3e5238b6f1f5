// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the user's command with
//! `tokio::process::Command` and reporting back to the runtime via
//! `RuntimeEvent::CommandCompleted`.
//!
//! - [`context`] builds the `WHEN_CHANGED_*` environment for a run.
//! - [`runner`] spawns one command, prints the verbosity banners and reports
//!   the outcome.
//! - [`backend`] provides the `ExecutorBackend` trait and the concrete
//!   `RealExecutorBackend` used in production, which tests replace with a
//!   fake implementation.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::types::ChangeEvent;

pub mod backend;
pub mod context;
pub mod runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use context::{build_env, EventType, EVENT_VAR, FILE_VAR};
pub use runner::execute;

/// Everything needed to run the command once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunJob {
    pub command: String,
    /// Overrides layered on top of the inherited environment.
    pub env: BTreeMap<String, String>,
    pub quiet: bool,
    pub verbosity: u8,
    pub timeout: Option<Duration>,
    /// The event that caused this run.
    pub trigger: ChangeEvent,
}
