// src/engine/mod.rs

//! Orchestration engine for when-changed.
//!
//! This module ties together:
//! - the dispatch table (which raw change kinds may trigger a run)
//! - the run policy (at most one command in flight, drop or coalesce)
//! - the main runtime event loop that reacts to:
//!   - filesystem changes and transport errors from the watcher
//!   - command completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::fmt;
use std::time::Duration;

use crate::types::ChangeEvent;

/// How a command run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Failed(i32),
    /// Killed after exceeding the configured timeout.
    TimedOut,
    /// The process could not be started at all.
    SpawnFailed(String),
}

impl RunStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Success)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Success => write!(f, "status 0"),
            RunStatus::Failed(code) => write!(f, "status {code}"),
            RunStatus::TimedOut => write!(f, "a timeout"),
            RunStatus::SpawnFailed(err) => write!(f, "a spawn failure ({err})"),
        }
    }
}

/// Completion report sent by the command runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub status: RunStatus,
    pub elapsed: Duration,
}

/// Why the runtime loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Interrupt or terminate signal.
    Signal,
    /// The event source closed its channel.
    SourceClosed,
    /// Every sender of the runtime channel is gone.
    ChannelClosed,
}

/// Runtime options shared by the core and the async shell.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub command: String,
    pub quiet: bool,
    pub verbosity: u8,
    pub timeout: Option<Duration>,
    /// How long to wait for an in-flight command once asked to stop.
    pub shutdown_grace: Duration,
}

impl RuntimeOptions {
    pub fn from_options(options: &crate::config::Options) -> Self {
        Self {
            command: options.command.clone(),
            quiet: options.quiet,
            verbosity: options.verbosity,
            timeout: options.timeout,
            shutdown_grace: options.shutdown_grace,
        }
    }
}

/// Events flowing into the runtime from the watcher, the runner and the
/// signal handler.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// One filesystem notification.
    FileChanged(ChangeEvent),
    /// The event source reported an error; watching continues.
    TransportError(String),
    /// The in-flight command finished.
    CommandCompleted(RunReport),
    /// The event source closed its channel.
    SourceClosed,
    /// Graceful shutdown requested (Ctrl-C / SIGTERM).
    ShutdownRequested,
}

pub mod core;
pub mod dispatch;
pub mod policy;
pub mod runtime;

pub use self::core::{CoreCommand, CoreRuntime, CoreStep};
pub use dispatch::{DispatchAction, DispatchTable};
pub use policy::{Decision, DropReason, RunPolicy, RunState};
pub use runtime::Runtime;
