// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state (the run policy)
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - handing `RunJob`s to the executor
//! - waiting out the shutdown grace period
//!
//! Time is passed in by the caller so the core can be unit tested without
//! any Tokio, channels, filesystem, or processes.

use std::path::PathBuf;
use std::time::SystemTime;

use tracing::{debug, info, warn};

use crate::engine::dispatch::{DispatchAction, DispatchTable};
use crate::engine::policy::{Decision, RunPolicy};
use crate::engine::{ExitReason, RunReport, RuntimeEvent, RuntimeOptions};
use crate::exec::{build_env, RunJob};
use crate::types::ChangeEvent;
use crate::watch::PathMatcher;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Start the command.
    Execute(RunJob),
    /// Stop the runtime loop.
    Exit(ExitReason),
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn continue_with(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    fn idle() -> Self {
        Self::continue_with(Vec::new())
    }

    fn exit(reason: ExitReason) -> Self {
        Self {
            commands: vec![CoreCommand::Exit(reason)],
            keep_running: false,
        }
    }
}

/// Pure core runtime state.
///
/// This owns:
/// - the path matcher
/// - the dispatch table
/// - the run policy (the only mutable state)
/// - runtime options
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    matcher: PathMatcher,
    dispatch: DispatchTable,
    policy: RunPolicy,
    options: RuntimeOptions,
    /// Path reported for the synthetic startup run.
    startup_path: PathBuf,
}

impl CoreRuntime {
    pub fn new(
        matcher: PathMatcher,
        dispatch: DispatchTable,
        policy: RunPolicy,
        options: RuntimeOptions,
        startup_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            matcher,
            dispatch,
            policy,
            options,
            startup_path: startup_path.into(),
        }
    }

    pub fn policy(&self) -> &RunPolicy {
        &self.policy
    }

    pub fn is_running(&self) -> bool {
        self.policy.is_running()
    }

    /// Called once before any event is processed: performs the run-at-start
    /// execution if enabled.
    pub fn startup(&mut self, now: SystemTime) -> CoreStep {
        if !self.policy.startup(now) {
            return CoreStep::idle();
        }
        info!("running command at start");
        let job = self.job_for(ChangeEvent::startup(&self.startup_path));
        CoreStep::continue_with(vec![CoreCommand::Execute(job)])
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent, now: SystemTime) -> CoreStep {
        match event {
            RuntimeEvent::FileChanged(change) => self.handle_change(change, now),
            RuntimeEvent::TransportError(msg) => {
                warn!(error = %msg, "file watch error");
                CoreStep::idle()
            }
            RuntimeEvent::CommandCompleted(report) => self.handle_completion(report, now),
            RuntimeEvent::SourceClosed => {
                info!("event source closed");
                CoreStep::exit(ExitReason::SourceClosed)
            }
            RuntimeEvent::ShutdownRequested => CoreStep::exit(ExitReason::Signal),
        }
    }

    fn handle_change(&mut self, change: ChangeEvent, now: SystemTime) -> CoreStep {
        notify_hook(&change);

        if self.dispatch.action_for(change.kind) == DispatchAction::NotifyOnly {
            return CoreStep::idle();
        }

        if !self.matcher.is_interested(&change.path) {
            debug!(path = ?change.path, "not interested");
            return CoreStep::idle();
        }

        match self.policy.admit(&change, now) {
            Decision::RunNow => {
                let job = self.job_for(change);
                CoreStep::continue_with(vec![CoreCommand::Execute(job)])
            }
            Decision::Deferred { coalesced } => {
                debug!(path = ?change.path, coalesced, "command running; follow-up run scheduled");
                CoreStep::idle()
            }
            Decision::Dropped(reason) => {
                debug!(path = ?change.path, ?reason, "event dropped by run policy");
                CoreStep::idle()
            }
        }
    }

    fn handle_completion(&mut self, report: RunReport, now: SystemTime) -> CoreStep {
        debug!(status = %report.status, elapsed = ?report.elapsed, "command completed");
        match self.policy.complete(now) {
            Some(next) => {
                let job = self.job_for(next);
                CoreStep::continue_with(vec![CoreCommand::Execute(job)])
            }
            None => CoreStep::idle(),
        }
    }

    fn job_for(&self, trigger: ChangeEvent) -> RunJob {
        RunJob {
            command: self.options.command.clone(),
            env: build_env(&trigger),
            quiet: self.options.quiet,
            verbosity: self.options.verbosity,
            timeout: self.options.timeout,
            trigger,
        }
    }
}

/// Hook every raw change kind passes through, whether or not it runs the
/// command.
fn notify_hook(change: &ChangeEvent) {
    debug!(kind = change.kind.label(), path = ?change.path, "file event");
}
