// src/engine/policy.rs

//! Run policy: when may the command start?
//!
//! The policy is a single-writer state machine owned by the core runtime.
//! It never fails; it only decides.
//!
//! ```text
//!   Idle ──admit──▶ Running ──complete──▶ Idle
//!                     │  ▲                  │
//!       event arrives │  └── pending rerun ─┘ (run_once = false)
//!                     ▼
//!            drop (run_once) / remember one pending rerun
//! ```

use std::time::SystemTime;

use tracing::{debug, warn};

use crate::types::ChangeEvent;

/// Bookkeeping about command runs. Starts out as "never run".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    pub last_run_started_at: Option<SystemTime>,
    pub last_run_finished_at: Option<SystemTime>,
    pub is_running: bool,
    pub runs_started: u64,
}

/// Why an interesting event did not lead to a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// `run_once` is set and a command is in flight.
    Busy,
    /// `run_once` is set and the file was last modified before the previous
    /// run finished.
    Stale,
}

/// Outcome of offering an event to the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Start the command now; the policy is now `Running`.
    RunNow,
    /// A command is running; one follow-up run is scheduled. `coalesced` is
    /// true when a follow-up had already been requested and this event was
    /// folded into it.
    Deferred { coalesced: bool },
    Dropped(DropReason),
}

#[derive(Debug, Clone)]
pub struct RunPolicy {
    run_once: bool,
    run_at_start: bool,
    startup_done: bool,
    state: RunState,
    /// Latest event seen while running; replaces any earlier one.
    pending: Option<ChangeEvent>,
}

impl RunPolicy {
    pub fn new(run_once: bool, run_at_start: bool) -> Self {
        Self {
            run_once,
            run_at_start,
            startup_done: false,
            state: RunState::default(),
            pending: None,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    /// True when an (already interesting) event would start a run right now.
    pub fn should_run(&self, event: &ChangeEvent) -> bool {
        !self.state.is_running && !self.is_stale(event)
    }

    /// Authorise the run-at-start execution. Returns true at most once, and
    /// only when `run_at_start` is enabled.
    pub fn startup(&mut self, now: SystemTime) -> bool {
        if !self.run_at_start || self.startup_done || self.state.is_running {
            return false;
        }
        self.startup_done = true;
        self.start(now);
        true
    }

    /// Offer an interesting event to the policy.
    pub fn admit(&mut self, event: &ChangeEvent, now: SystemTime) -> Decision {
        if self.is_stale(event) {
            return Decision::Dropped(DropReason::Stale);
        }

        if !self.state.is_running {
            self.start(now);
            return Decision::RunNow;
        }

        if self.run_once {
            return Decision::Dropped(DropReason::Busy);
        }

        let coalesced = self.pending.replace(event.clone()).is_some();
        Decision::Deferred { coalesced }
    }

    /// The running command finished. Returns the event for the coalesced
    /// follow-up run, if one was requested; the policy is then `Running`
    /// again.
    pub fn complete(&mut self, now: SystemTime) -> Option<ChangeEvent> {
        if !self.state.is_running {
            warn!("completion reported while no command was running; ignoring");
            return None;
        }
        self.state.is_running = false;
        self.state.last_run_finished_at = Some(now);

        let next = self.pending.take()?;
        debug!(path = ?next.path, "starting coalesced follow-up run");
        self.start(now);
        Some(next)
    }

    fn start(&mut self, now: SystemTime) {
        self.state.is_running = true;
        self.state.last_run_started_at = Some(now);
        self.state.runs_started += 1;
    }

    fn is_stale(&self, event: &ChangeEvent) -> bool {
        if !self.run_once {
            return false;
        }
        match (event.modified_at, self.state.last_run_finished_at) {
            (Some(modified), Some(finished)) => modified < finished,
            _ => false,
        }
    }
}
