// src/engine/runtime.rs

use std::fmt;
use std::time::SystemTime;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::ExecutorBackend;

use super::core::{CoreRuntime, CoreStep};
use super::{CoreCommand, ExitReason, RuntimeEvent};

/// Drives the core runtime in response to `RuntimeEvent`s and delegates
/// actual command execution to an `ExecutorBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// dispatch semantics. The loop is the single serialization point for run
/// policy transitions: events are handled one at a time, in the order they
/// were delivered.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    shutdown_grace: std::time::Duration,
    /// Out-of-band stop request; checked before queued events.
    shutdown_rx: Option<oneshot::Receiver<()>>,
}

/// What the loop picked up next.
enum Next {
    Event(Option<RuntimeEvent>),
    Shutdown,
    /// The shutdown sender went away without firing.
    ShutdownGone,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
        shutdown_grace: std::time::Duration,
    ) -> Self {
        Self {
            core,
            event_rx,
            executor,
            shutdown_grace,
            shutdown_rx: None,
        }
    }

    /// Stop as soon as `shutdown_rx` fires, even with a backlog of queued
    /// file events.
    pub fn with_shutdown(mut self, shutdown_rx: oneshot::Receiver<()>) -> Self {
        self.shutdown_rx = Some(shutdown_rx);
        self
    }

    async fn next(&mut self) -> Next {
        let Some(shutdown) = self.shutdown_rx.as_mut() else {
            return Next::Event(self.event_rx.recv().await);
        };
        tokio::select! {
            biased;
            res = shutdown => match res {
                Ok(()) => Next::Shutdown,
                Err(_) => Next::ShutdownGone,
            },
            event = self.event_rx.recv() => Next::Event(event),
        }
    }

    /// Main event loop.
    ///
    /// - Performs the run-at-start execution (if enabled) before reading any
    ///   event.
    /// - Consumes `RuntimeEvent`s from `event_rx` and feeds them into the core.
    /// - Executes the commands returned by the core.
    /// - On exit, optionally waits for an in-flight command (shutdown grace).
    pub async fn run(mut self) -> Result<ExitReason> {
        info!("when-changed runtime started");

        let startup = self.core.startup(SystemTime::now());
        self.apply(startup).await?;

        let reason = loop {
            let event = match self.next().await {
                Next::Event(Some(e)) => e,
                Next::Event(None) => {
                    info!("runtime event channel closed; exiting");
                    break ExitReason::ChannelClosed;
                }
                Next::Shutdown => RuntimeEvent::ShutdownRequested,
                Next::ShutdownGone => {
                    debug!("shutdown listener gone");
                    self.shutdown_rx = None;
                    continue;
                }
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event, SystemTime::now());
            let keep_running = step.keep_running;
            let exit = self.apply(step).await?;

            if !keep_running {
                break exit.unwrap_or(ExitReason::ChannelClosed);
            }
        };

        self.wait_for_in_flight().await;
        info!(?reason, "runtime exiting");
        Ok(reason)
    }

    /// Execute the commands of one core step; returns the exit reason if the
    /// core asked to stop.
    async fn apply(&mut self, step: CoreStep) -> Result<Option<ExitReason>> {
        let mut exit = None;
        for command in step.commands {
            match command {
                CoreCommand::Execute(job) => {
                    debug!(cmd = %job.command, path = ?job.trigger.path, "dispatching run");
                    self.executor.execute(job).await?;
                }
                CoreCommand::Exit(reason) => exit = Some(reason),
            }
        }
        Ok(exit)
    }

    /// With a zero grace period the process exits at once and an in-flight
    /// command is left to finish (or die) on its own.
    async fn wait_for_in_flight(&mut self) {
        if !self.core.is_running() || self.shutdown_grace.is_zero() {
            return;
        }

        info!(grace = ?self.shutdown_grace, "waiting for the running command to finish");
        let rx = &mut self.event_rx;
        let wait = async {
            while let Some(event) = rx.recv().await {
                if let RuntimeEvent::CommandCompleted(report) = event {
                    return Some(report);
                }
            }
            None
        };

        match tokio::time::timeout(self.shutdown_grace, wait).await {
            Ok(Some(report)) => info!(status = %report.status, "command finished before exit"),
            Ok(None) => debug!("runtime channel closed while waiting for command"),
            Err(_) => warn!("shutdown grace period elapsed; command still running"),
        }
    }
}
