// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of spawning processes
//! itself. This makes it easy to swap in a fake executor in tests while
//! keeping the production implementation in [`runner`](super::runner).
//!
//! - `RealExecutorBackend` is the default implementation. It starts every
//!   job on its own Tokio task so the runtime loop keeps draining events
//!   while the command runs.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which jobs were started and directly emits `CommandCompleted` events.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tracing::debug;

use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::exec::runner::run_job;
use crate::exec::RunJob;

/// Trait abstracting how a run is executed.
///
/// Implementations must eventually send exactly one
/// `RuntimeEvent::CommandCompleted` per job, and must not wait for the
/// command itself before returning.
pub trait ExecutorBackend: Send {
    fn execute(&mut self, job: RunJob) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Real executor backend used in production.
pub struct RealExecutorBackend {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl RealExecutorBackend {
    /// Create a new real executor backend, wiring it to the given runtime
    /// event sender.
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self { runtime_tx }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn execute(&mut self, job: RunJob) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the spawned task doesn't borrow `self`.
        let tx = self.runtime_tx.clone();

        Box::pin(async move {
            debug!(cmd = %job.command, "handing job to a runner task");
            tokio::spawn(run_job(job, tx));
            Ok(())
        })
    }
}
