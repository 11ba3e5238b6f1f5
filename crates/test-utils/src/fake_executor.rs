use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use when_changed::engine::{RunReport, RunStatus, RuntimeEvent};
use when_changed::errors::Result;
use when_changed::exec::{ExecutorBackend, RunJob};

/// A fake executor that:
/// - records which jobs were "run"
/// - reports `CommandCompleted(Success)` for each job, either immediately
///   (`new`) or never (`manual`, the test sends completions itself).
pub struct FakeExecutor {
    runtime_tx: Option<mpsc::Sender<RuntimeEvent>>,
    executed: Arc<Mutex<Vec<RunJob>>>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Arc<Mutex<Vec<RunJob>>>) -> Self {
        Self {
            runtime_tx: Some(runtime_tx),
            executed,
        }
    }

    pub fn manual(executed: Arc<Mutex<Vec<RunJob>>>) -> Self {
        Self {
            runtime_tx: None,
            executed,
        }
    }
}

impl ExecutorBackend for FakeExecutor {
    fn execute(&mut self, job: RunJob) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);

        Box::pin(async move {
            executed.lock().unwrap().push(job);

            if let Some(tx) = tx {
                tx.send(RuntimeEvent::CommandCompleted(RunReport {
                    status: RunStatus::Success,
                    elapsed: Duration::ZERO,
                }))
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}

/// Completion event with a successful status.
pub fn completed() -> RuntimeEvent {
    RuntimeEvent::CommandCompleted(RunReport {
        status: RunStatus::Success,
        elapsed: Duration::ZERO,
    })
}
