// tests/runtime_fake_executor.rs

use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use when_changed::engine::{ExitReason, Runtime, RuntimeEvent};
use when_changed::exec::{RunJob, FILE_VAR};
use when_changed::types::{ChangeEvent, ChangeKind};
use when_changed_test_utils::builders::CoreBuilder;
use when_changed_test_utils::fake_executor::{completed, FakeExecutor};
use when_changed_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn modified(path: &str) -> RuntimeEvent {
    RuntimeEvent::FileChanged(ChangeEvent::new(path, ChangeKind::Modified))
}

fn executed_files(executed: &Arc<Mutex<Vec<RunJob>>>) -> Vec<String> {
    executed
        .lock()
        .unwrap()
        .iter()
        .map(|job| job.env.get(FILE_VAR).cloned().unwrap_or_default())
        .collect()
}

#[tokio::test]
async fn runtime_runs_command_for_interesting_changes() -> TestResult {
    init_tracing();

    let core = CoreBuilder::new("make").watch_dir("/tmp/proj").build();
    let (tx, rx) = mpsc::channel(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&executed));
    let runtime = Runtime::new(core, rx, executor, Duration::ZERO);

    let handle = tokio::spawn(runtime.run());

    tx.send(modified("/tmp/proj/a.txt")).await?;
    tx.send(modified("/tmp/proj/sub/ignored.txt")).await?;
    tx.send(RuntimeEvent::SourceClosed).await?;

    let reason = timeout(Duration::from_secs(5), handle).await???;
    assert_eq!(reason, ExitReason::SourceClosed);
    assert_eq!(executed_files(&executed), vec!["/tmp/proj/a.txt"]);
    Ok(())
}

#[tokio::test]
async fn run_at_start_happens_before_first_event() -> TestResult {
    init_tracing();

    let core = CoreBuilder::new("make")
        .watch_dir("/tmp/proj")
        .run_at_start(true)
        .build();
    let (tx, rx) = mpsc::channel(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&executed));
    let runtime = Runtime::new(core, rx, executor, Duration::ZERO);

    let handle = tokio::spawn(runtime.run());
    // Give the startup completion a chance to be processed first.
    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(modified("/tmp/proj/a.txt")).await?;
    tx.send(RuntimeEvent::SourceClosed).await?;

    timeout(Duration::from_secs(5), handle).await???;

    let jobs = executed.lock().unwrap().clone();
    assert_eq!(jobs.len(), 2);
    assert!(jobs[0].trigger.is_startup());
    assert_eq!(jobs[1].env[FILE_VAR], "/tmp/proj/a.txt");
    Ok(())
}

#[tokio::test]
async fn events_during_a_run_coalesce_into_one_follow_up() -> TestResult {
    init_tracing();

    let core = CoreBuilder::new("make").watch_dir("/tmp/proj").build();
    let (tx, rx) = mpsc::channel(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    // Completions are sent by the test itself.
    let executor = FakeExecutor::manual(Arc::clone(&executed));
    let runtime = Runtime::new(core, rx, executor, Duration::ZERO);

    let handle = tokio::spawn(runtime.run());

    tx.send(modified("/tmp/proj/a.txt")).await?;
    tx.send(modified("/tmp/proj/b.txt")).await?;
    tx.send(modified("/tmp/proj/c.txt")).await?;
    tx.send(completed()).await?;
    tx.send(completed()).await?;
    tx.send(RuntimeEvent::SourceClosed).await?;

    timeout(Duration::from_secs(5), handle).await???;
    assert_eq!(
        executed_files(&executed),
        vec!["/tmp/proj/a.txt", "/tmp/proj/c.txt"]
    );
    Ok(())
}

#[tokio::test]
async fn run_once_ignores_events_during_a_run() -> TestResult {
    init_tracing();

    let core = CoreBuilder::new("make")
        .watch_dir("/tmp/proj")
        .run_once(true)
        .build();
    let (tx, rx) = mpsc::channel(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::manual(Arc::clone(&executed));
    let runtime = Runtime::new(core, rx, executor, Duration::ZERO);

    let handle = tokio::spawn(runtime.run());

    tx.send(modified("/tmp/proj/a.txt")).await?;
    tx.send(modified("/tmp/proj/b.txt")).await?;
    tx.send(completed()).await?;
    tx.send(RuntimeEvent::SourceClosed).await?;

    timeout(Duration::from_secs(5), handle).await???;
    assert_eq!(executed_files(&executed), vec!["/tmp/proj/a.txt"]);
    Ok(())
}

#[tokio::test]
async fn transport_errors_do_not_stop_the_runtime() -> TestResult {
    init_tracing();

    let core = CoreBuilder::new("make").watch_dir("/tmp/proj").build();
    let (tx, rx) = mpsc::channel(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&executed));
    let runtime = Runtime::new(core, rx, executor, Duration::ZERO);

    let handle = tokio::spawn(runtime.run());

    tx.send(RuntimeEvent::TransportError("inotify queue overflow".into()))
        .await?;
    tx.send(modified("/tmp/proj/a.txt")).await?;
    tx.send(RuntimeEvent::SourceClosed).await?;

    timeout(Duration::from_secs(5), handle).await???;
    assert_eq!(executed.lock().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn shutdown_request_stops_runtime_with_signal_reason() -> TestResult {
    init_tracing();

    let core = CoreBuilder::new("make").watch_dir("/tmp/proj").build();
    let (tx, rx) = mpsc::channel(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&executed));
    let runtime = Runtime::new(core, rx, executor, Duration::ZERO);

    let handle = tokio::spawn(runtime.run());

    // Simulate a signal arriving while the watcher is idle.
    let shutdown_tx = tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _ = shutdown_tx.send(RuntimeEvent::ShutdownRequested).await;
    });

    let reason = timeout(Duration::from_secs(5), handle).await???;
    assert_eq!(reason, ExitReason::Signal);
    assert!(executed.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn runtime_exits_when_every_sender_is_gone() -> TestResult {
    init_tracing();

    let core = CoreBuilder::new("make").watch_dir("/tmp/proj").build();
    let (tx, rx) = mpsc::channel(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::manual(Arc::clone(&executed));
    let runtime = Runtime::new(core, rx, executor, Duration::ZERO);

    drop(tx);
    let reason = with_timeout(runtime.run()).await?;
    assert_eq!(reason, ExitReason::ChannelClosed);
    Ok(())
}

#[tokio::test]
async fn shutdown_grace_waits_for_the_running_command() -> TestResult {
    init_tracing();

    let core = CoreBuilder::new("make").watch_dir("/tmp/proj").build();
    let (tx, rx) = mpsc::channel(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::manual(Arc::clone(&executed));
    let runtime = Runtime::new(core, rx, executor, Duration::from_secs(5));

    let handle = tokio::spawn(runtime.run());

    tx.send(modified("/tmp/proj/a.txt")).await?;
    tx.send(RuntimeEvent::ShutdownRequested).await?;

    // The runtime must still be waiting for the in-flight run.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!handle.is_finished());

    tx.send(completed()).await?;
    let reason = timeout(Duration::from_secs(5), handle).await???;
    assert_eq!(reason, ExitReason::Signal);
    Ok(())
}

#[tokio::test]
async fn zero_grace_exits_without_waiting() -> TestResult {
    init_tracing();

    let core = CoreBuilder::new("make").watch_dir("/tmp/proj").build();
    let (tx, rx) = mpsc::channel(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::manual(Arc::clone(&executed));
    let runtime = Runtime::new(core, rx, executor, Duration::ZERO);

    let handle = tokio::spawn(runtime.run());

    tx.send(modified("/tmp/proj/a.txt")).await?;
    tx.send(RuntimeEvent::ShutdownRequested).await?;

    let reason = timeout(Duration::from_secs(5), handle).await???;
    assert_eq!(reason, ExitReason::Signal);
    assert_eq!(executed.lock().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn shutdown_signal_jumps_ahead_of_queued_events() -> TestResult {
    init_tracing();

    let core = CoreBuilder::new("make").watch_dir("/tmp/proj").build();
    let (tx, rx) = mpsc::channel(256);
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::manual(Arc::clone(&executed));
    let runtime = Runtime::new(core, rx, executor, Duration::ZERO).with_shutdown(shutdown_rx);

    // A backlog of file events is already queued when the signal fires.
    for i in 0..200 {
        tx.send(modified(&format!("/tmp/proj/f{i}.txt"))).await?;
    }
    let _ = shutdown_tx.send(());

    let reason = with_timeout(runtime.run()).await?;
    assert_eq!(reason, ExitReason::Signal);
    assert!(executed.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn dropped_shutdown_sender_does_not_stop_the_runtime() -> TestResult {
    init_tracing();

    let core = CoreBuilder::new("make").watch_dir("/tmp/proj").build();
    let (tx, rx) = mpsc::channel(16);
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&executed));
    let runtime = Runtime::new(core, rx, executor, Duration::ZERO).with_shutdown(shutdown_rx);

    drop(shutdown_tx);
    tx.send(modified("/tmp/proj/a.txt")).await?;
    tx.send(RuntimeEvent::SourceClosed).await?;

    let reason = with_timeout(runtime.run()).await?;
    assert_eq!(reason, ExitReason::SourceClosed);
    assert_eq!(executed_files(&executed), vec!["/tmp/proj/a.txt"]);
    Ok(())
}
