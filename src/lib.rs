// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;
pub mod watch;

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

use crate::cli::CliArgs;
use crate::config::{load_from_path, resolve_options, Options};
use crate::engine::{
    CoreRuntime, DispatchTable, ExitReason, RunPolicy, Runtime, RuntimeEvent, RuntimeOptions,
};
use crate::errors::{Result, WhenChangedError};
use crate::exec::RealExecutorBackend;
use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::{
    plan_registrations, resolve_targets, spawn_watcher, ExcludeRuleSet, IntakeSettings,
    PathMatcher,
};

/// Resolve the final [`Options`] from the command line and the optional
/// config file it points at.
pub fn resolve(args: &CliArgs) -> Result<Options> {
    let file = match &args.config {
        Some(path) => Some(load_from_path(path)?),
        None => None,
    };
    resolve_options(args, file)
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - exclusion rules, targets and the path matcher
/// - the notify-backed event source and its intake task
/// - run policy / dispatch table / core runtime
/// - executor
/// - Ctrl-C / SIGTERM handling
///
/// Returns once the watcher stops: after a shutdown signal (having printed a
/// farewell line) or when the event source closes.
pub async fn run(options: Options) -> Result<ExitReason> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    let excludes = ExcludeRuleSet::new(&options.exclude)
        .map_err(|e| WhenChangedError::Config(format!("{e:#}")))?;
    let targets = resolve_targets(fs.as_ref(), &options.targets, options.recursive)?;
    let Some(first) = targets.first() else {
        return Err(WhenChangedError::Usage("no FILE/DIR to watch was given".to_string()));
    };
    let startup_path = first.path.clone();

    let matcher = PathMatcher::new(excludes.clone(), &targets, options.recursive);
    let dirs = plan_registrations(fs.as_ref(), &targets, &excludes);

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(1024);

    let watcher = spawn_watcher(
        dirs,
        IntakeSettings::new(Arc::clone(&fs), matcher.clone()).with_settle(options.settle),
        rt_tx.clone(),
    )?;
    info!(
        targets = ?targets.iter().map(|t| &t.path).collect::<Vec<_>>(),
        directories = watcher.registered().len(),
        recursive = options.recursive,
        "watching"
    );

    // Ctrl-C / SIGTERM → shutdown, on its own channel so it never queues
    // behind file events.
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(name) => info!(signal = name, "shutdown signal received"),
            Err(e) => {
                error!(error = %e, "failed to listen for shutdown signals");
                return;
            }
        }
        let _ = shutdown_tx.send(());
    });

    let core = CoreRuntime::new(
        matcher,
        DispatchTable::new(&options.trigger_on),
        RunPolicy::new(options.run_once, options.run_at_start),
        RuntimeOptions::from_options(&options),
        startup_path,
    );

    let executor = RealExecutorBackend::new(rt_tx);
    let runtime =
        Runtime::new(core, rt_rx, executor, options.shutdown_grace).with_shutdown(shutdown_rx);
    let reason = runtime.run().await?;

    watcher.close();
    if reason == ExitReason::Signal {
        println!("\r- Stopping when-changed, bye!");
    }
    Ok(reason)
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.map(|_| "interrupt"),
        _ = term.recv() => Ok("terminate"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|_| "interrupt")
}
