// src/exec/runner.rs

//! Command runner: one shell invocation per `RunJob`.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::{Duration, Instant};

use anyhow::Context;
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::engine::{RunReport, RunStatus, RuntimeEvent};
use crate::errors::{Result, WhenChangedError};
use crate::exec::RunJob;
use crate::types::ChangeEvent;

/// Run `command` through the platform shell with `env` layered over the
/// inherited environment and wait for it to finish.
///
/// - `quiet` sends the child's stdout and stderr to the null device;
///   otherwise both are inherited.
/// - With a `timeout`, a child that runs longer is killed and
///   [`RunStatus::TimedOut`] is returned.
///
/// A non-zero exit is a normal `Ok(RunStatus::Failed(_))`; only failing to
/// spawn or wait on the process is an error.
pub async fn execute(
    command: &str,
    env: &BTreeMap<String, String>,
    quiet: bool,
    timeout: Option<Duration>,
) -> Result<RunStatus> {
    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    };

    cmd.envs(env).kill_on_drop(true);
    if quiet {
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
    } else {
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    }

    let mut child = cmd
        .spawn()
        .map_err(|e| WhenChangedError::Command(format!("spawning '{command}': {e}")))?;

    let status = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                warn!(cmd = %command, ?limit, "command timed out; killing it");
                if let Err(e) = child.kill().await {
                    warn!(cmd = %command, error = %e, "failed to kill timed-out command");
                }
                return Ok(RunStatus::TimedOut);
            }
        },
        None => child.wait().await,
    }
    .with_context(|| format!("waiting for '{command}'"))?;

    Ok(if status.success() {
        RunStatus::Success
    } else {
        RunStatus::Failed(status.code().unwrap_or(-1))
    })
}

/// Execute one job end to end: banners, the command itself and the
/// `CommandCompleted` report back to the runtime.
///
/// Always reports completion, whatever happened to the process, so the run
/// policy returns to idle.
pub async fn run_job(job: RunJob, runtime_tx: mpsc::Sender<RuntimeEvent>) {
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    if let Some(banner) = start_banner(job.verbosity, &job.trigger, &job.command, &now) {
        println!("{banner}");
    }

    info!(
        cmd = %job.command,
        path = ?job.trigger.path,
        kind = job.trigger.kind.label(),
        "starting command"
    );

    let started = Instant::now();
    let status = match execute(&job.command, &job.env, job.quiet, job.timeout).await {
        Ok(status) => status,
        Err(err) => {
            error!(cmd = %job.command, error = %err, "command execution error");
            RunStatus::SpawnFailed(err.to_string())
        }
    };
    let elapsed = started.elapsed();

    match &status {
        RunStatus::Success => info!(cmd = %job.command, ?elapsed, "command finished"),
        RunStatus::Failed(code) => {
            warn!(cmd = %job.command, exit_code = code, ?elapsed, "command failed")
        }
        RunStatus::TimedOut => warn!(cmd = %job.command, ?elapsed, "command timed out"),
        RunStatus::SpawnFailed(_) => {}
    }

    if let Some(banner) = finish_banner(job.verbosity, &job.command, &status, elapsed) {
        println!("{banner}");
    }

    let report = RunReport { status, elapsed };
    if runtime_tx
        .send(RuntimeEvent::CommandCompleted(report))
        .await
        .is_err()
    {
        debug!("runtime gone before command completion could be reported");
    }
}

/// Banner printed before a run. Each level adds to the previous one:
/// 1 names the file, 2 adds the time, 3 adds the command line.
pub fn start_banner(
    verbosity: u8,
    trigger: &ChangeEvent,
    command: &str,
    at: &str,
) -> Option<String> {
    if verbosity == 0 {
        return None;
    }
    let mut msg = format!("'{}'", trigger.path.display());
    if verbosity > 1 {
        if trigger.is_startup() {
            msg.push_str(&format!(" watched since {at}"));
        } else {
            msg.push_str(&format!(" changed at {at}"));
        }
    }
    if verbosity > 2 {
        msg.push_str(&format!(", running '{command}'"));
    }
    Some(format!("==> {msg} <=="))
}

/// Banner printed after a run, verbosity 3 and up.
pub fn finish_banner(
    verbosity: u8,
    command: &str,
    status: &RunStatus,
    elapsed: Duration,
) -> Option<String> {
    if verbosity < 3 {
        return None;
    }
    Some(format!(
        "==> '{command}' exited with {status} after {:.2}s <==",
        elapsed.as_secs_f64()
    ))
}
