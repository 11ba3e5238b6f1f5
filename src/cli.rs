// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::TriggerKind;

const AFTER_HELP: &str = "\
Environment variables:

  - WHEN_CHANGED_EVENT: reflects the current event type that occurs.
      Could be either: file_created, file_modified, file_moved, file_deleted
  - WHEN_CHANGED_FILE: provides the full path of the file that has generated the event.";

/// Command-line arguments for `when-changed`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "when-changed",
    version,
    about = "Run a command when a file is changed.",
    override_usage = "when-changed [OPTIONS] FILE/DIR COMMAND...\n       \
                      when-changed [OPTIONS] FILE/DIR [FILE/DIR ...] -c COMMAND",
    after_help = AFTER_HELP,
    long_about = None
)]
pub struct CliArgs {
    /// Watch directories recursively.
    #[arg(short, long)]
    pub recursive: bool,

    /// Verbosity of the messages printed around each run (0-3).
    #[arg(short, long, value_name = "NUM")]
    pub verbose: Option<u8>,

    /// Don't re-run the command if files changed while it was running.
    #[arg(short = '1', long)]
    pub run_once: bool,

    /// Run the command immediately at start.
    #[arg(short = 's', long)]
    pub run_at_start: bool,

    /// Run the command quietly (discard its stdout and stderr).
    #[arg(short, long)]
    pub quiet: bool,

    /// Command to execute; every positional argument is then a watch target.
    #[arg(short, long, value_name = "STRING")]
    pub command: Option<String>,

    /// TOML file with default options.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Extra glob of paths to ignore (repeatable).
    #[arg(long = "exclude", value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Change kind that triggers a run (repeatable). Default: all but chmod.
    #[arg(long = "on", value_enum, value_name = "KIND")]
    pub trigger_on: Vec<TriggerKind>,

    /// Kill the command if it runs longer than this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// On Ctrl-C, wait up to this many seconds for a running command.
    #[arg(long, value_name = "SECS")]
    pub shutdown_grace: Option<u64>,

    /// Milliseconds to collect a burst of file events before acting (0 disables).
    #[arg(long, value_name = "MS")]
    pub settle_ms: Option<u64>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WHEN_CHANGED_LOG` or a level derived from `--verbose`
    /// will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// FILE/DIR targets followed by the command, unless `-c` is given.
    #[arg(
        value_name = "FILE/DIR",
        trailing_var_arg = true,
        allow_hyphen_values = true,
        num_args = 0..
    )]
    pub args: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Watch targets and command words recovered from the positional tail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub targets: Vec<String>,
    pub command: Option<String>,
}

impl CliArgs {
    /// Split the positional arguments into targets and command.
    ///
    /// - `-c CMD` given before the targets: every positional is a target.
    /// - a literal `-c`/`--command` inside the tail: everything before it is a
    ///   target, everything after it is the command.
    /// - otherwise the first positional is the single target and the rest is
    ///   the command line.
    pub fn invocation(&self) -> Invocation {
        if let Some(cmd) = &self.command {
            return Invocation {
                targets: self.args.clone(),
                command: Some(cmd.clone()),
            };
        }

        if let Some(idx) = self
            .args
            .iter()
            .position(|a| a == "-c" || a == "--command")
        {
            return Invocation {
                targets: self.args[..idx].to_vec(),
                command: join_words(&self.args[idx + 1..]),
            };
        }

        match self.args.split_first() {
            Some((target, rest)) => Invocation {
                targets: vec![target.clone()],
                command: join_words(rest),
            },
            None => Invocation::default(),
        }
    }
}

fn join_words(words: &[String]) -> Option<String> {
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

/// Render the help text, used when an invocation cannot be resolved.
pub fn usage() -> String {
    use clap::CommandFactory;
    CliArgs::command().render_help().to_string()
}
