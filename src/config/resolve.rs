// src/config/resolve.rs

use std::collections::BTreeSet;
use std::time::Duration;

use crate::cli::CliArgs;
use crate::config::model::{Options, RawConfigFile};
use crate::errors::{Result, WhenChangedError};
use crate::types::TriggerKind;
use crate::watch::{ExcludeRuleSet, DEFAULT_SETTLE};

/// Merge the command line over an optional config file and validate.
///
/// - Scalar values given on the command line win over the file.
/// - Boolean flags are OR-ed: a flag can only switch a behaviour on.
/// - Targets from the command line replace the file's `paths`; exclusion
///   globs from both sources are concatenated.
pub fn resolve_options(args: &CliArgs, file: Option<RawConfigFile>) -> Result<Options> {
    let file = file.unwrap_or_default();
    let invocation = args.invocation();

    let targets = if invocation.targets.is_empty() {
        file.watch.paths.clone()
    } else {
        invocation.targets
    };

    let command = invocation
        .command
        .or(file.run.command.clone())
        .map(|c| c.trim().to_string())
        .unwrap_or_default();

    let mut exclude = file.watch.exclude.clone();
    exclude.extend(args.exclude.iter().cloned());

    let trigger_on: BTreeSet<TriggerKind> = if !args.trigger_on.is_empty() {
        args.trigger_on.iter().copied().collect()
    } else if let Some(list) = &file.run.trigger_on {
        list.iter().copied().collect()
    } else {
        TriggerKind::DEFAULTS.into_iter().collect()
    };

    let timeout_secs = args.timeout.or(file.run.timeout_secs);
    let grace_secs = args.shutdown_grace.or(file.shutdown.grace_secs).unwrap_or(0);
    let settle = args
        .settle_ms
        .or(file.watch.settle_ms)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_SETTLE);

    let options = Options {
        targets,
        recursive: args.recursive || file.watch.recursive,
        verbosity: args.verbose.or(file.run.verbose).unwrap_or(0),
        run_once: args.run_once || file.run.run_once,
        run_at_start: args.run_at_start || file.run.run_at_start,
        quiet: args.quiet || file.run.quiet,
        command,
        exclude,
        trigger_on,
        timeout: timeout_secs.map(Duration::from_secs),
        shutdown_grace: Duration::from_secs(grace_secs),
        settle,
    };

    validate_options(&options, timeout_secs)?;
    Ok(options)
}

fn validate_options(options: &Options, timeout_secs: Option<u64>) -> Result<()> {
    if options.targets.is_empty() {
        return Err(WhenChangedError::Usage(
            "no FILE/DIR to watch was given".to_string(),
        ));
    }
    if options.command.is_empty() {
        return Err(WhenChangedError::Usage("no COMMAND was given".to_string()));
    }
    if timeout_secs == Some(0) {
        return Err(WhenChangedError::Config(
            "timeout must be >= 1 second (got 0)".to_string(),
        ));
    }
    if let Err(e) = ExcludeRuleSet::new(&options.exclude) {
        return Err(WhenChangedError::Config(format!("{e:#}")));
    }
    if options.trigger_on.is_empty() {
        return Err(WhenChangedError::Config(
            "[run].trigger_on must name at least one change kind".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::config::model::{RunSection, ShutdownSection, WatchSection};

    fn args(argv: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn cli_only_uses_defaults() {
        let opts = resolve_options(&args(&["when-changed", "src", "make"]), None).unwrap();
        assert_eq!(opts, Options::new(vec!["src".into()], "make"));
    }

    #[test]
    fn file_fills_what_cli_leaves_out() {
        let file = RawConfigFile {
            watch: WatchSection {
                paths: vec!["lib".into()],
                recursive: true,
                exclude: vec!["*.log".into()],
                settle_ms: Some(200),
            },
            run: RunSection {
                command: Some("cargo test".into()),
                verbose: Some(2),
                trigger_on: Some(vec![TriggerKind::Modified]),
                timeout_secs: Some(30),
                ..RunSection::default()
            },
            shutdown: ShutdownSection { grace_secs: Some(3) },
        };

        let argv = ["when-changed", "-q", "--exclude", "*.tmp"];
        let opts = resolve_options(&args(&argv), Some(file)).unwrap();
        assert_eq!(opts.targets, vec!["lib"]);
        assert_eq!(opts.command, "cargo test");
        assert!(opts.recursive);
        assert!(opts.quiet);
        assert_eq!(opts.verbosity, 2);
        assert_eq!(opts.exclude, vec!["*.log", "*.tmp"]);
        assert_eq!(opts.trigger_on.len(), 1);
        assert_eq!(opts.timeout, Some(Duration::from_secs(30)));
        assert_eq!(opts.shutdown_grace, Duration::from_secs(3));
        assert_eq!(opts.settle, Duration::from_millis(200));
    }

    #[test]
    fn cli_values_win_over_file() {
        let file = RawConfigFile {
            run: RunSection {
                command: Some("from-file".into()),
                verbose: Some(3),
                ..RunSection::default()
            },
            ..RawConfigFile::default()
        };
        let opts =
            resolve_options(&args(&["when-changed", "-v", "1", "x", "from-cli"]), Some(file))
                .unwrap();
        assert_eq!(opts.command, "from-cli");
        assert_eq!(opts.verbosity, 1);
    }

    #[test]
    fn missing_targets_or_command_is_usage_error() {
        let err = resolve_options(&args(&["when-changed"]), None).unwrap_err();
        assert!(err.is_usage());

        let err = resolve_options(&args(&["when-changed", "src"]), None).unwrap_err();
        assert!(err.is_usage());
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = resolve_options(&args(&["when-changed", "--timeout", "0", "a", "b"]), None)
            .unwrap_err();
        assert!(matches!(err, WhenChangedError::Config(_)));
    }

    #[test]
    fn empty_trigger_list_in_file_is_rejected() {
        let file = RawConfigFile {
            run: RunSection {
                trigger_on: Some(Vec::new()),
                ..RunSection::default()
            },
            ..RawConfigFile::default()
        };
        let err = resolve_options(&args(&["when-changed", "a", "b"]), Some(file)).unwrap_err();
        assert!(matches!(err, WhenChangedError::Config(_)));
    }

    #[test]
    fn invalid_exclude_glob_is_a_config_error() {
        let err = resolve_options(&args(&["when-changed", "--exclude", "a[", "src", "make"]), None)
            .unwrap_err();
        assert!(matches!(err, WhenChangedError::Config(_)));
        assert_eq!(err.exit_code(), 1);
    }
}
