// src/logging.rs

//! Logging setup for `when-changed` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `WHEN_CHANGED_LOG` environment variable (e.g. "info", "debug")
//! 3. derived from `--verbose` (0 → warn, 1-2 → info, 3+ → debug)
//!
//! Logs are sent to STDERR so that stdout carries only the command's own
//! output and the verbosity banners.

use anyhow::Result;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>, verbosity: u8) -> Result<()> {
    let level = match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => std::env::var("WHEN_CHANGED_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or_else(|| level_from_verbosity(verbosity)),
    };

    fmt()
        .with_max_level(level)
        .with_target(level >= tracing::Level::DEBUG)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(())
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn level_from_verbosity(verbosity: u8) -> tracing::Level {
    match verbosity {
        0 => tracing::Level::WARN,
        1 | 2 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_from_verbosity(0), tracing::Level::WARN);
        assert_eq!(level_from_verbosity(2), tracing::Level::INFO);
        assert_eq!(level_from_verbosity(9), tracing::Level::DEBUG);
    }

    #[test]
    fn level_strings_are_case_insensitive() {
        assert_eq!(parse_level_str(" Debug "), Some(tracing::Level::DEBUG));
        assert_eq!(parse_level_str("loud"), None);
    }
}
