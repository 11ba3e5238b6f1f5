// src/errors.rs

//! Crate-wide error type.
//!
//! Only startup-class errors (`Usage`, `Config`, `Startup`, `Watch`) ever
//! reach `main`; transport and command errors are recovered inside the
//! watch loop and surfaced through logging.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WhenChangedError {
    #[error("{0}")]
    Usage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Startup error: {0}")]
    Startup(String),

    #[error("cannot watch {path:?}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("Command error: {0}")]
    Command(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WhenChangedError {
    /// Process exit status for this error: 2 for invalid invocation, 1 for
    /// everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            WhenChangedError::Usage(_) => 2,
            _ => 1,
        }
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, WhenChangedError::Usage(_))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WhenChangedError>;
