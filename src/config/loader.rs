// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::RawConfigFile;
use crate::errors::Result;

/// Load a config file from a given path.
///
/// This only performs TOML deserialization; merging with the command line and
/// semantic validation happen in [`crate::config::resolve_options`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;
    debug!(?path, "loaded config file");

    Ok(config)
}
