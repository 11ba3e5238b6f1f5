// src/config/mod.rs

//! Option resolution for when-changed.
//!
//! Responsibilities:
//! - Define the TOML-backed file model and the resolved [`Options`] (`model.rs`).
//! - Load an optional config file from disk (`loader.rs`).
//! - Merge CLI arguments over the file and validate the result (`resolve.rs`).

pub mod loader;
pub mod model;
pub mod resolve;

pub use loader::load_from_path;
pub use model::{Options, RawConfigFile, RunSection, ShutdownSection, WatchSection};
pub use resolve::resolve_options;
