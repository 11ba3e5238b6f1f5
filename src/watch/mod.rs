// src/watch/mod.rs

//! File watching and change filtering.
//!
//! This module is responsible for:
//! - Resolving watch targets and planning directory registrations.
//! - Compiling the exclusion rules (built-in regexes + user globs).
//! - Deciding which changed paths are interesting (`PathMatcher`).
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//!
//! It does **not** know about run policy or command execution; it only turns
//! filesystem notifications into `RuntimeEvent`s.

pub mod matcher;
pub mod path_utils;
pub mod patterns;
pub mod targets;
pub mod watcher;

pub use matcher::PathMatcher;
pub use patterns::{ExcludeRuleSet, BUILTIN_EXCLUDES};
pub use targets::{plan_registrations, resolve_targets, TargetKind, WatchTarget};
pub use watcher::{
    classify, coalesce, settle_batch, spawn_watcher, IntakeSettings, WatcherHandle, DEFAULT_SETTLE,
};
