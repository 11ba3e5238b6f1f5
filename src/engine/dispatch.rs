// src/engine/dispatch.rs

//! Dispatch table: what each raw change kind does.
//!
//! Every kind reaches the notify hook. Whether it also enters the run
//! pipeline (matcher → policy → runner) is configurable through
//! `--on` / `[run].trigger_on`.

use std::collections::BTreeSet;

use crate::types::{ChangeKind, TriggerKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchAction {
    NotifyOnly,
    NotifyAndRun,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTable {
    run_on: BTreeSet<ChangeKind>,
}

impl DispatchTable {
    pub fn new(trigger_on: &BTreeSet<TriggerKind>) -> Self {
        Self {
            run_on: trigger_on.iter().map(|k| k.change_kind()).collect(),
        }
    }

    /// Only content modification triggers a run.
    pub fn modify_only() -> Self {
        Self {
            run_on: BTreeSet::from([ChangeKind::Modified]),
        }
    }

    /// The synthetic startup kind always runs; it is only ever produced when
    /// run-at-start is enabled.
    pub fn action_for(&self, kind: ChangeKind) -> DispatchAction {
        if kind == ChangeKind::Startup || self.run_on.contains(&kind) {
            DispatchAction::NotifyAndRun
        } else {
            DispatchAction::NotifyOnly
        }
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new(&TriggerKind::DEFAULTS.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_runs_on_mutations_but_not_chmod() {
        let table = DispatchTable::default();
        for kind in [
            ChangeKind::Created,
            ChangeKind::Modified,
            ChangeKind::Removed,
            ChangeKind::Renamed,
        ] {
            assert_eq!(table.action_for(kind), DispatchAction::NotifyAndRun);
        }
        assert_eq!(table.action_for(ChangeKind::ChmodChanged), DispatchAction::NotifyOnly);
    }

    #[test]
    fn modify_only_table_matches_base_design() {
        let table = DispatchTable::modify_only();
        assert_eq!(table.action_for(ChangeKind::Modified), DispatchAction::NotifyAndRun);
        assert_eq!(table.action_for(ChangeKind::Created), DispatchAction::NotifyOnly);
        assert_eq!(table.action_for(ChangeKind::Removed), DispatchAction::NotifyOnly);
        assert_eq!(table.action_for(ChangeKind::Startup), DispatchAction::NotifyAndRun);
    }

    #[test]
    fn chmod_can_be_opted_in() {
        let table = DispatchTable::new(&BTreeSet::from([TriggerKind::Chmod]));
        assert_eq!(table.action_for(ChangeKind::ChmodChanged), DispatchAction::NotifyAndRun);
        assert_eq!(table.action_for(ChangeKind::Modified), DispatchAction::NotifyOnly);
    }
}
