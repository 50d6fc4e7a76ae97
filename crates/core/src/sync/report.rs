//! Per-run counters.

use returnsync_domain::SyncWorkflow;
use serde::Serialize;

/// Outcome of one scheduled run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncRunReport {
    pub workflow: SyncWorkflow,
    /// Entries returned by the batch query.
    pub selected: usize,
    /// Entries moved to the workflow's success status.
    pub synced: u32,
    /// Dispatch attempts that failed and bumped the fail count.
    pub failed: u32,
    /// Entries left untouched because the order is no longer eligible.
    pub skipped: u32,
    /// Entries another writer changed while this run held them.
    pub conflicts: u32,
}

impl SyncRunReport {
    pub const fn new(workflow: SyncWorkflow) -> Self {
        Self { workflow, selected: 0, synced: 0, failed: 0, skipped: 0, conflicts: 0 }
    }

    pub const fn attempted(&self) -> u32 {
        self.synced.saturating_add(self.failed)
    }
}
