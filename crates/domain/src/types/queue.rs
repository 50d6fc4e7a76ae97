//! Queue entry types and the sync state machine.
//!
//! Each order tracked for sync owns exactly one [`QueueEntry`]. A workflow
//! picks entries in its source status and moves each one to its success or
//! failure status after a dispatch attempt:
//!
//! | workflow | source    | success     | failure                 |
//! |----------|-----------|-------------|-------------------------|
//! | push     | pending   | synched     | failed (+1)             |
//! | retry    | failed    | synched     | failed (+1)             |
//! | cancel   | cancel    | cancelled   | cancel (+1)             |
//! | update   | update    | updated     | update (+1)             |

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::OrderId;

/// Queue entry status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Synched,
    Failed,
    Cancel,
    Cancelled,
    Update,
    Updated,
}

crate::impl_domain_status_conversions!(QueueStatus {
    Pending => "pending",
    Synched => "synched",
    Failed => "failed",
    Cancel => "cancel",
    Cancelled => "cancelled",
    Update => "update",
    Updated => "updated",
});

impl QueueStatus {
    /// All statuses in storage order.
    pub const ALL: [Self; 7] = [
        Self::Pending,
        Self::Synched,
        Self::Failed,
        Self::Cancel,
        Self::Cancelled,
        Self::Update,
        Self::Updated,
    ];

    /// Terminal success state of some workflow.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Synched | Self::Cancelled | Self::Updated)
    }

    /// Part of the cancel workflow (queued or done).
    pub const fn is_cancel_workflow(self) -> bool {
        matches!(self, Self::Cancel | Self::Cancelled)
    }
}

/// One of the four scheduled sync jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncWorkflow {
    /// First delivery of pending orders.
    Push,
    /// Redelivery of failed orders.
    Retry,
    /// Cancellation of previously delivered orders.
    Cancel,
    /// Delivery address updates.
    Update,
}

crate::impl_domain_status_conversions!(SyncWorkflow {
    Push => "push",
    Retry => "retry",
    Cancel => "cancel",
    Update => "update",
});

impl SyncWorkflow {
    pub const ALL: [Self; 4] = [Self::Push, Self::Retry, Self::Cancel, Self::Update];

    /// Status an entry must have to be picked by this workflow.
    pub const fn source_status(self) -> QueueStatus {
        match self {
            Self::Push => QueueStatus::Pending,
            Self::Retry => QueueStatus::Failed,
            Self::Cancel => QueueStatus::Cancel,
            Self::Update => QueueStatus::Update,
        }
    }

    pub const fn success_status(self) -> QueueStatus {
        match self {
            Self::Push | Self::Retry => QueueStatus::Synched,
            Self::Cancel => QueueStatus::Cancelled,
            Self::Update => QueueStatus::Updated,
        }
    }

    pub const fn failure_status(self) -> QueueStatus {
        match self {
            Self::Push | Self::Retry => QueueStatus::Failed,
            Self::Cancel => QueueStatus::Cancel,
            Self::Update => QueueStatus::Update,
        }
    }

    /// Whether the configured maximum fail count restricts batch selection.
    ///
    /// Pending entries have never failed, so the cap only matters for the
    /// retry loops.
    pub const fn honours_fail_limit(self) -> bool {
        !matches!(self, Self::Push)
    }
}

/// Queue entry tracking one order's sync lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: i64,
    pub order_id: OrderId,
    pub status: QueueStatus,
    pub fail_count: u32,
    /// Reference returned by the returns API, if it sent one.
    pub external_order_id: Option<String>,
    /// Optimistic lock token, bumped on every write.
    pub version: i64,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds, stamped by the store on every write.
    pub updated_at: i64,
}

impl QueueEntry {
    /// Apply a successful dispatch for `workflow`.
    pub fn record_success(&mut self, workflow: SyncWorkflow) {
        self.status = workflow.success_status();
    }

    /// Apply a failed dispatch for `workflow`.
    pub fn record_failure(&mut self, workflow: SyncWorkflow) {
        self.status = workflow.failure_status();
        self.fail_count = self.fail_count.saturating_add(1);
    }

    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.created_at).single()
    }

    pub fn updated_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.updated_at).single()
    }
}

/// Result of an insert-if-absent call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueInsert {
    pub entry: QueueEntry,
    /// False when the entry already existed and was returned untouched.
    pub created: bool,
}

/// Selection of a dispatch batch.
///
/// Entries come back ordered by ascending fail count, then ascending creation
/// time, so the least-retried and oldest entries go first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchQuery {
    pub status: QueueStatus,
    /// Upper bound (inclusive) on `fail_count`; `None` means unlimited.
    pub max_fail_count: Option<u32>,
    pub limit: usize,
}

impl BatchQuery {
    /// Batch for a scheduled run. A `max_fails` of zero means unlimited.
    pub const fn for_workflow(workflow: SyncWorkflow, batch_size: usize, max_fails: u32) -> Self {
        let max_fail_count =
            if workflow.honours_fail_limit() && max_fails > 0 { Some(max_fails) } else { None };
        Self { status: workflow.source_status(), max_fail_count, limit: batch_size }
    }

    /// Whether `entry` would be selected by this query, ignoring the limit.
    pub fn matches(&self, entry: &QueueEntry) -> bool {
        entry.status == self.status && self.max_fail_count.map_or(true, |max| entry.fail_count <= max)
    }
}
