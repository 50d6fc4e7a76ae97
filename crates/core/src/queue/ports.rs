//! Port interface for the durable order queue

use std::collections::BTreeMap;

use async_trait::async_trait;
use returnsync_domain::{BatchQuery, OrderId, QueueEntry, QueueInsert, QueueStatus, Result};

/// Durable store of queue entries, one per order.
#[async_trait]
pub trait OrderQueueRepository: Send + Sync {
    /// Insert an entry for `order_id` unless one exists.
    ///
    /// An existing entry is returned unmodified with `created == false`.
    async fn insert_if_absent(
        &self,
        order_id: OrderId,
        initial_status: QueueStatus,
    ) -> Result<QueueInsert>;

    /// Entries in `query.status`, least-failed first, then oldest first.
    async fn find_batch(&self, query: BatchQuery) -> Result<Vec<QueueEntry>>;

    /// Look up the entry for a host order.
    async fn find_by_order_id(&self, order_id: OrderId) -> Result<Option<QueueEntry>>;

    /// Reserve `entry` for dispatch.
    ///
    /// Succeeds only if the stored row still carries the status and version
    /// that were read; returns the reserved entry with its new version, or
    /// `None` if another writer got there first.
    async fn try_claim(&self, entry: &QueueEntry) -> Result<Option<QueueEntry>>;

    /// Persist status, fail count and external id of `entry`.
    ///
    /// Conditional on `entry.version`; a stale version yields
    /// `ReturnSyncError::Conflict`. Always stamps a new `updated_at`.
    async fn update(&self, entry: &QueueEntry) -> Result<QueueEntry>;

    /// Upsert the entry for `order_id` into `status` with a zero fail count.
    async fn requeue(&self, order_id: OrderId, status: QueueStatus) -> Result<QueueEntry>;

    /// Number of entries per status.
    async fn count_by_status(&self) -> Result<BTreeMap<QueueStatus, u64>>;
}
