//! Queue enqueuer
//!
//! Called by the host integration when orders are created, canceled or
//! changed. Translates each event into at most one queue write.

use std::sync::Arc;

use returnsync_domain::{HostOrder, OrderId, OrderSyncSettings, QueueEntry, QueueStatus, Result};
use tracing::{debug, info};

use super::ports::OrderQueueRepository;
use crate::sync::eligibility::{self, SkipReason};

/// What an enqueue call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// A new entry was inserted.
    Queued(QueueEntry),
    /// The order already had an entry; it was left untouched.
    AlreadyQueued(QueueEntry),
    /// An existing entry was moved into a new workflow cycle.
    Requeued(QueueEntry),
    Skipped(SkipReason),
}

impl EnqueueOutcome {
    pub const fn entry(&self) -> Option<&QueueEntry> {
        match self {
            Self::Queued(entry) | Self::AlreadyQueued(entry) | Self::Requeued(entry) => Some(entry),
            Self::Skipped(_) => None,
        }
    }
}

/// Event-driven writer of queue entries.
pub struct QueueEnqueuer {
    queue: Arc<dyn OrderQueueRepository>,
    settings: OrderSyncSettings,
}

impl QueueEnqueuer {
    pub fn new(queue: Arc<dyn OrderQueueRepository>, settings: OrderSyncSettings) -> Self {
        Self { queue, settings }
    }

    /// Queue a newly placed order for its first delivery.
    pub async fn on_order_created(&self, order: &HostOrder) -> Result<EnqueueOutcome> {
        let order_id = match admit(order, &self.settings) {
            Ok(order_id) => order_id,
            Err(reason) => {
                debug!(increment_id = %order.increment_id, reason = %reason, "order not queued");
                return Ok(EnqueueOutcome::Skipped(reason));
            }
        };

        let inserted = self.queue.insert_if_absent(order_id, QueueStatus::Pending).await?;
        if inserted.created {
            info!(order_id, sync_id = inserted.entry.id, "order queued for sync");
            Ok(EnqueueOutcome::Queued(inserted.entry))
        } else {
            Ok(EnqueueOutcome::AlreadyQueued(inserted.entry))
        }
    }

    /// Queue a cancellation. Overrides whatever state the entry was in.
    pub async fn on_order_canceled(&self, order_id: OrderId) -> Result<EnqueueOutcome> {
        let entry = self.queue.requeue(order_id, QueueStatus::Cancel).await?;
        info!(order_id, sync_id = entry.id, "order cancellation queued");
        Ok(EnqueueOutcome::Requeued(entry))
    }

    /// Queue an address update for an order the API already knows about.
    ///
    /// Orders not delivered yet stay where they are; their create payload
    /// will carry the new address. Cancel-workflow entries are never
    /// downgraded to an update.
    pub async fn on_order_updated(&self, order: &HostOrder) -> Result<EnqueueOutcome> {
        let order_id = match admit(order, &self.settings) {
            Ok(order_id) => order_id,
            Err(reason) => return Ok(EnqueueOutcome::Skipped(reason)),
        };

        match self.queue.find_by_order_id(order_id).await? {
            None => self.on_order_created(order).await,
            Some(entry)
                if matches!(
                    entry.status,
                    QueueStatus::Synched | QueueStatus::Updated | QueueStatus::Update
                ) =>
            {
                let entry = self.queue.requeue(order_id, QueueStatus::Update).await?;
                info!(order_id, sync_id = entry.id, "order update queued");
                Ok(EnqueueOutcome::Requeued(entry))
            }
            Some(entry) => Ok(EnqueueOutcome::AlreadyQueued(entry)),
        }
    }
}

fn admit(order: &HostOrder, settings: &OrderSyncSettings) -> std::result::Result<OrderId, SkipReason> {
    eligibility::check_enqueue(order, settings)?;
    order.id.ok_or(SkipReason::MissingOrderId)
}
