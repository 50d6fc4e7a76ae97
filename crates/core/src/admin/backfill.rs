//! Backfill of historical orders into the sync queue.

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use returnsync_domain::{OrderSyncSettings, QueueStatus, Result};
use tracing::{debug, info, instrument};

use crate::host::ports::OrderRepository;
use crate::queue::ports::OrderQueueRepository;
use crate::sync::eligibility;

/// Counts reported back to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillReport {
    pub queued: u32,
    pub already_queued: u32,
    pub skipped: u32,
    /// Cutoff date when the backfill was limited.
    pub created_after: Option<NaiveDate>,
}

impl BackfillReport {
    /// Admin-facing summary line.
    pub fn message(&self) -> String {
        let limit = self
            .created_after
            .map(|date| format!(" (limited to orders created after {})", date.format("%Y-%m-%d")))
            .unwrap_or_default();
        format!("{} order(s) were queued to sync{limit}.", self.queued)
    }
}

/// Queues historical orders that were never queued.
pub struct BackfillService {
    orders: Arc<dyn OrderRepository>,
    queue: Arc<dyn OrderQueueRepository>,
    settings: OrderSyncSettings,
}

impl BackfillService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        queue: Arc<dyn OrderQueueRepository>,
        settings: OrderSyncSettings,
    ) -> Self {
        Self { orders, queue, settings }
    }

    /// Queue every eligible order, optionally only those created within the
    /// last `day_limit` days counted from `today`.
    #[instrument(skip(self))]
    pub async fn backfill(&self, day_limit: Option<u32>, today: NaiveDate) -> Result<BackfillReport> {
        let created_after = day_limit
            .filter(|days| *days > 0)
            .and_then(|days| today.checked_sub_days(Days::new(u64::from(days))));
        let cutoff: Option<DateTime<Utc>> =
            created_after.and_then(|date| date.and_hms_opt(0, 0, 0)).map(|dt| dt.and_utc());

        let candidates = self.orders.list_backfill_candidates(cutoff).await?;
        let mut report = BackfillReport { queued: 0, already_queued: 0, skipped: 0, created_after };

        for order in &candidates {
            let order_id = match eligibility::check_enqueue(order, &self.settings) {
                Ok(()) => order.id,
                Err(reason) => {
                    debug!(increment_id = %order.increment_id, reason = %reason, "backfill skipped order");
                    None
                }
            };
            let Some(order_id) = order_id else {
                report.skipped = report.skipped.saturating_add(1);
                continue;
            };

            let inserted = self.queue.insert_if_absent(order_id, QueueStatus::Pending).await?;
            if inserted.created {
                report.queued = report.queued.saturating_add(1);
            } else {
                report.already_queued = report.already_queued.saturating_add(1);
            }
        }

        info!(
            queued = report.queued,
            already_queued = report.already_queued,
            skipped = report.skipped,
            "backfill finished"
        );
        Ok(report)
    }
}
