//! Rules deciding whether an order may be queued or dispatched.

use std::fmt;

use returnsync_domain::{HostOrder, OrderSyncSettings, SyncWorkflow};

/// Why an order was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The host has not persisted the order yet.
    MissingOrderId,
    OrderCanceled,
    /// Cancel dispatch for an order the host no longer shows as canceled.
    OrderNotCanceled,
    NoLineItems,
    StoreSyncDisabled,
    /// The queue references an order the host no longer returns.
    OrderNotFound,
}

impl SkipReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingOrderId => "missing_order_id",
            Self::OrderCanceled => "order_canceled",
            Self::OrderNotCanceled => "order_not_canceled",
            Self::NoLineItems => "no_line_items",
            Self::StoreSyncDisabled => "store_sync_disabled",
            Self::OrderNotFound => "order_not_found",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy applied when an order is created or backfilled.
pub fn check_enqueue(order: &HostOrder, settings: &OrderSyncSettings) -> Result<(), SkipReason> {
    if order.id.is_none() {
        return Err(SkipReason::MissingOrderId);
    }
    if order.is_canceled() {
        return Err(SkipReason::OrderCanceled);
    }
    if order.items.is_empty() {
        return Err(SkipReason::NoLineItems);
    }
    if !settings.sync_enabled_for(order.store_id) {
        return Err(SkipReason::StoreSyncDisabled);
    }
    Ok(())
}

/// Re-validation performed right before a dispatch.
pub fn check_dispatch(
    workflow: SyncWorkflow,
    order: &HostOrder,
    settings: &OrderSyncSettings,
) -> Result<(), SkipReason> {
    match workflow {
        SyncWorkflow::Push | SyncWorkflow::Retry | SyncWorkflow::Update => {
            if order.is_canceled() {
                return Err(SkipReason::OrderCanceled);
            }
        }
        SyncWorkflow::Cancel => {
            if !order.is_canceled() {
                return Err(SkipReason::OrderNotCanceled);
            }
        }
    }

    if settings.sync_enabled_for(order.store_id) {
        Ok(())
    } else {
        Err(SkipReason::StoreSyncDisabled)
    }
}
