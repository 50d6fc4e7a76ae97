//! Cron scheduling of the order sync workflows.
//!
//! The scheduler owns an explicit lifecycle (start/stop), a cancellation
//! token for its heartbeat monitor, and a timeout around every async operation.

pub mod error;
pub mod order_sync_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use order_sync_scheduler::{OrderSyncScheduler, OrderSyncSchedulerConfig};
