//! # ReturnSync Core
//!
//! Pure business logic of the order sync queue.
//!
//! This crate contains:
//! - Port interfaces (traits) for the queue store, host data and returns API
//! - The queue enqueuer driven by host order events
//! - The purchase payload builder
//! - The batch sync service and its state machine
//! - Admin actions (backfill, credential check)
//!
//! ## Architecture Principles
//! - Only depends on `returnsync-domain`
//! - No database, HTTP, or scheduling code
//! - All external dependencies via traits

pub mod admin;
pub mod api;
pub mod host;
pub mod payload;
pub mod queue;
pub mod sync;

// Re-export specific items to avoid ambiguity
pub use admin::{BackfillReport, BackfillService, CredentialCheck, CredentialCheckResult};
pub use api::ports::ReturnsApi;
pub use api::purchases::PurchasesClient;
pub use host::ports::{CatalogRepository, OrderRepository};
pub use payload::{BatchContext, PurchasePayloadBuilder};
pub use queue::ports::OrderQueueRepository;
pub use queue::{EnqueueOutcome, QueueEnqueuer};
pub use sync::{OrderSyncService, SkipReason, SyncRunReport};
