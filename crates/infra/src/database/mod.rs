//! Database implementations

pub mod host_store;
pub mod manager;
pub mod queue_repository;

pub use host_store::{HostSnapshot, ImportSummary, OrderChange, SqliteHostStore, StoreProduct};
pub use manager::{DbManager, SqliteConnection};
pub use queue_repository::SqliteOrderQueueRepository;
