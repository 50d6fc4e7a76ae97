//! # ReturnSync Infrastructure
//!
//! Infrastructure implementations of the core ports.
//!
//! This crate contains:
//! - SQLite queue store and host snapshot store over an r2d2 pool
//! - HTTP client and the returns API adapter with its token cache
//! - The cron scheduler that drives the sync workflows
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Implements traits defined in `returnsync-core`
//! - Contains all "impure" code (I/O, network, timers)

pub mod api;
pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod observability;
pub mod scheduling;

pub use api::{ReturnsApiClient, ReturnsApiSettings};
pub use database::{
    DbManager, HostSnapshot, ImportSummary, OrderChange, SqliteHostStore, SqliteOrderQueueRepository,
    StoreProduct,
};
pub use errors::InfraError;
pub use http::HttpClient;
pub use observability::init_tracing;
pub use scheduling::{OrderSyncScheduler, OrderSyncSchedulerConfig, SchedulerError};
