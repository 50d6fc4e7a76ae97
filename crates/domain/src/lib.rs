//! # ReturnSync Domain
//!
//! Business domain types for the order sync queue.
//!
//! This crate contains:
//! - Queue entry and status types
//! - Read-only host order and catalog snapshots
//! - Wire payloads sent to the returns API
//! - Configuration structures
//! - Domain error types and Result definitions
//!
//! ## Architecture
//! - No dependencies on other ReturnSync crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
