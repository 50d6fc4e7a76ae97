//! Purchase payload construction.

pub mod builder;
pub mod fields;

pub use builder::{BatchContext, PurchasePayloadBuilder};
