//! Returns API adapter.

pub mod returns_client;

pub use returns_client::{ReturnsApiClient, ReturnsApiSettings};
