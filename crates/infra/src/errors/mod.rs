//! Infrastructure error conversions.

mod conversions;

pub use conversions::{remote_failure, InfraError};
