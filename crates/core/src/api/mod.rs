//! Returns API port and the purchase endpoints built on it.

pub mod ports;
pub mod purchases;
