//! Read access to host platform data.

pub mod ports;
