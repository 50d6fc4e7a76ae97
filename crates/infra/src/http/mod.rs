//! HTTP client with retry and timeout support.

pub mod client;

pub use client::{HttpClient, HttpClientBuilder};
