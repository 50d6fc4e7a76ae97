//! Shared test helpers for `returnsync-core` integration tests.
//!
//! In-memory port implementations plus order/catalog fixtures, so the
//! service tests can focus on behaviour instead of boilerplate.

#![allow(dead_code)]

pub mod fixtures;
pub mod repositories;
