//! Order queue port and the event-driven enqueuer.

pub mod enqueuer;
pub mod ports;

pub use enqueuer::{EnqueueOutcome, QueueEnqueuer};
