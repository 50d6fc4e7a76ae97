//! Batch sync: the scheduled dispatch loop and its eligibility rules.

pub mod eligibility;
pub mod report;
pub mod service;

pub use eligibility::SkipReason;
pub use report::SyncRunReport;
pub use service::OrderSyncService;
