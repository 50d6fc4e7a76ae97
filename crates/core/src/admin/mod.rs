//! Manual admin actions.

pub mod backfill;
pub mod credentials;

pub use backfill::{BackfillReport, BackfillService};
pub use credentials::{CredentialCheck, CredentialCheckResult};
