//! "Test credentials" admin action.

use std::sync::Arc;

use tracing::warn;

use crate::api::ports::ReturnsApi;
use crate::api::purchases::PurchasesClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialCheckResult {
    pub success: bool,
    pub message: String,
}

/// Verifies that the configured API key and secret can obtain a token.
pub struct CredentialCheck {
    purchases: PurchasesClient,
}

impl CredentialCheck {
    pub fn new(api: Arc<dyn ReturnsApi>, company_id: impl Into<String>) -> Self {
        Self { purchases: PurchasesClient::new(api, company_id) }
    }

    pub async fn test_credentials(&self) -> CredentialCheckResult {
        match self.purchases.verify_credentials().await {
            Ok(()) => CredentialCheckResult {
                success: true,
                message: "API credentials successfully authenticated".into(),
            },
            Err(err) => {
                warn!(error = %err, "credential check failed");
                CredentialCheckResult { success: false, message: "Invalid API credentials".into() }
            }
        }
    }
}
