//! Purchase endpoints of the returns API.

use std::sync::Arc;

use returnsync_domain::constants::{PURCHASES_PATH, PURCHASES_SCOPE};
use returnsync_domain::{PurchasePayload, PurchaseUpdatePayload, Result, ReturnSyncError};
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use super::ports::ReturnsApi;

/// Scope required for purchase writes on behalf of `company_id`.
pub fn purchase_scope(company_id: &str) -> String {
    format!("{PURCHASES_SCOPE} organisation_{company_id}")
}

/// Path addressing an existing purchase by the host order number.
pub fn purchase_path(company_id: &str, external_order_id: &str, email: &str) -> String {
    format!(
        "{PURCHASES_PATH}company/{}/externalOrderId/{}?email={}",
        urlencoding::encode(company_id),
        urlencoding::encode(external_order_id),
        urlencoding::encode(email)
    )
}

pub fn cancel_path(company_id: &str, external_order_id: &str, email: &str) -> String {
    format!(
        "{PURCHASES_PATH}company/{}/externalOrderId/{}/cancel?email={}",
        urlencoding::encode(company_id),
        urlencoding::encode(external_order_id),
        urlencoding::encode(email)
    )
}

/// Create and update responses carry the stored purchase under `resource`.
pub fn has_resource(response: &Value) -> bool {
    response.get("resource").is_some_and(|resource| !resource.is_null())
}

pub fn is_cancel_confirmed(response: &Value) -> bool {
    response
        .get("resource")
        .and_then(|resource| resource.get("orderCancelled"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Identifier the API assigned to the purchase, when it reports one.
pub fn resource_id(response: &Value) -> Option<String> {
    match response.get("resource")?.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Typed wrapper over [`ReturnsApi`] for the purchase resource.
#[derive(Clone)]
pub struct PurchasesClient {
    api: Arc<dyn ReturnsApi>,
    company_id: String,
}

impl PurchasesClient {
    pub fn new(api: Arc<dyn ReturnsApi>, company_id: impl Into<String>) -> Self {
        Self { api, company_id: company_id.into() }
    }

    pub fn scope(&self) -> String {
        purchase_scope(&self.company_id)
    }

    #[instrument(skip(self, payload), fields(external_order_id = %payload.external_order_id))]
    pub async fn create(&self, payload: &PurchasePayload) -> Result<Value> {
        let body = to_json(payload)?;
        self.api.post(PURCHASES_PATH, &self.scope(), Some(&body)).await
    }

    #[instrument(skip(self, payload, email))]
    pub async fn update(
        &self,
        external_order_id: &str,
        email: &str,
        payload: &PurchaseUpdatePayload,
    ) -> Result<Value> {
        let body = to_json(payload)?;
        let path = purchase_path(&self.company_id, external_order_id, email);
        self.api.patch(&path, &self.scope(), &body).await
    }

    #[instrument(skip(self, email))]
    pub async fn cancel(&self, external_order_id: &str, email: &str) -> Result<Value> {
        let path = cancel_path(&self.company_id, external_order_id, email);
        self.api.post(&path, &self.scope(), None).await
    }

    /// Request a purchases token to prove the configured credentials work.
    pub async fn verify_credentials(&self) -> Result<()> {
        self.api.access_token(&self.scope()).await.map(|_| ())
    }
}

fn to_json<T: Serialize>(payload: &T) -> Result<Value> {
    serde_json::to_value(payload)
        .map_err(|err| ReturnSyncError::Internal(format!("failed to encode payload: {err}")))
}
