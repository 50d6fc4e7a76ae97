//! Port interface for the authenticated returns API

use async_trait::async_trait;
use returnsync_domain::Result;
use serde_json::Value;

/// Authenticated JSON transport to the returns API.
///
/// Errors are `ReturnSyncError::Authorization` when no valid token can be
/// obtained for `scope`, and `ReturnSyncError::RemoteServiceUnavailable` for
/// transport failures and any non-200 response.
#[async_trait]
pub trait ReturnsApi: Send + Sync {
    /// Bearer token for `scope`, cached per scope.
    async fn access_token(&self, scope: &str) -> Result<String>;

    /// POST `body` (or nothing) to `path` and decode the JSON response.
    async fn post(&self, path: &str, scope: &str, body: Option<&Value>) -> Result<Value>;

    /// PATCH `body` to `path` and decode the JSON response.
    async fn patch(&self, path: &str, scope: &str, body: &Value) -> Result<Value>;
}
