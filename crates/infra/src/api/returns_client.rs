//! Returns API client
//!
//! Implements [`ReturnsApi`] over [`HttpClient`]. Access tokens come from a
//! client-credentials exchange and are cached per scope for a fixed TTL; the
//! `expires_in` the server reports is not relied on. A 401 on a data call
//! drops the cached token so the next call exchanges a fresh one.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use returnsync_core::ReturnsApi;
use returnsync_domain::constants::TOKEN_PATH;
use returnsync_domain::{ApiConfig, Result as DomainResult, ReturnSyncError};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::errors::remote_failure;
use crate::http::HttpClient;

const MAX_CACHED_SCOPES: u64 = 64;
const JSON: &str = "application/json";

/// Returns API credentials and endpoint.
#[derive(Clone)]
pub struct ReturnsApiSettings {
    pub base_url: String,
    pub key: String,
    pub secret: String,
    pub token_ttl: Duration,
}

impl ReturnsApiSettings {
    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            base_url: config.base_url().to_string(),
            key: config.key.clone(),
            secret: config.secret.clone(),
            token_ttl: Duration::from_secs(config.token_ttl_secs.max(1)),
        }
    }
}

impl std::fmt::Debug for ReturnsApiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReturnsApiSettings")
            .field("base_url", &self.base_url)
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

/// HTTP adapter for the returns API.
pub struct ReturnsApiClient {
    http: HttpClient,
    settings: ReturnsApiSettings,
    tokens: Cache<String, String>,
}

impl ReturnsApiClient {
    pub fn new(http: HttpClient, settings: ReturnsApiSettings) -> Self {
        let tokens = Cache::builder()
            .max_capacity(MAX_CACHED_SCOPES)
            .time_to_live(settings.token_ttl)
            .build();
        Self { http, settings, tokens }
    }

    /// Client built from the `[api]` config section.
    pub fn from_config(config: &ApiConfig) -> DomainResult<Self> {
        Ok(Self::new(HttpClient::from_config(config)?, ReturnsApiSettings::from_config(config)))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url, path)
    }

    async fn exchange_token(&self, scope: &str) -> DomainResult<String> {
        let url = format!(
            "{}?api_key={}",
            self.url(TOKEN_PATH),
            urlencoding::encode(&self.settings.key)
        );
        let request = self
            .http
            .request(Method::POST, &url)
            .basic_auth(&self.settings.key, Some(&self.settings.secret))
            .header(ACCEPT, JSON)
            .form(&[("grant_type", "client_credentials"), ("scope", scope)]);

        let response = self.http.send(request).await.map_err(|err| {
            ReturnSyncError::Authorization(format!(
                "Failed to get access token request HTTP auth - {err}"
            ))
        })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status != StatusCode::OK {
            warn!(%status, scope, "token exchange rejected");
            return Err(ReturnSyncError::token_rejected(scope));
        }

        let parsed: Value =
            serde_json::from_str(&body).map_err(|_| ReturnSyncError::token_rejected(scope))?;
        verified_token(&parsed, scope).ok_or_else(|| ReturnSyncError::token_rejected(scope))
    }

    async fn send_json(
        &self,
        method: Method,
        path: &str,
        scope: &str,
        body: Option<&Value>,
    ) -> DomainResult<Value> {
        let token = self.access_token(scope).await?;
        let url = self.url(path);

        let mut request = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(token)
            .header(ACCEPT, JSON)
            .header(CONTENT_TYPE, JSON);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = self.http.send(request).await?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| remote_failure(method.as_str(), &url, Some(status.as_u16()), err.to_string()))?;

        if status != StatusCode::OK {
            if status == StatusCode::UNAUTHORIZED {
                self.tokens.invalidate(scope).await;
                debug!(scope, "cached token invalidated after 401");
            }
            return Err(remote_failure(method.as_str(), &url, Some(status.as_u16()), text));
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(value @ Value::Object(_)) => Ok(value),
            _ => Err(remote_failure(
                method.as_str(),
                &url,
                Some(status.as_u16()),
                format!("response is not a JSON object: {text}"),
            )),
        }
    }
}

#[async_trait]
impl ReturnsApi for ReturnsApiClient {
    #[instrument(skip(self))]
    async fn access_token(&self, scope: &str) -> DomainResult<String> {
        if let Some(token) = self.tokens.get(scope).await {
            return Ok(token);
        }

        let token = self.exchange_token(scope).await?;
        self.tokens.insert(scope.to_string(), token.clone()).await;
        info!(scope, "access token obtained");
        Ok(token)
    }

    #[instrument(skip(self, body))]
    async fn post(&self, path: &str, scope: &str, body: Option<&Value>) -> DomainResult<Value> {
        self.send_json(Method::POST, path, scope, body).await
    }

    #[instrument(skip(self, body))]
    async fn patch(&self, path: &str, scope: &str, body: &Value) -> DomainResult<Value> {
        self.send_json(Method::PATCH, path, scope, Some(body)).await
    }
}

impl std::fmt::Debug for ReturnsApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReturnsApiClient").field("settings", &self.settings).finish_non_exhaustive()
    }
}

/// Token from an exchange response, if it is present and covers `scope`.
fn verified_token(response: &Value, scope: &str) -> Option<String> {
    let token = response.get("access_token")?.as_str().filter(|token| !token.is_empty())?;
    if !scope.is_empty() {
        let granted = response.get("scope")?.as_str()?;
        if !granted.contains(scope) {
            return None;
        }
    }
    Some(token.to_string())
}
