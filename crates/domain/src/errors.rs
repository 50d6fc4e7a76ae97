//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for ReturnSync
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum ReturnSyncError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Token exchange failed or the granted scope does not cover the request.
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Transport failure or non-200 response from the returns API.
    #[error("{}", describe_remote_failure(.method, .url, .status, .detail))]
    RemoteServiceUnavailable { method: String, url: String, status: Option<u16>, detail: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A concurrent writer changed the row between read and write.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReturnSyncError {
    /// Authorization failure for a token request.
    pub fn token_rejected(scope: &str) -> Self {
        Self::Authorization(format!("Failed to retrieve valid access token for scope - {scope}"))
    }

    /// Short machine-readable label used in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Database(_) => "database",
            Self::Config(_) => "config",
            Self::Authorization(_) => "authorization",
            Self::RemoteServiceUnavailable { .. } => "remote_service_unavailable",
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal",
        }
    }
}

fn describe_remote_failure(method: &str, url: &str, status: &Option<u16>, detail: &str) -> String {
    match status {
        Some(code) => format!("Got HTTP {code} response for {method} request: {url} - {detail}"),
        None => format!("Failed to send HTTP {method} request: {url} - {detail}"),
    }
}

/// Result type alias for ReturnSync operations
pub type Result<T> = std::result::Result<T, ReturnSyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_failure_with_status_mentions_code_and_body() {
        let err = ReturnSyncError::RemoteServiceUnavailable {
            method: "POST".into(),
            url: "https://api.example.test/v1/purchases/".into(),
            status: Some(500),
            detail: "{\"error\":\"boom\"}".into(),
        };

        assert_eq!(
            err.to_string(),
            "Got HTTP 500 response for POST request: https://api.example.test/v1/purchases/ - {\"error\":\"boom\"}"
        );
        assert_eq!(err.kind(), "remote_service_unavailable");
    }

    #[test]
    fn remote_failure_without_status_reads_as_transport_error() {
        let err = ReturnSyncError::RemoteServiceUnavailable {
            method: "PATCH".into(),
            url: "https://api.example.test/x".into(),
            status: None,
            detail: "connection refused".into(),
        };

        assert!(err.to_string().starts_with("Failed to send HTTP PATCH request"));
    }

    #[test]
    fn token_rejection_names_scope() {
        let err = ReturnSyncError::token_rejected("purchases:write organisation_42");
        assert!(matches!(err, ReturnSyncError::Authorization(_)));
        assert!(err.to_string().ends_with("scope - purchases:write organisation_42"));
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(ReturnSyncError::Conflict("stale".into())).unwrap();
        assert_eq!(json["type"], "Conflict");
        assert_eq!(json["message"], "stale");
    }
}
