//! Configuration structures
//!
//! Loaded by the infrastructure config loader from environment variables or
//! a TOML/JSON file. Every section has defaults so partial files work.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, ReturnSyncError};
use crate::types::StoreId;

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub order_sync: OrderSyncSettings,
    pub schedule: ScheduleConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject settings the sync jobs cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(ReturnSyncError::Config("database.path must not be empty".into()));
        }
        if self.order_sync.batch_size == 0 {
            return Err(ReturnSyncError::Config("order_sync.batch_size must be positive".into()));
        }
        if self.order_sync.has_any_store_enabled() {
            if self.order_sync.company_id.trim().is_empty() {
                return Err(ReturnSyncError::Config(
                    "order_sync.company_id is required when sync is enabled".into(),
                ));
            }
            if self.api.key.trim().is_empty() || self.api.secret.trim().is_empty() {
                return Err(ReturnSyncError::Config(
                    "api.key and api.secret are required when sync is enabled".into(),
                ));
            }
        }
        Ok(())
    }
}

/// SQLite database settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "returnsync.db".into(), pool_size: 4 }
    }
}

/// Which returns API environment to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiMode {
    #[default]
    Live,
    Test,
}

crate::impl_domain_status_conversions!(ApiMode {
    Live => "live",
    Test => "test",
});

/// Returns API credentials and transport settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub key: String,
    pub secret: String,
    pub mode: ApiMode,
    pub live_url: String,
    pub test_url: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Total HTTP attempts per call; 1 disables transport retries.
    pub max_attempts: usize,
    pub token_ttl_secs: u64,
}

impl ApiConfig {
    /// Base URL for the configured mode, without trailing slash.
    pub fn base_url(&self) -> &str {
        let url = match self.mode {
            ApiMode::Live => &self.live_url,
            ApiMode::Test => &self.test_url,
        };
        url.trim_end_matches('/')
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            secret: String::new(),
            mode: ApiMode::Live,
            live_url: String::new(),
            test_url: String::new(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_attempts: 1,
            token_ttl_secs: 3000,
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .field("mode", &self.mode)
            .field("live_url", &self.live_url)
            .field("test_url", &self.test_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .finish()
    }
}

/// Order sync behaviour, per store where the host allows it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderSyncSettings {
    pub company_id: String,
    /// Default flag for stores without an override.
    pub enabled: bool,
    pub store_overrides: BTreeMap<StoreId, bool>,
    pub batch_size: usize,
    /// Highest fail count still retried; 0 retries forever.
    pub max_fails: u32,
}

impl OrderSyncSettings {
    pub fn sync_enabled_for(&self, store_id: StoreId) -> bool {
        self.store_overrides.get(&store_id).copied().unwrap_or(self.enabled)
    }

    fn has_any_store_enabled(&self) -> bool {
        self.enabled || self.store_overrides.values().any(|enabled| *enabled)
    }
}

impl Default for OrderSyncSettings {
    fn default() -> Self {
        Self {
            company_id: String::new(),
            enabled: false,
            store_overrides: BTreeMap::new(),
            batch_size: 50,
            max_fails: 5,
        }
    }
}

/// Cron expressions (with seconds) for the sync jobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub pending_cron: String,
    pub retry_cron: String,
    pub cancel_cron: String,
    pub update_cron: String,
    pub job_timeout_secs: u64,
    pub start_timeout_secs: u64,
    pub stop_timeout_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            pending_cron: "0 */5 * * * *".into(),
            retry_cron: "0 */15 * * * *".into(),
            cancel_cron: "0 */5 * * * *".into(),
            update_cron: "0 */10 * * * *".into(),
            job_timeout_secs: 600,
            start_timeout_secs: 5,
            stop_timeout_secs: 10,
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    pub json: bool,
    /// Directory for the rolling log file; stdout only when unset.
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".into(), json: false, directory: None }
    }
}
