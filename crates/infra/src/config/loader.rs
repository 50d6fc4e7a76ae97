//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If a required variable is missing, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Whichever source wins, the result is checked with [`Config::validate`].
//!
//! ## Environment Variables
//! Required:
//! - `RETURNSYNC_DB_PATH`: SQLite database file
//! - `RETURNSYNC_API_KEY` / `RETURNSYNC_API_SECRET`: returns API credentials
//! - `RETURNSYNC_COMPANY_ID`: company id used in API paths and scopes
//!
//! Optional (defaults from [`Config::default`]):
//! - `RETURNSYNC_DB_POOL_SIZE`
//! - `RETURNSYNC_API_MODE` (`live` | `test`), `RETURNSYNC_API_LIVE_URL`,
//!   `RETURNSYNC_API_TEST_URL`, `RETURNSYNC_API_TIMEOUT_SECS`,
//!   `RETURNSYNC_API_CONNECT_TIMEOUT_SECS`, `RETURNSYNC_API_MAX_ATTEMPTS`,
//!   `RETURNSYNC_API_TOKEN_TTL_SECS`
//! - `RETURNSYNC_SYNC_ENABLED` (true/false), `RETURNSYNC_STORE_OVERRIDES`
//!   (`1=true,2=false`), `RETURNSYNC_BATCH_SIZE`, `RETURNSYNC_MAX_FAILS`
//! - `RETURNSYNC_PENDING_CRON`, `RETURNSYNC_RETRY_CRON`,
//!   `RETURNSYNC_CANCEL_CRON`, `RETURNSYNC_UPDATE_CRON`,
//!   `RETURNSYNC_JOB_TIMEOUT_SECS`
//! - `RETURNSYNC_LOG_LEVEL`, `RETURNSYNC_LOG_JSON`, `RETURNSYNC_LOG_DIR`
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.{toml,json}` then `./returnsync.{toml,json}`
//! 2. The same names in the parent and grandparent directory
//! 3. The same names next to the executable

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use returnsync_domain::{ApiMode, Config, Result, ReturnSyncError, StoreId};

const CONFIG_FILE_NAMES: [&str; 4] =
    ["config.toml", "config.json", "returnsync.toml", "returnsync.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `ReturnSyncError::Config` if neither source yields a valid
/// configuration.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `ReturnSyncError::Config` if a required variable is missing or a
/// value does not parse.
pub fn load_from_env() -> Result<Config> {
    let defaults = Config::default();
    let mut config = Config::default();

    config.database.path = env_var("RETURNSYNC_DB_PATH")?;
    config.database.pool_size = env_parse("RETURNSYNC_DB_POOL_SIZE", defaults.database.pool_size)?;

    config.api.key = env_var("RETURNSYNC_API_KEY")?;
    config.api.secret = env_var("RETURNSYNC_API_SECRET")?;
    config.api.mode = env_parse::<ApiMode>("RETURNSYNC_API_MODE", defaults.api.mode)?;
    config.api.live_url = env_or("RETURNSYNC_API_LIVE_URL", defaults.api.live_url);
    config.api.test_url = env_or("RETURNSYNC_API_TEST_URL", defaults.api.test_url);
    config.api.timeout_secs = env_parse("RETURNSYNC_API_TIMEOUT_SECS", defaults.api.timeout_secs)?;
    config.api.connect_timeout_secs =
        env_parse("RETURNSYNC_API_CONNECT_TIMEOUT_SECS", defaults.api.connect_timeout_secs)?;
    config.api.max_attempts =
        env_parse("RETURNSYNC_API_MAX_ATTEMPTS", defaults.api.max_attempts)?;
    config.api.token_ttl_secs =
        env_parse("RETURNSYNC_API_TOKEN_TTL_SECS", defaults.api.token_ttl_secs)?;

    config.order_sync.company_id = env_var("RETURNSYNC_COMPANY_ID")?;
    config.order_sync.enabled = env_bool("RETURNSYNC_SYNC_ENABLED", defaults.order_sync.enabled);
    if let Ok(raw) = std::env::var("RETURNSYNC_STORE_OVERRIDES") {
        config.order_sync.store_overrides = parse_store_overrides(&raw)?;
    }
    config.order_sync.batch_size =
        env_parse("RETURNSYNC_BATCH_SIZE", defaults.order_sync.batch_size)?;
    config.order_sync.max_fails = env_parse("RETURNSYNC_MAX_FAILS", defaults.order_sync.max_fails)?;

    config.schedule.pending_cron =
        env_or("RETURNSYNC_PENDING_CRON", defaults.schedule.pending_cron);
    config.schedule.retry_cron = env_or("RETURNSYNC_RETRY_CRON", defaults.schedule.retry_cron);
    config.schedule.cancel_cron = env_or("RETURNSYNC_CANCEL_CRON", defaults.schedule.cancel_cron);
    config.schedule.update_cron = env_or("RETURNSYNC_UPDATE_CRON", defaults.schedule.update_cron);
    config.schedule.job_timeout_secs =
        env_parse("RETURNSYNC_JOB_TIMEOUT_SECS", defaults.schedule.job_timeout_secs)?;

    config.logging.level = env_or("RETURNSYNC_LOG_LEVEL", defaults.logging.level);
    config.logging.json = env_bool("RETURNSYNC_LOG_JSON", defaults.logging.json);
    config.logging.directory = std::env::var("RETURNSYNC_LOG_DIR").ok().filter(|d| !d.is_empty());

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations via
/// [`probe_config_paths`]. Format is chosen by file extension.
///
/// # Errors
/// Returns `ReturnSyncError::Config` if the file is missing, unreadable,
/// malformed, or fails validation.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ReturnSyncError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ReturnSyncError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ReturnSyncError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ReturnSyncError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ReturnSyncError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(ReturnSyncError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file in the standard locations, if any.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend(cwd.ancestors().take(3).map(Path::to_path_buf));
    }

    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        roots.push(exe_dir);
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Parse `RETURNSYNC_STORE_OVERRIDES`, e.g. `1=true,2=false`.
fn parse_store_overrides(raw: &str) -> Result<BTreeMap<StoreId, bool>> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (store, flag) = pair.split_once('=').ok_or_else(|| {
                ReturnSyncError::Config(format!("Invalid store override '{pair}', expected id=bool"))
            })?;
            let store = store.trim().parse::<StoreId>().map_err(|e| {
                ReturnSyncError::Config(format!("Invalid store id in override '{pair}': {e}"))
            })?;
            let flag = flag.trim().parse::<bool>().map_err(|e| {
                ReturnSyncError::Config(format!("Invalid flag in override '{pair}': {e}"))
            })?;
            Ok((store, flag))
        })
        .collect()
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        ReturnSyncError::Config(format!("Missing required environment variable: {key}"))
    })
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).ok().filter(|value| !value.is_empty()).unwrap_or(default)
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ReturnSyncError::Config(format!("Invalid value for {key}: {e}"))),
        _ => Ok(default),
    }
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive).
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
