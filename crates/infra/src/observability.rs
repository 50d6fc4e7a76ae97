//! Tracing initialisation.
//!
//! Logs go to stdout (plain or JSON) and, when `logging.directory` is set, to
//! a daily-rolling `returns-sync.log` in that directory.

use std::path::Path;

use returnsync_domain::constants::LOG_FILE_PREFIX;
use returnsync_domain::{LoggingConfig, Result, ReturnSyncError};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` overrides `config.level`.
///
/// Keep the returned guard alive for as long as file logging should flush.
/// A second call leaves the first subscriber in place.
///
/// # Errors
/// Returns `ReturnSyncError::Config` if the log directory cannot be created.
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (json_layer, plain_layer) = if config.json {
        (Some(fmt::layer().json().with_target(true).with_current_span(true)), None)
    } else {
        (None, Some(fmt::layer().with_target(true)))
    };

    let (file_layer, guard) = match config.directory.as_deref() {
        Some(dir) if !dir.trim().is_empty() => {
            let appender = rolling_file(Path::new(dir))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        _ => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(plain_layer)
        .with(file_layer)
        .try_init();

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }

    Ok(guard)
}

fn rolling_file(dir: &Path) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(dir).map_err(|e| {
        ReturnSyncError::Config(format!("cannot create log directory {}: {e}", dir.display()))
    })?;
    Ok(RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX))
}
