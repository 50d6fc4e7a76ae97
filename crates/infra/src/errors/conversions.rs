//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use returnsync_domain::ReturnSyncError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub ReturnSyncError);

impl From<InfraError> for ReturnSyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<ReturnSyncError> for InfraError {
    fn from(value: ReturnSyncError) -> Self {
        Self(value)
    }
}

trait IntoReturnSyncError {
    fn into_domain(self) -> ReturnSyncError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → ReturnSyncError */
/* -------------------------------------------------------------------------- */

impl IntoReturnSyncError for SqlError {
    fn into_domain(self) -> ReturnSyncError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        ReturnSyncError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        ReturnSyncError::Database("database is locked".into())
                    }
                    // SQLITE_CONSTRAINT_UNIQUE / SQLITE_CONSTRAINT_PRIMARYKEY
                    (ErrorCode::ConstraintViolation, 2067 | 1555) => {
                        ReturnSyncError::Conflict(format!("unique constraint violation: {message}"))
                    }
                    (ErrorCode::ConstraintViolation, _) => {
                        ReturnSyncError::InvalidInput(format!("constraint violation: {message}"))
                    }
                    _ => ReturnSyncError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => {
                ReturnSyncError::NotFound("no rows returned by query".into())
            }
            RE::FromSqlConversionFailure(_, _, cause) => {
                ReturnSyncError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                ReturnSyncError::Database(format!("invalid column type: {ty}"))
            }
            RE::InvalidPath(path) => ReturnSyncError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => ReturnSyncError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        Self(value.into_domain())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → ReturnSyncError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        Self(ReturnSyncError::Database(format!("connection pool unavailable: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ReturnSyncError */
/* -------------------------------------------------------------------------- */

impl IntoReturnSyncError for HttpError {
    fn into_domain(self) -> ReturnSyncError {
        if self.is_builder() {
            return ReturnSyncError::Config(format!("invalid HTTP client configuration: {self}"));
        }

        let url = self.url().map(ToString::to_string).unwrap_or_default();
        match self.status() {
            Some(status) if matches!(status.as_u16(), 401 | 403) => ReturnSyncError::Authorization(
                format!("HTTP {} for {url}", status.as_u16()),
            ),
            status => ReturnSyncError::RemoteServiceUnavailable {
                method: "HTTP".into(),
                url,
                status: status.map(|s| s.as_u16()),
                detail: self.to_string(),
            },
        }
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        Self(value.into_domain())
    }
}

/// Transport or status failure of a request whose method and URL are known.
pub fn remote_failure(
    method: &str,
    url: &str,
    status: Option<u16>,
    detail: impl Into<String>,
) -> ReturnSyncError {
    ReturnSyncError::RemoteServiceUnavailable {
        method: method.to_ascii_uppercase(),
        url: url.to_string(),
        status,
        detail: detail.into(),
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
