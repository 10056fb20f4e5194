//! Conversions from external infrastructure errors into domain errors.

use r2d2::Error as PoolError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;
use shuttlelink_domain::ShuttleError;
use tokio_tungstenite::tungstenite::Error as WsError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub ShuttleError);

impl From<InfraError> for ShuttleError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<ShuttleError> for InfraError {
    fn from(value: ShuttleError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoShuttleError {
    fn into_shuttle(self) -> ShuttleError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → ShuttleError */
/* -------------------------------------------------------------------------- */

impl IntoShuttleError for SqlError {
    fn into_shuttle(self) -> ShuttleError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => ShuttleError::Database("database is busy".into()),
                    (ErrorCode::DatabaseLocked, _) => {
                        ShuttleError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067) => {
                        ShuttleError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::NotADatabase, _) => {
                        ShuttleError::Database("file is not a database".into())
                    }
                    _ => ShuttleError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => ShuttleError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                ShuttleError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                ShuttleError::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => ShuttleError::Database("invalid UTF-8 returned from sqlite".into()),
            RE::InvalidPath(path) => ShuttleError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => ShuttleError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_shuttle())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → ShuttleError */
/* -------------------------------------------------------------------------- */

impl IntoShuttleError for PoolError {
    fn into_shuttle(self) -> ShuttleError {
        ShuttleError::Database(format!("connection pool: {self}"))
    }
}

impl From<PoolError> for InfraError {
    fn from(value: PoolError) -> Self {
        InfraError(value.into_shuttle())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ShuttleError */
/* -------------------------------------------------------------------------- */

impl IntoShuttleError for HttpError {
    fn into_shuttle(self) -> ShuttleError {
        if self.is_timeout() {
            return ShuttleError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return ShuttleError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                404 => ShuttleError::NotFound(message),
                429 | 500..=599 => ShuttleError::Network(message),
                400..=499 => ShuttleError::Remote(message),
                _ => ShuttleError::Network(message),
            };
        }

        ShuttleError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_shuttle())
    }
}

/* -------------------------------------------------------------------------- */
/* tungstenite::Error → ShuttleError */
/* -------------------------------------------------------------------------- */

impl IntoShuttleError for WsError {
    fn into_shuttle(self) -> ShuttleError {
        match self {
            WsError::ConnectionClosed | WsError::AlreadyClosed => {
                ShuttleError::Network("websocket connection closed".into())
            }
            WsError::Io(err) => ShuttleError::Network(format!("websocket I/O: {err}")),
            WsError::Url(err) => ShuttleError::Config(format!("invalid websocket URL: {err}")),
            WsError::Http(response) => ShuttleError::Remote(format!(
                "websocket handshake rejected with HTTP {}",
                response.status()
            )),
            other => ShuttleError::Network(other.to_string()),
        }
    }
}

impl From<WsError> for InfraError {
    fn from(value: WsError) -> Self {
        InfraError(value.into_shuttle())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
