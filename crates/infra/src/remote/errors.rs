//! Remote authority error types
//!
//! Classifies rejected pushes so callers can tell a record the remote will
//! never accept from one worth retrying on the next pass.

use reqwest::StatusCode;
use shuttlelink_domain::ShuttleError;
use thiserror::Error;

/// Categories of remote errors for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorCategory {
    /// 401, 403
    Authentication,
    /// 429
    RateLimit,
    /// 5xx
    Server,
    /// Other 4xx, the payload itself was refused
    Client,
    Network,
}

/// A push the remote authority did not accept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("authentication failed (HTTP {status}): {body}")]
    Auth { status: u16, body: String },

    #[error("rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("server error (HTTP {status}): {body}")]
    Server { status: u16, body: String },

    #[error("record rejected (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),
}

const MAX_BODY_CHARS: usize = 200;

impl RemoteError {
    /// Classify a non-success response.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let code = status.as_u16();
        let body: String = body.trim().chars().take(MAX_BODY_CHARS).collect();
        match code {
            401 | 403 => Self::Auth { status: code, body },
            429 => Self::RateLimit(body),
            500..=599 => Self::Server { status: code, body },
            400..=499 => Self::Rejected { status: code, body },
            _ => Self::Network(format!("unexpected HTTP {code}: {body}")),
        }
    }

    pub fn category(&self) -> RemoteErrorCategory {
        match self {
            Self::Auth { .. } => RemoteErrorCategory::Authentication,
            Self::RateLimit(_) => RemoteErrorCategory::RateLimit,
            Self::Server { .. } => RemoteErrorCategory::Server,
            Self::Rejected { .. } => RemoteErrorCategory::Client,
            Self::Network(_) => RemoteErrorCategory::Network,
        }
    }

    /// Whether a later pass has a chance of succeeding without a local edit.
    pub fn should_retry(&self) -> bool {
        !matches!(self.category(), RemoteErrorCategory::Client)
    }
}

impl From<RemoteError> for ShuttleError {
    fn from(err: RemoteError) -> Self {
        match err.category() {
            RemoteErrorCategory::RateLimit
            | RemoteErrorCategory::Server
            | RemoteErrorCategory::Network => ShuttleError::Network(err.to_string()),
            RemoteErrorCategory::Authentication | RemoteErrorCategory::Client => {
                ShuttleError::Remote(err.to_string())
            }
        }
    }
}
