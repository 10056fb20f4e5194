//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for ShuttleLink
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum ShuttleError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Remote rejected: {0}")]
    Remote(String),

    #[error("Location error: {0}")]
    Location(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShuttleError {
    /// Stable label suitable for logging fields and metric tags.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Database(_) => "database",
            Self::Config(_) => "config",
            Self::Network(_) => "network",
            Self::Remote(_) => "remote",
            Self::Location(_) => "location",
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for ShuttleError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput(format!("invalid JSON payload: {err}"))
    }
}

/// Result type alias for ShuttleLink operations
pub type Result<T> = std::result::Result<T, ShuttleError>;
