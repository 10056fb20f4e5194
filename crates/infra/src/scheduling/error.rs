//! Scheduler error types

use shuttlelink_domain::ShuttleError;
use thiserror::Error;

use crate::errors::InfraError;

/// Scheduler-specific errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Scheduler is already running
    #[error("Scheduler already running")]
    AlreadyRunning,

    /// Scheduler is not running
    #[error("Scheduler not running")]
    NotRunning,

    /// Background task did not finish in time and was aborted
    #[error("Operation timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// Task join failed
    #[error("Task join failed: {0}")]
    TaskJoinFailed(String),
}

impl From<SchedulerError> for InfraError {
    fn from(err: SchedulerError) -> Self {
        let shuttle_err = match err {
            SchedulerError::AlreadyRunning | SchedulerError::NotRunning => {
                ShuttleError::InvalidInput(err.to_string())
            }
            _ => ShuttleError::Internal(err.to_string()),
        };
        InfraError(shuttle_err)
    }
}

impl From<SchedulerError> for ShuttleError {
    fn from(err: SchedulerError) -> Self {
        InfraError::from(err).into()
    }
}

/// Convenience type alias for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;
