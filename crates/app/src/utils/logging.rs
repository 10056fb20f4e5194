use std::time::Duration;

use shuttlelink_domain::ShuttleError;
use tracing::{info, warn};

/// Log the outcome of a command execution with structured fields.
///
/// `command` must be a stable identifier (e.g. `"sync::sync_now"`) and never
/// carry record payloads or tokens.
#[inline]
pub fn log_command_execution(
    command: &str,
    elapsed: Duration,
    success: bool,
    error_type: Option<&'static str>,
) {
    let duration_ms = elapsed.as_millis() as u64;

    if success {
        info!(command, duration_ms, "command_execution_success");
    } else {
        warn!(command, duration_ms, error_type = error_type.unwrap_or("unknown"), "command_execution_failure");
    }
}

/// Stable label for metrics and logs.
pub fn error_label(error: &ShuttleError) -> &'static str {
    error.label()
}
