//! Scheduling infrastructure for background work
//!
//! Schedulers follow the same lifecycle rules:
//! - Explicit start/stop
//! - One join handle per spawned task
//! - Cancellation token checked ahead of every tick
//! - Timeouts around the scheduled work and around the final join

pub mod error;
pub mod sync_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use sync_scheduler::{run_pass, SyncScheduler, SyncSchedulerConfig};
