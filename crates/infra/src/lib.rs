//! # ShuttleLink Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - SQLite sync-record storage (r2d2 pool)
//! - HTTP remote authority and WebSocket realtime channel
//! - Location sources, route estimator and session context adapters
//! - Configuration loading, the sync scheduler and its metrics
//!
//! ## Architecture
//! - Implements traits defined in `shuttlelink-core`
//! - Contains all "impure" code (I/O, network, clocks)

pub mod config;
pub mod context;
pub mod database;
pub mod errors;
pub mod eta;
pub mod http;
pub mod location;
pub mod observability;
pub mod realtime;
pub mod remote;
pub mod scheduling;

// Re-export commonly used items
pub use context::StaticSessionContext;
pub use database::{DbManager, SqliteSyncRecordRepository};
pub use errors::InfraError;
pub use eta::HaversineRouteEstimator;
pub use http::HttpClient;
pub use location::{ChannelLocationSource, ReplayLocationSource};
pub use realtime::WebSocketChannel;
pub use remote::{HttpRemoteAuthority, RemoteError};
pub use scheduling::{SchedulerError, SyncScheduler, SyncSchedulerConfig};
