//! # ShuttleLink Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The live tracking pipeline (store, forwarder, session)
//! - ETA computation over a routing port
//! - The offline-first sync engine
//!
//! ## Architecture Principles
//! - Only depends on `shuttlelink-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod eta;
pub mod sync;
pub mod tracking;

// Re-export specific items to avoid ambiguity
pub use eta::ports::RouteEstimator;
pub use eta::{EtaEngine, EtaError};
pub use sync::ports::{RemoteAuthority, SyncRecordRepository};
pub use sync::SyncEngine;
pub use tracking::ports::{LocationSource, RealtimeChannel, SampleStream, SessionContextProvider};
pub use tracking::{
    ForwardError, LocationSubscription, PipelineSnapshot, PublishOutcome, StartOutcome,
    StreamForwarder, TrackingError, TrackingNotice, TrackingOptions, TrackingSession,
    VehicleLocationStore,
};
