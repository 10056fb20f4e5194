//! Live vehicle tracking: location store, forwarder and session lifecycle

pub mod forwarder;
pub mod ports;
pub mod service;
pub mod stats;
pub mod store;

pub use forwarder::{ForwardError, StreamForwarder};
pub use service::{StartOutcome, TrackingError, TrackingNotice, TrackingOptions, TrackingSession};
pub use stats::{PipelineSnapshot, PipelineStats};
pub use store::{LocationSubscription, PublishOutcome, VehicleLocationStore};
