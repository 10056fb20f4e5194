//! Port interfaces for live vehicle tracking
//!
//! These traits define the boundaries between the tracking pipeline
//! and infrastructure implementations.

use async_trait::async_trait;
use futures::stream::BoxStream;
use shuttlelink_domain::{LocationSample, Result, SessionContext, VehicleLocation};

/// Stream of raw samples produced by a location source.
pub type SampleStream = BoxStream<'static, Result<LocationSample>>;

/// Trait for device or simulated position providers
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// Begin producing samples
    async fn start_updates(&self) -> Result<()>;

    /// Stop producing samples. Safe to call when already stopped.
    async fn stop_updates(&self) -> Result<()>;

    /// Stream of samples for the current start/stop cycle.
    ///
    /// An `Err` item means the source failed; the stream ending means the
    /// source has no more samples to give.
    fn samples(&self) -> SampleStream;
}

/// Trait for the realtime transport vehicle locations are forwarded over
#[async_trait]
pub trait RealtimeChannel: Send + Sync {
    /// Open the connection
    async fn connect(&self) -> Result<()>;

    /// Close the connection
    async fn disconnect(&self) -> Result<()>;

    /// Send one location to the backend
    async fn send(&self, location: &VehicleLocation) -> Result<()>;

    /// Whether the transport currently holds an open connection
    fn is_connected(&self) -> bool;
}

/// Trait resolving the route and driver the vehicle is currently serving
#[async_trait]
pub trait SessionContextProvider: Send + Sync {
    async fn current(&self) -> Result<SessionContext>;
}
