//! Domain data types

pub mod entities;
pub mod eta;
pub mod location;
pub mod sync;

pub use entities::{Person, Service, Stop, SyncEntity};
pub use eta::{EtaDestination, RouteEta};
pub use location::{GeoPoint, LocationSample, SessionContext, TrackingState, VehicleLocation};
pub use sync::{FailedRecord, RecordKind, SyncReport, SyncStatus, SyncableRecord};
