//! Offline-first synchronisation of locally cached records

pub mod engine;
pub mod ports;

pub use engine::SyncEngine;
