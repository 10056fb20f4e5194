//! Estimated time of arrival

pub mod engine;
pub mod ports;

pub use engine::{EtaEngine, EtaError};
