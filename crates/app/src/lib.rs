//! # ShuttleLink App
//!
//! Application layer - commands, wiring and the `shuttlelink` binary.
//!
//! This crate contains:
//! - Commands (host shell → core services)
//! - Application context (dependency injection)
//! - Logging setup
//!
//! ## Architecture
//! - Depends on `domain`, `core` and `infra`
//! - Wires concrete adapters into the core services

pub mod commands;
pub mod context;
pub mod utils;

pub use context::AppContext;
