//! Session context providers

pub mod static_context;

pub use static_context::StaticSessionContext;
