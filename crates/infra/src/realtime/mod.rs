//! Realtime channel adapters

pub mod message;
pub mod websocket;

pub use message::{realtime_url, LocationMessage, WireCoordinates};
pub use websocket::WebSocketChannel;
