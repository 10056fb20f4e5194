//! Location source adapters

pub mod channel_source;
pub mod replay_source;

pub use channel_source::ChannelLocationSource;
pub use replay_source::ReplayLocationSource;
