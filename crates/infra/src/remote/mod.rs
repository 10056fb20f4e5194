//! Remote authority adapters

pub mod errors;
pub mod http_authority;

pub use errors::{RemoteError, RemoteErrorCategory};
pub use http_authority::HttpRemoteAuthority;
