//! TCP command endpoint.
//!
//! The endpoint owns one listening socket and at most one connected peer. Each
//! receive is treated as a whole command: it is normalised, queued for the
//! dispatch loop and acknowledged with a fixed reply.

mod endpoint;
mod errors;

pub use self::endpoint::{ACKNOWLEDGEMENT, CommandEndpoint, EndpointSettings, ReceiveOutcome};
pub use self::errors::EndpointError;

pub(crate) const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
