//! Error types for the command endpoint.

use std::io;
use std::net::SocketAddrV4;

use thiserror::Error;

/// Fatal failures while setting up the endpoint or accepting a peer.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// The socket could not be created.
    #[error("failed to create TCP socket: {source}")]
    Create {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The configured address could not be bound.
    #[error("failed to bind TCP socket at {address}: {source}")]
    Bind {
        /// Address the endpoint tried to bind.
        address: SocketAddrV4,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The bound socket refused to listen.
    #[error("failed to listen on {address}: {source}")]
    Listen {
        /// Address the socket is bound to.
        address: SocketAddrV4,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The listener could not be switched to non-blocking mode.
    #[error("failed to enable non-blocking listener: {source}")]
    NonBlocking {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The listener's local address could not be read.
    #[error("failed to read listener address: {source}")]
    LocalAddr {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Accepting a client failed with a non-retryable error.
    #[error("failed to accept client connection: {source}")]
    Accept {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
