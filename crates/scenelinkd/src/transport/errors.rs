//! Error types for socket listener operations.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Errors surfaced while binding or running the socket listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Name resolution failed.
    #[error("failed to resolve TCP address {host}:{port}: {source}")]
    Resolve {
        /// Host that failed to resolve.
        host: String,
        /// Requested port.
        port: u16,
        /// Resolver error.
        #[source]
        source: io::Error,
    },
    /// Resolution succeeded but produced no addresses.
    #[error("no TCP addresses resolved for {host}:{port}")]
    ResolveEmpty {
        /// Host that resolved to nothing.
        host: String,
        /// Requested port.
        port: u16,
    },
    /// The endpoint is reachable from other machines and remote binding was
    /// not allowed.
    #[error(
        "refusing to bind non-loopback address {addr}: the protocol has no authentication \
         and can execute code; pass --allow-remote to override"
    )]
    NonLoopback {
        /// Resolved address.
        addr: SocketAddr,
    },
    /// Binding the listening socket failed.
    #[error("failed to bind TCP listener at {addr}: {source}")]
    BindTcp {
        /// Address the bind was attempted on.
        addr: SocketAddr,
        /// Underlying bind error.
        #[source]
        source: io::Error,
    },
    /// The listening socket could not be switched to non-blocking mode.
    #[error("failed to enable non-blocking listener: {source}")]
    NonBlocking {
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// The accept loop thread panicked.
    #[error("listener thread panicked")]
    ThreadPanic,
}
