//! Error types for the REST proxy.

use std::io;
use std::net::SocketAddr;

use scenelink_protocol::SchemaError;
use thiserror::Error;

/// Failures of a single socket round-trip.
///
/// Every variant is reported to the HTTP client as a `502` error envelope;
/// the display text is the envelope message.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Connecting, writing or reading failed.
    #[error("Socket server unreachable at {backend}: {source}")]
    Unreachable {
        /// Backend authority, `host:port`.
        backend: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The round-trip exceeded the request timeout.
    #[error("Timed out after {seconds}s waiting for socket server at {backend}")]
    Timeout {
        /// Backend authority, `host:port`.
        backend: String,
        /// Configured timeout in whole seconds.
        seconds: u64,
    },
    /// The backend closed the connection before a full reply arrived.
    #[error("Socket server at {backend} closed the connection without replying")]
    Closed {
        /// Backend authority, `host:port`.
        backend: String,
    },
    /// The backend replied with something other than a JSON envelope.
    #[error("Invalid response from socket server at {backend}: {detail}")]
    InvalidReply {
        /// Backend authority, `host:port`.
        backend: String,
        /// Why the reply was rejected.
        detail: String,
    },
}

/// Errors that prevent the proxy from starting or keep it from serving.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The embedded command schema failed to load.
    #[error("failed to load command schema: {source}")]
    Schema {
        /// Underlying schema error.
        #[source]
        source: SchemaError,
    },
    /// The listen address could not be resolved.
    #[error("failed to resolve REST API address {authority}: {source}")]
    Resolve {
        /// Configured `host:port`.
        authority: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The listen address resolved to nothing.
    #[error("REST API address {authority} did not resolve to any address")]
    ResolveEmpty {
        /// Configured `host:port`.
        authority: String,
    },
    /// The listen address is not loopback.
    #[error("refusing to expose the REST API on non-loopback address {addr}")]
    NonLoopback {
        /// Resolved listen address.
        addr: SocketAddr,
    },
    /// Binding the HTTP listener failed.
    #[error("failed to bind REST API on {addr}: {source}")]
    Bind {
        /// Resolved listen address.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The HTTP server stopped with an error.
    #[error("REST API server failed: {source}")]
    Serve {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Errors that stop the MCP stdio server.
#[derive(Debug, Error)]
pub enum McpError {
    /// The embedded command schema failed to load.
    #[error("failed to load command schema: {source}")]
    Schema {
        /// Underlying schema error.
        #[source]
        source: SchemaError,
    },
    /// Reading from the client failed.
    #[error("failed to read from MCP client: {source}")]
    Read {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Writing to the client failed.
    #[error("failed to write to MCP client: {source}")]
    Write {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A response could not be encoded.
    #[error("failed to encode MCP response: {source}")]
    Encode {
        /// Underlying serialisation error.
        #[source]
        source: serde_json::Error,
    },
}
