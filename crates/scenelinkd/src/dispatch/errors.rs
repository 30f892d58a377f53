//! Error types for connection-level dispatch failures.
//!
//! Request-level problems never surface here: they become error envelopes
//! on the wire. These errors only describe why a connection had to end.

use std::io;

use thiserror::Error;

/// Errors that end a dispatch loop.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// IO error during read or write.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Response serialisation failed.
    #[error("failed to serialise response: {0}")]
    SerializeResponse(#[from] serde_json::Error),
}
