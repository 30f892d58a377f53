//! Connection handling seam between the listener and the protocol.

use std::net::TcpStream;

/// Handles accepted socket connections.
///
/// Each call runs on a dedicated worker thread and owns the stream until it
/// returns; dropping the stream closes the connection.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Serves a single connection. Implementations should avoid panicking.
    fn handle(&self, stream: TcpStream);
}
