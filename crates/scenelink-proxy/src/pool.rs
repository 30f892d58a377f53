//! Reusable connections to the socket server.

use std::io;

use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::debug;

use super::PROXY_TARGET;

/// Bounded set of idle backend connections.
///
/// A connection goes back into the pool only after a complete round-trip,
/// so every pooled stream is positioned at a message boundary.
#[derive(Debug)]
pub struct BackendPool {
    authority: String,
    capacity: usize,
    idle: Mutex<Vec<TcpStream>>,
}

impl BackendPool {
    /// Creates an empty pool for `authority` (`host:port`).
    #[must_use]
    pub fn new(authority: impl Into<String>, capacity: usize) -> Self {
        Self {
            authority: authority.into(),
            capacity,
            idle: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    /// Returns the backend authority.
    #[must_use]
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Returns a live connection, reusing an idle one when possible.
    ///
    /// # Errors
    ///
    /// Returns the connect error when no idle connection is usable and a new
    /// one cannot be opened.
    pub async fn checkout(&self) -> io::Result<TcpStream> {
        loop {
            let candidate = self.idle.lock().await.pop();
            match candidate {
                Some(stream) if is_reusable(&stream) => return Ok(stream),
                Some(_) => {
                    debug!(target: PROXY_TARGET, backend = %self.authority, "discarding stale connection");
                }
                None => break,
            }
        }
        let stream = TcpStream::connect(self.authority.as_str()).await?;
        stream.set_nodelay(true)?;
        debug!(target: PROXY_TARGET, backend = %self.authority, "opened backend connection");
        Ok(stream)
    }

    /// Returns `stream` to the pool, dropping it when the pool is full.
    pub async fn checkin(&self, stream: TcpStream) {
        let mut idle = self.idle.lock().await;
        if idle.len() < self.capacity {
            idle.push(stream);
        }
    }

    /// Number of idle connections currently held.
    pub async fn idle_count(&self) -> usize {
        self.idle.lock().await.len()
    }
}

/// A pooled stream is reusable only when it is open and has nothing unread.
fn is_reusable(stream: &TcpStream) -> bool {
    let mut byte = [0_u8; 1];
    match stream.try_read(&mut byte) {
        Ok(_) => false,
        Err(error) => error.kind() == io::ErrorKind::WouldBlock,
    }
}
