//! One request, one reply over the socket protocol.

use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use super::PROXY_TARGET;
use super::errors::BackendError;
use super::pool::BackendPool;

const READ_CHUNK_BYTES: usize = 8 * 1024;

/// Socket protocol client with pooled connections and a round-trip budget.
#[derive(Debug)]
pub struct BackendClient {
    pool: BackendPool,
    timeout: Duration,
}

impl BackendClient {
    /// Creates a client for `authority` (`host:port`).
    #[must_use]
    pub fn new(authority: impl Into<String>, pool_size: usize, timeout: Duration) -> Self {
        Self {
            pool: BackendPool::new(authority, pool_size),
            timeout,
        }
    }

    /// Returns the backend authority.
    #[must_use]
    pub fn authority(&self) -> &str {
        self.pool.authority()
    }

    /// Returns the connection pool.
    #[must_use]
    pub const fn pool(&self) -> &BackendPool {
        &self.pool
    }

    /// Sends `command` as one line and returns the raw reply line.
    ///
    /// The request is written at most once: a failure after writing is
    /// reported, never retried. The reply is checked to be a JSON object
    /// but otherwise returned byte for byte.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the backend is unreachable, too slow,
    /// hangs up, or replies with something that is not a JSON object.
    pub async fn round_trip(&self, command: &Value) -> Result<Vec<u8>, BackendError> {
        let mut line = command.to_string().into_bytes();
        line.push(b'\n');
        match tokio::time::timeout(self.timeout, self.exchange(&line)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    target: PROXY_TARGET,
                    backend = %self.authority(),
                    timeout_secs = self.timeout.as_secs(),
                    "socket round-trip timed out"
                );
                Err(BackendError::Timeout {
                    backend: self.authority().to_owned(),
                    seconds: self.timeout.as_secs(),
                })
            }
        }
    }

    async fn exchange(&self, line: &[u8]) -> Result<Vec<u8>, BackendError> {
        let mut stream = self
            .pool
            .checkout()
            .await
            .map_err(|source| self.unreachable(source))?;
        stream
            .write_all(line)
            .await
            .map_err(|source| self.unreachable(source))?;
        let (reply, leftover) = self.read_reply(&mut stream).await?;
        if let Err(error) = serde_json::from_slice::<serde_json::Map<String, Value>>(&reply) {
            return Err(BackendError::InvalidReply {
                backend: self.authority().to_owned(),
                detail: error.to_string(),
            });
        }
        if leftover {
            debug!(target: PROXY_TARGET, "dropping connection with unread bytes");
        } else {
            self.pool.checkin(stream).await;
        }
        Ok(reply)
    }

    /// Reads up to the first newline; reports whether bytes followed it.
    async fn read_reply(&self, stream: &mut TcpStream) -> Result<(Vec<u8>, bool), BackendError> {
        let mut buffer = Vec::new();
        let mut chunk = vec![0_u8; READ_CHUNK_BYTES];
        loop {
            let read = stream
                .read(&mut chunk)
                .await
                .map_err(|source| self.unreachable(source))?;
            if read == 0 {
                return Err(BackendError::Closed {
                    backend: self.authority().to_owned(),
                });
            }
            buffer.extend_from_slice(chunk.get(..read).unwrap_or_default());
            if let Some(newline) = buffer.iter().position(|byte| *byte == b'\n') {
                let leftover = buffer.len() > newline + 1;
                buffer.truncate(newline);
                return Ok((buffer, leftover));
            }
        }
    }

    fn unreachable(&self, source: std::io::Error) -> BackendError {
        BackendError::Unreachable {
            backend: self.authority().to_owned(),
            source,
        }
    }
}
