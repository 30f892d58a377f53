//! Termination signal handling.
//!
//! The command server runs on its own threads; the caller parks on a
//! [`ShutdownSignal`] and stops the server once it returns a [`StopReason`].

use std::fmt;
use std::io;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;

const STOP_SIGNALS: [i32; 4] = [SIGTERM, SIGINT, SIGQUIT, SIGHUP];

/// Why the server is being stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A process signal arrived; carries its conventional name.
    Signal(&'static str),
    /// The embedding program asked for a stop.
    Requested,
}

impl fmt::Display for StopReason {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(name) => write!(formatter, "received {name}"),
            Self::Requested => formatter.write_str("stop requested"),
        }
    }
}

/// Blocks the caller until the command server should stop.
pub trait ShutdownSignal: Send + Sync {
    /// Waits for the stop condition and reports what it was.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError`] when the notification source cannot be
    /// installed.
    fn wait(&self) -> Result<StopReason, ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Waits for `SIGTERM`, `SIGINT`, `SIGQUIT` or `SIGHUP`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<StopReason, ShutdownError> {
        let mut signals =
            Signals::new(STOP_SIGNALS).map_err(|source| ShutdownError::Install { source })?;
        // The iterator only ends if the handle is closed from elsewhere.
        Ok(signals
            .forever()
            .next()
            .map_or(StopReason::Requested, |signal| {
                StopReason::Signal(signal_name(signal))
            }))
    }
}

const fn signal_name(signal: i32) -> &'static str {
    match signal {
        SIGTERM => "SIGTERM",
        SIGINT => "SIGINT",
        SIGQUIT => "SIGQUIT",
        SIGHUP => "SIGHUP",
        _ => "an unexpected signal",
    }
}
