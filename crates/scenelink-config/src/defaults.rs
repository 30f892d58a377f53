use std::time::Duration;

/// Loopback address both servers bind to unless told otherwise.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port the socket command server listens on.
pub const DEFAULT_SOCKET_PORT: u16 = 9876;

/// Port the HTTP proxy listens on.
pub const DEFAULT_API_PORT: u16 = 7860;

/// Seconds a connection may sit without a complete message before it is closed.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;

/// Largest accepted message, excluding the newline delimiter.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 1024 * 1024;

/// Seconds the proxy waits for one socket round-trip.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Idle backend connections the proxy keeps for reuse.
pub const DEFAULT_POOL_SIZE: usize = 4;

/// Interpreter used for the code execution command.
pub const DEFAULT_CODE_INTERPRETER: &str = "python3";

/// Seconds a code execution request may run before it is killed.
pub const DEFAULT_CODE_TIMEOUT_SECS: u64 = 30;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Directory for log files when file logging is enabled.
pub const DEFAULT_LOG_DIR: &str = "logs";

pub(crate) const fn seconds(value: u64) -> Duration {
    Duration::from_secs(value)
}
