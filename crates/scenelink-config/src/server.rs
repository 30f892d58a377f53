//! Options for the `server` subcommand.

use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_CODE_INTERPRETER, DEFAULT_CODE_TIMEOUT_SECS, DEFAULT_HOST, DEFAULT_IDLE_TIMEOUT_SECS,
    DEFAULT_MAX_MESSAGE_BYTES, DEFAULT_SOCKET_PORT, seconds,
};
use crate::endpoint::Endpoint;
use crate::errors::ConfigError;
use crate::logging::{LogFormat, LogLevel, LoggingConfig};

/// Raw options for the socket command server.
///
/// Every field is optional so file, environment and CLI layers can be merged
/// before defaults are applied by [`ServerArgs::resolve`].
#[derive(Parser, Deserialize, Serialize, Default, Debug, Clone, PartialEq, OrthoConfig)]
#[command(name = "server", about = "Run the socket command server")]
#[ortho_config(prefix = "SCENELINK_")]
pub struct ServerArgs {
    /// Address to listen on.
    #[arg(long)]
    pub host: Option<String>,
    /// TCP port to listen on.
    #[arg(long)]
    pub port: Option<u16>,
    /// Permit binding to a non-loopback address. The protocol has no
    /// authentication and can run arbitrary code when that is enabled.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub allow_remote: Option<bool>,
    /// Seconds a connection may stay silent before it is closed.
    #[arg(long)]
    pub idle_timeout_secs: Option<u64>,
    /// Largest accepted message in bytes.
    #[arg(long)]
    pub max_message_bytes: Option<usize>,
    /// Enable the arbitrary code execution command.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub allow_code_execution: Option<bool>,
    /// Interpreter invoked as `<interpreter> -c <code>`.
    #[arg(long)]
    pub code_interpreter: Option<String>,
    /// Seconds a code execution request may run.
    #[arg(long)]
    pub code_timeout_secs: Option<u64>,
    /// Tracing filter directive.
    #[arg(long)]
    pub log_filter: Option<String>,
    /// Shorthand verbosity; overrides `--log-filter`.
    #[arg(long)]
    pub log_level: Option<LogLevel>,
    /// Log output format.
    #[arg(long)]
    pub log_format: Option<LogFormat>,
    /// Also write logs to a file in `--log-dir`.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub log_to_file: Option<bool>,
    /// Directory for log files.
    #[arg(long)]
    pub log_dir: Option<Utf8PathBuf>,
}

/// Settings for the code execution command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeExecutionConfig {
    /// Whether the command runs at all.
    pub enabled: bool,
    /// Interpreter binary.
    pub interpreter: String,
    /// Wall-clock budget per request.
    pub timeout: Duration,
}

/// Resolved socket server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Listening endpoint.
    pub endpoint: Endpoint,
    /// Whether a non-loopback endpoint is acceptable.
    pub allow_remote: bool,
    /// Per-message idle budget.
    pub idle_timeout: Duration,
    /// Frame size limit in bytes.
    pub max_message_bytes: usize,
    /// Code execution settings.
    pub code_execution: CodeExecutionConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::new(DEFAULT_HOST, DEFAULT_SOCKET_PORT),
            allow_remote: false,
            idle_timeout: seconds(DEFAULT_IDLE_TIMEOUT_SECS),
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            code_execution: CodeExecutionConfig {
                enabled: false,
                interpreter: DEFAULT_CODE_INTERPRETER.to_owned(),
                timeout: seconds(DEFAULT_CODE_TIMEOUT_SECS),
            },
            logging: LoggingConfig::resolve(None, None, None, false, None, SERVER_LOG_STEM),
        }
    }
}

const SERVER_LOG_STEM: &str = "scenelink-server";

impl ServerArgs {
    /// Applies defaults and checks the merged options.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the host is empty or a limit is zero.
    pub fn resolve(&self) -> Result<ServerConfig, ConfigError> {
        let host = self.host.as_deref().unwrap_or(DEFAULT_HOST).trim();
        if host.is_empty() {
            return Err(ConfigError::EmptyHost { field: "host" });
        }
        let idle_timeout_secs = positive(
            self.idle_timeout_secs.unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS),
            "idle_timeout_secs",
        )?;
        let max_message_bytes = self.max_message_bytes.unwrap_or(DEFAULT_MAX_MESSAGE_BYTES);
        if max_message_bytes == 0 {
            return Err(ConfigError::Zero {
                field: "max_message_bytes",
            });
        }
        let code_timeout_secs = positive(
            self.code_timeout_secs.unwrap_or(DEFAULT_CODE_TIMEOUT_SECS),
            "code_timeout_secs",
        )?;

        Ok(ServerConfig {
            endpoint: Endpoint::new(host, self.port.unwrap_or(DEFAULT_SOCKET_PORT)),
            allow_remote: self.allow_remote.unwrap_or(false),
            idle_timeout: seconds(idle_timeout_secs),
            max_message_bytes,
            code_execution: CodeExecutionConfig {
                enabled: self.allow_code_execution.unwrap_or(false),
                interpreter: self
                    .code_interpreter
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CODE_INTERPRETER.to_owned()),
                timeout: seconds(code_timeout_secs),
            },
            logging: LoggingConfig::resolve(
                self.log_filter.as_deref(),
                self.log_level,
                self.log_format,
                self.log_to_file.unwrap_or(false),
                self.log_dir.as_deref(),
                SERVER_LOG_STEM,
            ),
        })
    }
}

pub(crate) const fn positive(value: u64, field: &'static str) -> Result<u64, ConfigError> {
    if value == 0 {
        Err(ConfigError::Zero { field })
    } else {
        Ok(value)
    }
}
