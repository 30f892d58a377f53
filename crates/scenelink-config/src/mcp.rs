//! Options for the `mcp` subcommand.

use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_HOST, DEFAULT_POOL_SIZE, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SOCKET_PORT, seconds,
};
use crate::endpoint::Endpoint;
use crate::errors::ConfigError;
use crate::logging::{LogFormat, LogLevel, LoggingConfig};
use crate::server::positive;

/// Raw options for the MCP tool server on stdio.
#[derive(Parser, Deserialize, Serialize, Default, Debug, Clone, PartialEq, OrthoConfig)]
#[command(name = "mcp", about = "Serve the command set as MCP tools over stdio")]
#[ortho_config(prefix = "SCENELINK_")]
pub struct McpArgs {
    /// Host of the socket command server.
    #[arg(long)]
    pub socket_host: Option<String>,
    /// Port of the socket command server.
    #[arg(long)]
    pub socket_port: Option<u16>,
    /// Seconds to wait for one socket round-trip.
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,
    /// Idle socket connections kept for reuse.
    #[arg(long)]
    pub pool_size: Option<usize>,
    /// Tracing filter directive.
    #[arg(long)]
    pub log_filter: Option<String>,
    /// Shorthand verbosity; overrides `--log-filter`.
    #[arg(long)]
    pub log_level: Option<LogLevel>,
    /// Log output format. Logs always go to stderr; stdout carries the
    /// protocol.
    #[arg(long)]
    pub log_format: Option<LogFormat>,
    /// Also write logs to a file in `--log-dir`.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub log_to_file: Option<bool>,
    /// Directory for log files.
    #[arg(long)]
    pub log_dir: Option<Utf8PathBuf>,
}

/// Resolved MCP server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpConfig {
    /// Socket command server the tools forward to.
    pub backend: Endpoint,
    /// Budget for one backend round-trip.
    pub request_timeout: Duration,
    /// Idle backend connections kept for reuse; zero disables pooling.
    pub pool_size: usize,
    /// Logging settings.
    pub logging: LoggingConfig,
}

const MCP_LOG_STEM: &str = "scenelink-mcp";

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            backend: Endpoint::new(DEFAULT_HOST, DEFAULT_SOCKET_PORT),
            request_timeout: seconds(DEFAULT_REQUEST_TIMEOUT_SECS),
            pool_size: DEFAULT_POOL_SIZE,
            logging: LoggingConfig::resolve(None, None, None, false, None, MCP_LOG_STEM),
        }
    }
}

impl McpArgs {
    /// Applies defaults and checks the merged options.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the socket host is empty or the timeout
    /// is zero.
    pub fn resolve(&self) -> Result<McpConfig, ConfigError> {
        let socket_host = self.socket_host.as_deref().unwrap_or(DEFAULT_HOST).trim();
        if socket_host.is_empty() {
            return Err(ConfigError::EmptyHost {
                field: "socket_host",
            });
        }
        let timeout_secs = positive(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            "request_timeout_secs",
        )?;

        Ok(McpConfig {
            backend: Endpoint::new(socket_host, self.socket_port.unwrap_or(DEFAULT_SOCKET_PORT)),
            request_timeout: seconds(timeout_secs),
            pool_size: self.pool_size.unwrap_or(DEFAULT_POOL_SIZE),
            logging: LoggingConfig::resolve(
                self.log_filter.as_deref(),
                self.log_level,
                self.log_format,
                self.log_to_file.unwrap_or(false),
                self.log_dir.as_deref(),
                MCP_LOG_STEM,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_the_local_socket_server() {
        let config = McpArgs::default().resolve().expect("resolve");
        assert_eq!(config, McpConfig::default());
        assert_eq!(config.backend, Endpoint::new("127.0.0.1", 9876));
        assert_eq!(config.request_timeout, Duration::from_secs(15));
    }

    #[test]
    fn parses_backend_flags() {
        let args = McpArgs::try_parse_from([
            "mcp",
            "--socket-host",
            "localhost",
            "--socket-port",
            "9100",
            "--pool-size",
            "0",
        ])
        .expect("parse");
        let config = args.resolve().expect("resolve");
        assert_eq!(config.backend, Endpoint::new("localhost", 9100));
        assert_eq!(config.pool_size, 0);
    }

    #[test]
    fn rejects_blank_socket_host() {
        let args = McpArgs {
            socket_host: Some(" ".to_owned()),
            ..McpArgs::default()
        };
        assert!(matches!(
            args.resolve(),
            Err(ConfigError::EmptyHost {
                field: "socket_host"
            })
        ));
    }
}
