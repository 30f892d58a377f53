//! Options for the `rest` subcommand.

use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_API_PORT, DEFAULT_HOST, DEFAULT_POOL_SIZE, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_SOCKET_PORT, seconds,
};
use crate::endpoint::Endpoint;
use crate::errors::ConfigError;
use crate::logging::{LogFormat, LogLevel, LoggingConfig};
use crate::server::positive;

/// Raw options for the HTTP proxy.
#[derive(Parser, Deserialize, Serialize, Default, Debug, Clone, PartialEq, OrthoConfig)]
#[command(name = "rest", about = "Run the REST proxy in front of the socket server")]
#[ortho_config(prefix = "SCENELINK_")]
pub struct RestArgs {
    /// Host of the socket command server.
    #[arg(long)]
    pub socket_host: Option<String>,
    /// Port of the socket command server.
    #[arg(long)]
    pub socket_port: Option<u16>,
    /// Loopback address the HTTP API listens on.
    #[arg(long)]
    pub api_host: Option<String>,
    /// Port the HTTP API listens on.
    #[arg(long)]
    pub api_port: Option<u16>,
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

/// Resolved proxy settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Socket command server the proxy forwards to.
    pub backend: Endpoint,
    /// HTTP listening endpoint.
    pub listen: Endpoint,
    /// Budget for one backend round-trip.
    pub request_timeout: Duration,
    /// Idle backend connections kept for reuse; zero disables pooling.
    pub pool_size: usize,
    /// Logging settings.
    pub logging: LoggingConfig,
}

const REST_LOG_STEM: &str = "scenelink-rest";

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            backend: Endpoint::new(DEFAULT_HOST, DEFAULT_SOCKET_PORT),
            listen: Endpoint::new(DEFAULT_HOST, DEFAULT_API_PORT),
            request_timeout: seconds(DEFAULT_REQUEST_TIMEOUT_SECS),
            pool_size: DEFAULT_POOL_SIZE,
            logging: LoggingConfig::resolve(None, None, None, false, None, REST_LOG_STEM),
        }
    }
}

impl RestArgs {
    /// Applies defaults and checks the merged options.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a host is empty, the timeout is zero, or
    /// the API would listen on the backend's own address.
    pub fn resolve(&self) -> Result<ProxyConfig, ConfigError> {
        let socket_host = self.socket_host.as_deref().unwrap_or(DEFAULT_HOST).trim();
        if socket_host.is_empty() {
            return Err(ConfigError::EmptyHost {
                field: "socket_host",
            });
        }
        let api_host = self.api_host.as_deref().unwrap_or(DEFAULT_HOST).trim();
        if api_host.is_empty() {
            return Err(ConfigError::EmptyHost { field: "api_host" });
        }
        let backend = Endpoint::new(socket_host, self.socket_port.unwrap_or(DEFAULT_SOCKET_PORT));
        let listen = Endpoint::new(api_host, self.api_port.unwrap_or(DEFAULT_API_PORT));
        if listen.port() != 0 && listen == backend {
            return Err(ConfigError::PortConflict {
                port: listen.port(),
            });
        }
        let timeout_secs = positive(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            "request_timeout_secs",
        )?;

        Ok(ProxyConfig {
            backend,
            listen,
            request_timeout: seconds(timeout_secs),
            pool_size: self.pool_size.unwrap_or(DEFAULT_POOL_SIZE),
            logging: LoggingConfig::resolve(
                self.log_filter.as_deref(),
                self.log_level,
                self.log_format,
                self.log_to_file.unwrap_or(false),
                self.log_dir.as_deref(),
                REST_LOG_STEM,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_distinct_ports() {
        let config = RestArgs::default().resolve().expect("resolve");
        assert_eq!(config, ProxyConfig::default());
        assert_eq!(config.backend.port(), 9876);
        assert_eq!(config.listen.port(), 7860);
        assert_eq!(config.request_timeout, Duration::from_secs(15));
    }

    #[test]
    fn parses_port_flags() {
        let args = RestArgs::try_parse_from(["rest", "--socket-port", "9100", "--api-port", "5000"])
            .expect("parse");
        let config = args.resolve().expect("resolve");
        assert_eq!(config.backend, Endpoint::new("127.0.0.1", 9100));
        assert_eq!(config.listen, Endpoint::new("127.0.0.1", 5000));
    }

    #[test]
    fn rejects_shared_port() {
        let args = RestArgs {
            socket_port: Some(8000),
            api_port: Some(8000),
            ..RestArgs::default()
        };
        let error = args.resolve().expect_err("conflict");
        assert!(matches!(error, ConfigError::PortConflict { port: 8000 }));
    }

    #[test]
    fn rejects_zero_timeout() {
        let args = RestArgs {
            request_timeout_secs: Some(0),
            ..RestArgs::default()
        };
        assert!(matches!(
            args.resolve(),
            Err(ConfigError::Zero {
                field: "request_timeout_secs"
            })
        ));
    }
}
