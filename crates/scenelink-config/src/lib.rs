//! Configuration for the scenelink servers.
//!
//! Each subcommand has a raw argument struct that derives both `clap` and
//! `OrthoConfig`. Values are layered from the `[cmds.<name>]` table of
//! `.scenelink.toml`, then `SCENELINK_CMDS_<NAME>_*` environment variables,
//! then command-line flags. [`ServerArgs::resolve`], [`RestArgs::resolve`]
//! and [`McpArgs::resolve`] apply defaults and produce the plain settings
//! the servers consume.

mod defaults;
mod endpoint;
mod errors;
mod logging;
mod mcp;
mod proxy;
mod server;

pub use defaults::{
    DEFAULT_API_PORT, DEFAULT_CODE_INTERPRETER, DEFAULT_CODE_TIMEOUT_SECS, DEFAULT_HOST,
    DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_LOG_DIR, DEFAULT_LOG_FILTER, DEFAULT_MAX_MESSAGE_BYTES,
    DEFAULT_POOL_SIZE, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SOCKET_PORT,
};
pub use endpoint::Endpoint;
pub use errors::ConfigError;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use mcp::{McpArgs, McpConfig};
pub use proxy::{ProxyConfig, RestArgs};
pub use server::{CodeExecutionConfig, ServerArgs, ServerConfig};

use ortho_config::SubcmdConfigMerge;

/// Merges file and environment layers under the parsed `server` flags.
///
/// # Errors
///
/// Returns [`ConfigError::Load`] when a layer cannot be read or merged and
/// the resolution errors of [`ServerArgs::resolve`].
pub fn load_server_config(cli: &ServerArgs) -> Result<ServerConfig, ConfigError> {
    cli.load_and_merge()?.resolve()
}

/// Merges file and environment layers under the parsed `rest` flags.
///
/// # Errors
///
/// Returns [`ConfigError::Load`] when a layer cannot be read or merged and
/// the resolution errors of [`RestArgs::resolve`].
pub fn load_proxy_config(cli: &RestArgs) -> Result<ProxyConfig, ConfigError> {
    cli.load_and_merge()?.resolve()
}

/// Merges file and environment layers under the parsed `mcp` flags.
///
/// # Errors
///
/// Returns [`ConfigError::Load`] when a layer cannot be read or merged and
/// the resolution errors of [`McpArgs::resolve`].
pub fn load_mcp_config(cli: &McpArgs) -> Result<McpConfig, ConfigError> {
    cli.load_and_merge()?.resolve()
}
