//! Command-line surface of the `scenelink` binary.

use clap::{Parser, Subcommand};

use scenelink_config::{McpArgs, RestArgs, ServerArgs};

/// Command protocol servers for driving a scene host over JSON.
#[derive(Parser, Debug)]
#[command(name = "scenelink", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Server to run.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Subcommands accepted by the binary.
#[derive(Subcommand, Debug)]
pub(crate) enum CliCommand {
    /// Runs the JSON-lines socket command server.
    Server(ServerArgs),
    /// Runs the REST proxy in front of a socket command server.
    Rest(RestArgs),
    /// Serves the socket server's commands as MCP tools on stdin and stdout.
    Mcp(McpArgs),
}
