//! Runner for the `scenelink` binary.
//!
//! `scenelink server` starts the socket command server and blocks until a
//! termination signal arrives. `scenelink rest` starts the REST proxy on a
//! Tokio runtime and stops on Ctrl-C. `scenelink mcp` answers MCP requests on
//! stdin until the client closes it; its logs go to `stderr` so stdout only
//! carries protocol messages. Each resolves its settings through
//! [`scenelink_config`], initialises telemetry, then hands over to the server
//! crate.
//!
//! Exit codes: `0` on clean shutdown, `1` when the server cannot start or
//! fails, `2` for argument and configuration errors.

mod cli;
mod telemetry;

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use scenelink_config::{
    McpArgs, McpConfig, ProxyConfig, RestArgs, ServerArgs, ServerConfig, load_mcp_config,
    load_proxy_config, load_server_config,
};
use scenelink_proxy::{McpServer, ProxyServer, ctrl_c};
use scenelinkd::{StructuredHealthReporter, SystemShutdownSignal, run_server};

use crate::cli::{Cli, CliCommand};

pub use telemetry::{TelemetryError, TelemetryHandle, initialise as initialise_telemetry};

const EXIT_USAGE: u8 = 2;

/// Parses `args`, runs the selected server and maps the outcome to an exit
/// code. Fatal errors are written to `stderr`.
pub fn run<I, E>(args: I, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            // Help and version requests are reported through the same path.
            error.print().ok();
            return ExitCode::from(u8::try_from(error.exit_code()).unwrap_or(EXIT_USAGE));
        }
    };
    match cli.command {
        CliCommand::Server(args) => server(&args, stderr),
        CliCommand::Rest(args) => rest(&args, stderr),
        CliCommand::Mcp(args) => mcp(&args, stderr),
    }
}

fn server<E: Write>(args: &ServerArgs, stderr: &mut E) -> ExitCode {
    match load_server_config(args) {
        Ok(config) => finish(serve_socket(&config), stderr),
        Err(error) => report(
            stderr,
            &anyhow::Error::new(error).context("invalid server configuration"),
            ExitCode::from(EXIT_USAGE),
        ),
    }
}

fn rest<E: Write>(args: &RestArgs, stderr: &mut E) -> ExitCode {
    match load_proxy_config(args) {
        Ok(config) => finish(serve_rest(&config), stderr),
        Err(error) => report(
            stderr,
            &anyhow::Error::new(error).context("invalid REST proxy configuration"),
            ExitCode::from(EXIT_USAGE),
        ),
    }
}

fn mcp<E: Write>(args: &McpArgs, stderr: &mut E) -> ExitCode {
    match load_mcp_config(args) {
        Ok(config) => finish(serve_mcp(&config), stderr),
        Err(error) => report(
            stderr,
            &anyhow::Error::new(error).context("invalid MCP server configuration"),
            ExitCode::from(EXIT_USAGE),
        ),
    }
}

fn serve_socket(config: &ServerConfig) -> anyhow::Result<()> {
    telemetry::initialise(&config.logging).context("failed to initialise logging")?;
    run_server(
        config,
        Arc::new(StructuredHealthReporter::new()),
        &SystemShutdownSignal,
    )
    .with_context(|| format!("command server on {} failed", config.endpoint))
}

fn serve_rest(config: &ProxyConfig) -> anyhow::Result<()> {
    telemetry::initialise(&config.logging).context("failed to initialise logging")?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    runtime
        .block_on(async {
            let proxy = ProxyServer::bind(config).await?;
            proxy.run(ctrl_c()).await
        })
        .with_context(|| format!("REST proxy on {} failed", config.listen))
}

fn serve_mcp(config: &McpConfig) -> anyhow::Result<()> {
    telemetry::initialise(&config.logging).context("failed to initialise logging")?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    runtime
        .block_on(async { McpServer::from_config(config)?.serve_stdio().await })
        .with_context(|| format!("MCP server for {} failed", config.backend))
}

fn finish<E: Write>(outcome: anyhow::Result<()>, stderr: &mut E) -> ExitCode {
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => report(stderr, &error, ExitCode::FAILURE),
    }
}

fn report<E: Write>(stderr: &mut E, error: &anyhow::Error, code: ExitCode) -> ExitCode {
    writeln!(stderr, "scenelink: {error:#}").ok();
    code
}
