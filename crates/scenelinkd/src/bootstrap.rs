//! Command server bootstrap orchestration.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use scenelink_config::ServerConfig;
use scenelink_protocol::{SchemaError, SchemaRegistry};

use crate::dispatch::{CommandConnectionHandler, ConnectionLimits};
use crate::executor::{
    CodeRunner, CommandExecutor, DisabledCodeRunner, ExecutorError, ProcessCodeRunner,
};
use crate::health::HealthReporter;
use crate::scene::{SceneHost, scene_handlers};
use crate::shutdown::{ShutdownError, ShutdownSignal};
use crate::transport::{ListenerError, ListenerHandle, SocketListener};

const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");

/// Errors surfaced while starting or stopping the command server.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The embedded command schema failed to load.
    #[error("failed to load command schema: {source}")]
    Schema {
        /// Underlying schema error.
        #[source]
        source: SchemaError,
    },
    /// The handler table does not match the schema.
    #[error("failed to assemble command handlers: {source}")]
    Executor {
        /// Underlying executor error.
        #[source]
        source: ExecutorError,
    },
    /// The command socket could not be bound or served.
    #[error("command socket failed: {source}")]
    Listener {
        /// Underlying listener error.
        #[source]
        source: ListenerError,
    },
    /// Termination signals could not be observed.
    #[error("failed to wait for shutdown: {source}")]
    Signals {
        /// Underlying signal error.
        #[source]
        source: ShutdownError,
    },
}

/// Command server whose accept loop is running.
pub struct RunningServer {
    listener: ListenerHandle,
    local_addr: Option<SocketAddr>,
    reporter: Arc<dyn HealthReporter>,
}

impl RunningServer {
    /// Returns the bound address, useful when the configured port was 0.
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Stops accepting connections and waits for the accept loop to exit.
    ///
    /// Connections already being served finish on their own threads.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Listener`] when the accept loop panicked.
    pub fn stop(self) -> Result<(), BootstrapError> {
        self.listener.shutdown();
        self.listener
            .join()
            .map_err(|source| BootstrapError::Listener { source })?;
        self.reporter.shutdown();
        Ok(())
    }
}

impl fmt::Debug for RunningServer {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RunningServer")
            .field("listener", &self.listener)
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}

/// Assembles the executor and starts serving `config.endpoint`.
///
/// Each stage reports failures through `reporter` before returning them.
///
/// # Errors
///
/// Returns [`BootstrapError`] when the schema, the handler table or the
/// listener cannot be set up.
pub fn start_server(
    config: &ServerConfig,
    reporter: Arc<dyn HealthReporter>,
) -> Result<RunningServer, BootstrapError> {
    reporter.bootstrap_starting();

    let registry = match SchemaRegistry::builtin() {
        Ok(registry) => registry,
        Err(source) => {
            let error = BootstrapError::Schema { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let host = Arc::new(SceneHost::new());
    let executor = match scene_handlers(&host, code_runner(config))
        .and_then(|table| CommandExecutor::new(registry, table))
    {
        Ok(executor) => executor,
        Err(source) => {
            let error = BootstrapError::Executor { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let listener = match SocketListener::bind(&config.endpoint, config.allow_remote) {
        Ok(listener) => listener,
        Err(source) => {
            let error = BootstrapError::Listener { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };
    let local_addr = listener.local_addr();
    if let Some(addr) = local_addr {
        reporter.listener_bound(addr);
    }

    let handler = Arc::new(CommandConnectionHandler::new(
        Arc::new(executor),
        ConnectionLimits::from_config(config),
    ));
    let handle = match listener.start(handler) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Listener { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    reporter.bootstrap_succeeded(config);
    Ok(RunningServer {
        listener: handle,
        local_addr,
        reporter,
    })
}

/// Runs the command server until `signal` fires, then stops it.
///
/// # Errors
///
/// Returns [`BootstrapError`] when startup fails, when the signal source
/// cannot be installed, or when the accept loop panicked.
pub fn run_server(
    config: &ServerConfig,
    reporter: Arc<dyn HealthReporter>,
    signal: &dyn ShutdownSignal,
) -> Result<(), BootstrapError> {
    let server = start_server(config, reporter)?;
    let waited = signal.wait();
    if let Ok(reason) = &waited {
        info!(target: BOOTSTRAP_TARGET, %reason, "stopping command server");
    }
    server.stop()?;
    waited
        .map(|_reason| ())
        .map_err(|source| BootstrapError::Signals { source })
}

fn code_runner(config: &ServerConfig) -> Arc<dyn CodeRunner> {
    let settings = &config.code_execution;
    if settings.enabled {
        warn!(
            target: BOOTSTRAP_TARGET,
            interpreter = %settings.interpreter,
            timeout_secs = settings.timeout.as_secs(),
            "code execution is enabled; clients can run arbitrary code in this process's account"
        );
        Arc::new(ProcessCodeRunner::new(
            settings.interpreter.clone(),
            settings.timeout,
        ))
    } else {
        Arc::new(DisabledCodeRunner)
    }
}
