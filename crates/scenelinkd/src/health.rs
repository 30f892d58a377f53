//! Structured health reporting for server lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use scenelink_config::ServerConfig;

use crate::bootstrap::BootstrapError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
#[cfg_attr(test, mockall::automock)]
pub trait HealthReporter: Send + Sync {
    /// Invoked before the registry and handlers are assembled.
    fn bootstrap_starting(&self);

    /// Invoked once the command socket is bound.
    fn listener_bound(&self, addr: SocketAddr);

    /// Invoked after the accept loop is running.
    fn bootstrap_succeeded(&self, config: &ServerConfig);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked after the accept loop has stopped.
    fn shutdown(&self);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn listener_bound(&self, addr: SocketAddr) {
        (**self).listener_bound(addr);
    }

    fn bootstrap_succeeded(&self, config: &ServerConfig) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn shutdown(&self) {
        (**self).shutdown();
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting command server bootstrap"
        );
    }

    fn listener_bound(&self, addr: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "listener_bound",
            %addr,
            "command socket bound"
        );
    }

    fn bootstrap_succeeded(&self, config: &ServerConfig) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            endpoint = %config.endpoint,
            allow_remote = config.allow_remote,
            code_execution = config.code_execution.enabled,
            idle_timeout_secs = config.idle_timeout.as_secs(),
            max_message_bytes = config.max_message_bytes,
            "command server ready"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "command server bootstrap failed"
        );
    }

    fn shutdown(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "shutdown",
            "command server stopped"
        );
    }
}
