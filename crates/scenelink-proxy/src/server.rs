//! Binding and serving the REST API.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use scenelink_config::ProxyConfig;
use scenelink_protocol::SchemaRegistry;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::PROXY_TARGET;
use super::backend::BackendClient;
use super::errors::ProxyError;
use super::routes::{ProxyState, router};

/// REST proxy bound to its listen address, ready to serve.
#[derive(Debug)]
pub struct ProxyServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    app: Router,
}

impl ProxyServer {
    /// Loads the schema, builds the backend client and binds the listener.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError`] when the schema fails to load, when the listen
    /// address cannot be resolved or bound, or when it is not loopback.
    pub async fn bind(config: &ProxyConfig) -> Result<Self, ProxyError> {
        let registry =
            SchemaRegistry::builtin().map_err(|source| ProxyError::Schema { source })?;
        let addr = resolve_loopback(&config.listen.authority()).await?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ProxyError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ProxyError::Bind { addr, source })?;
        let backend = Arc::new(BackendClient::new(
            config.backend.authority(),
            config.pool_size,
            config.request_timeout,
        ));
        info!(
            target: PROXY_TARGET,
            %local_addr,
            backend = %config.backend,
            pool_size = config.pool_size,
            timeout_secs = config.request_timeout.as_secs(),
            "REST API bound"
        );
        Ok(Self {
            listener,
            local_addr,
            app: router(ProxyState::new(registry, backend)),
        })
    }

    /// Returns the bound address, useful when the configured port was 0.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves requests until `shutdown` resolves, then drains in-flight ones.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Serve`] when the HTTP server fails.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ProxyError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|source| ProxyError::Serve { source })?;
        info!(target: PROXY_TARGET, "REST API stopped");
        Ok(())
    }
}

/// Resolves when the process receives Ctrl-C.
///
/// Never resolves when the handler cannot be installed.
pub async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!(target: PROXY_TARGET, "shutdown signal received"),
        Err(error) => {
            warn!(target: PROXY_TARGET, %error, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}

async fn resolve_loopback(authority: &str) -> Result<SocketAddr, ProxyError> {
    let addr = tokio::net::lookup_host(authority)
        .await
        .map_err(|source| ProxyError::Resolve {
            authority: authority.to_owned(),
            source,
        })?
        .next()
        .ok_or_else(|| ProxyError::ResolveEmpty {
            authority: authority.to_owned(),
        })?;
    if addr.ip().is_loopback() {
        Ok(addr)
    } else {
        Err(ProxyError::NonLoopback { addr })
    }
}
