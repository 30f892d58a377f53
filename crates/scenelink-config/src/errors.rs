use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

/// Errors raised while loading or resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Layered loading (file, environment, CLI) failed.
    #[error("failed to load configuration: {0}")]
    Load(#[source] Arc<OrthoError>),

    /// A value that must be positive was zero.
    #[error("{field} must be greater than zero")]
    Zero {
        /// Name of the offending option.
        field: &'static str,
    },

    /// A host option was empty.
    #[error("{field} must not be empty")]
    EmptyHost {
        /// Name of the offending option.
        field: &'static str,
    },

    /// The proxy would listen on the socket server's own address.
    #[error("api port {port} collides with the socket server port")]
    PortConflict {
        /// Port given to both servers.
        port: u16,
    },
}

impl From<OrthoError> for ConfigError {
    fn from(error: OrthoError) -> Self {
        Self::Load(Arc::new(error))
    }
}

impl From<Arc<OrthoError>> for ConfigError {
    fn from(error: Arc<OrthoError>) -> Self {
        Self::Load(error)
    }
}
