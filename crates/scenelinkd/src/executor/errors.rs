//! Errors raised while assembling the executor.

use scenelink_protocol::SchemaError;
use thiserror::Error;

/// Startup failures: the schema and the handler table must agree exactly.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The command schema failed to load.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A schema entry has no bound handler.
    #[error("command '{command}' is declared in the schema but has no handler")]
    MissingHandler {
        /// Command lacking a handler.
        command: String,
    },

    /// A handler is bound to a name the schema does not declare.
    #[error("handler registered for '{command}', which the schema does not declare")]
    UndeclaredHandler {
        /// Name the handler was bound to.
        command: String,
    },

    /// Two handlers were bound to the same name.
    #[error("a handler is already registered for '{command}'")]
    DuplicateHandler {
        /// Name bound twice.
        command: String,
    },
}
