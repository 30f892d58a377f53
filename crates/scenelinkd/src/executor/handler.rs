//! Handler abstractions bound to command names.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use super::code::CodeRunner;
use super::errors::ExecutorError;

/// Validated parameters handed to a handler, defaults already applied.
pub type Params = Map<String, Value>;

/// Name of the catalogue command served by the executor itself.
pub const LIST_COMMANDS: &str = "list_available_commands";

/// Failure reported by a handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Creates a handler error carrying a client-facing message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the client-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Performs the effect of one command against the host application.
///
/// Handlers receive parameters that already passed schema validation. The
/// returned value is normalised into an envelope by the executor, so a
/// handler may return either a full `{status, message, ...}` object or just
/// the data keys.
pub trait CommandHandler: Send + Sync {
    /// Runs the command.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] when the host rejects the operation.
    fn call(&self, params: &Params) -> Result<Value, HandlerError>;
}

impl<F> CommandHandler for F
where
    F: Fn(&Params) -> Result<Value, HandlerError> + Send + Sync,
{
    fn call(&self, params: &Params) -> Result<Value, HandlerError> {
        self(params)
    }
}

/// What the executor does for a command name.
#[derive(Clone)]
pub enum Handler {
    /// Ordinary host operation.
    Scene(Arc<dyn CommandHandler>),
    /// Runs caller-supplied source code with the privileges of this process.
    ///
    /// This is the trust boundary of the whole protocol: there is no
    /// authentication, so any peer that can reach the socket can run code.
    /// It is kept as its own variant so it cannot be mistaken for, or
    /// wrapped like, an ordinary scene operation.
    CodeExecution(Arc<dyn CodeRunner>),
    /// Lists the registered command names; touches no collaborator.
    Catalogue,
}

impl fmt::Debug for Handler {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Scene(_) => "Scene",
            Self::CodeExecution(_) => "CodeExecution",
            Self::Catalogue => "Catalogue",
        };
        formatter.write_str(label)
    }
}

/// Mapping from command name to handler, assembled before the executor starts.
#[derive(Debug, Clone)]
pub struct HandlerTable {
    entries: HashMap<String, Handler>,
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerTable {
    /// Creates a table holding only the built-in catalogue command.
    #[must_use]
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(LIST_COMMANDS.to_owned(), Handler::Catalogue);
        Self { entries }
    }

    /// Binds an ordinary handler to `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::DuplicateHandler`] when `name` is already
    /// bound.
    pub fn register<H>(&mut self, name: &str, handler: H) -> Result<(), ExecutorError>
    where
        H: CommandHandler + 'static,
    {
        self.insert(name, Handler::Scene(Arc::new(handler)))
    }

    /// Binds the code execution capability to `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::DuplicateHandler`] when `name` is already
    /// bound.
    pub fn register_code_runner(
        &mut self,
        name: &str,
        runner: Arc<dyn CodeRunner>,
    ) -> Result<(), ExecutorError> {
        self.insert(name, Handler::CodeExecution(runner))
    }

    fn insert(&mut self, name: &str, handler: Handler) -> Result<(), ExecutorError> {
        if self.entries.contains_key(name) {
            return Err(ExecutorError::DuplicateHandler {
                command: name.to_owned(),
            });
        }
        self.entries.insert(name.to_owned(), handler);
        Ok(())
    }

    /// Returns the bound command names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub(super) fn into_entries(self) -> HashMap<String, Handler> {
        self.entries
    }
}
