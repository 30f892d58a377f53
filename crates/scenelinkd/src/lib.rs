//! Command server for scenelink.
//!
//! The server accepts newline-delimited JSON commands over TCP and answers
//! each one with a single JSON envelope. Every request flows through the same
//! pipeline: the transport frames bytes into documents, the dispatcher
//! decodes them into [`scenelink_protocol::CommandRequest`] values, and the
//! [`CommandExecutor`] validates parameters against the embedded schema
//! before invoking the bound handler.
//!
//! The executor never fails. Unknown commands, validation errors, handler
//! errors and handler panics all come back as error envelopes, so a single
//! bad request cannot take down a worker or the process.
//!
//! ## Handlers
//!
//! The default handler set is an in-memory [`SceneHost`] holding a node graph
//! with the `/obj`, `/shop`, `/mat` and `/out` contexts. It lets the whole
//! system run end to end without a host application attached.
//!
//! `execute_houdini_code` is bound to a [`CodeRunner`] rather than to the
//! scene. It stays disabled unless the operator opts in, because anyone who
//! can reach the socket can then run arbitrary code with the server's
//! privileges.
//!
//! ## Lifecycle
//!
//! [`start_server`] assembles the executor, binds the socket (loopback only
//! unless `allow_remote` is set) and starts the accept loop. [`run_server`]
//! additionally blocks until a termination signal arrives. Each stage emits
//! structured events through a [`HealthReporter`].

mod bootstrap;
mod dispatch;
mod executor;
mod health;
mod scene;
mod shutdown;
mod transport;

pub use bootstrap::{BootstrapError, RunningServer, run_server, start_server};
pub use dispatch::{CommandConnectionHandler, ConnectionLimits, DispatchError, ResponseWriter};
pub use executor::{
    CodeOutput, CodeRunError, CodeRunner, CommandExecutor, CommandHandler, DisabledCodeRunner,
    ExecutorError, Handler, HandlerError, HandlerTable, LIST_COMMANDS, Params, ProcessCodeRunner,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use scene::{CODE_EXECUTION_COMMAND, SceneHost, scene_handlers};
pub use shutdown::{ShutdownError, ShutdownSignal, StopReason, SystemShutdownSignal};
pub use transport::{ConnectionHandler, ListenerError, ListenerHandle, SocketListener};

#[cfg(test)]
mod tests;
