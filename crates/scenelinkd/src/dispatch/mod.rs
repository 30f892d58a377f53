//! JSONL request dispatch for the command socket.
//!
//! This module reads newline-delimited command requests from a connection,
//! hands each to the [`CommandExecutor`](crate::executor::CommandExecutor)
//! and writes one envelope back per request, in arrival order:
//!
//! ```json
//! {"type":"create_node","params":{"node_type":"geo","node_name":"my_geometry"}}
//! ```
//!
//! ```json
//! {"status":"success","message":"Node created: /obj/my_geometry","node_path":"/obj/my_geometry"}
//! ```
//!
//! A request that is not JSON, or not a command object, gets an error
//! envelope and the connection stays open for the next line. Only an
//! oversized frame, an idle timeout or an I/O failure ends the connection.

mod errors;
mod handler;
mod response;

pub use self::errors::DispatchError;
pub use self::handler::{CommandConnectionHandler, ConnectionLimits};
pub use self::response::ResponseWriter;

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
