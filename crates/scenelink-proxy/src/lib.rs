//! HTTP front end for the scenelink command socket.
//!
//! The proxy exposes a small REST surface and forwards each command to the
//! socket server as one JSON line, returning the single reply line as the
//! HTTP body:
//!
//! | Method | Path | Behaviour |
//! |---|---|---|
//! | GET | `/mcp/status` | Liveness; never touches the socket. |
//! | GET | `/mcp/schema` | The embedded command schema, verbatim. |
//! | GET | `/mcp/schema/{command}` | One command's description. |
//! | POST | `/mcp/command` | Forwards `{"type", "params"}`. |
//! | POST | `/houdini/run` | Legacy `{"command", "args"}` form. |
//!
//! Protocol-level errors from the backend still return `200`: HTTP status
//! only describes the transport. Every proxy-side failure is itself an error
//! envelope, `400` for unusable bodies and `502` when the backend cannot be
//! reached in time.
//!
//! Like the socket server, the proxy binds loopback only.
//!
//! [`McpServer`] offers the same forwarding to agents as Model Context
//! Protocol tools over stdio.

mod backend;
mod errors;
mod mcp;
mod pool;
mod routes;
mod server;

pub use backend::BackendClient;
pub use errors::{BackendError, McpError, ProxyError};
pub use mcp::{
    DEFAULT_PROTOCOL_VERSION, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, McpServer,
    METHOD_NOT_FOUND, OBJECT_URI_PREFIX, PARSE_ERROR, RESOURCE_NOT_FOUND, RpcError, RpcResponse,
    SCENE_INFO_URI, SERVER_NAME,
};
pub use pool::BackendPool;
pub use routes::{ProxyState, router};
pub use server::{ProxyServer, ctrl_c};

pub(crate) const PROXY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::proxy");

#[cfg(test)]
mod tests;
