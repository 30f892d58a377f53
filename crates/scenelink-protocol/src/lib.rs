//! Wire contract for the scenelink command protocol.
//!
//! Clients drive a host application by sending JSON command objects and
//! receiving JSON envelopes. This crate owns the parts of that contract that
//! both the socket server and the HTTP proxy depend on:
//!
//! - [`SchemaRegistry`]: the static command table, validated at load and
//!   shared read-only afterwards.
//! - [`CommandRequest`]: decoding of one inbound message.
//! - [`CommandResponse`]: the `status`/`message` envelope and its optional
//!   [`ErrorCode`].

mod errors;
mod request;
mod response;
mod schema;

pub use errors::{RequestError, SchemaError, ValidationError};
pub use request::CommandRequest;
pub use response::{CommandResponse, DEFAULT_SUCCESS_MESSAGE, ErrorCode};
pub use schema::{
    COMMAND_SCHEMA_JSON, CommandSpec, ParamSpec, ParamType, SchemaRegistry, TypeSpec,
    json_type_name,
};

#[cfg(test)]
mod tests;
