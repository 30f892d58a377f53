//! Response envelope shared by the socket server and the HTTP proxy.
//!
//! Every exchange yields exactly one [`CommandResponse`]. On the wire it is a
//! JSON object discriminated by `status`:
//!
//! ```json
//! {"status":"success","message":"Node created: /obj/geo1","node_path":"/obj/geo1"}
//! {"status":"error","message":"Unknown command: explode","code":"unknown_command"}
//! ```
//!
//! The `code` field is additive; clients that only read `status` and
//! `message` keep working.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

/// Message attached to successful responses that carry none of their own.
pub const DEFAULT_SUCCESS_MESSAGE: &str = "Command executed successfully";

const DEFAULT_ERROR_MESSAGE: &str = "An unknown error occurred";

/// Machine-readable classification carried by error envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCode {
    /// The command name is not registered.
    UnknownCommand,
    /// A required parameter was not supplied.
    MissingParam,
    /// An undeclared parameter was supplied.
    UnknownParam,
    /// A parameter value has the wrong JSON type.
    TypeMismatch,
    /// The message was not valid JSON.
    InvalidJson,
    /// The message was JSON but not a command object.
    MalformedCommand,
    /// The message exceeded the frame size limit.
    RequestTooLarge,
    /// A handler reported or raised a failure.
    HandlerFailure,
    /// The code execution capability is switched off.
    CodeExecutionDisabled,
    /// The proxy could not complete the socket round-trip.
    TransportError,
    /// The HTTP body could not be interpreted.
    InvalidRequest,
    /// The requested resource does not exist.
    NotFound,
}

/// Uniform result envelope for a single command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommandResponse {
    /// The command completed.
    Success {
        /// Human-readable summary.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        /// Handler-specific keys, flattened into the envelope.
        #[serde(flatten)]
        data: Map<String, Value>,
    },
    /// The command failed.
    Error {
        /// Human-readable failure description.
        message: String,
        /// Optional classification of the failure.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<ErrorCode>,
    },
}

impl CommandResponse {
    /// Builds a success envelope with the given message and data.
    pub fn success(message: impl Into<String>, data: Map<String, Value>) -> Self {
        Self::Success {
            message: Some(message.into()),
            data,
        }
    }

    /// Builds an error envelope with a classification code.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            code: Some(code),
        }
    }

    /// Returns `true` for success envelopes.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the envelope's message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success { message, .. } => message.as_deref(),
            Self::Error { message, .. } => Some(message),
        }
    }

    /// Returns the error code for error envelopes.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Success { .. } => None,
            Self::Error { code, .. } => *code,
        }
    }

    /// Returns the handler-specific data of a success envelope.
    #[must_use]
    pub const fn data(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Success { data, .. } => Some(data),
            Self::Error { .. } => None,
        }
    }

    /// Converts raw handler output into an envelope.
    ///
    /// Output that is not an object is rejected. An object whose `status` is
    /// `"error"` becomes an error. An object without `status` but with an
    /// `error` key also becomes an error carrying that value. Anything else
    /// is a success; a missing `message` is replaced by
    /// [`DEFAULT_SUCCESS_MESSAGE`].
    #[must_use]
    pub fn from_handler_output(output: Value) -> Self {
        let Value::Object(mut map) = output else {
            return Self::error(
                ErrorCode::HandlerFailure,
                format!("Invalid response format: {output}"),
            );
        };

        let status = map.shift_remove("status");
        let message = map.shift_remove("message").map(text_of);
        match status {
            Some(Value::String(state)) if state == "error" => Self::error(
                ErrorCode::HandlerFailure,
                message.unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_owned()),
            ),
            Some(Value::String(state)) if state == "success" => Self::Success {
                message: Some(message.unwrap_or_else(|| DEFAULT_SUCCESS_MESSAGE.to_owned())),
                data: map,
            },
            Some(other) => Self::error(
                ErrorCode::HandlerFailure,
                format!("Invalid response status: {other}"),
            ),
            None => match map.shift_remove("error") {
                Some(error) => Self::error(ErrorCode::HandlerFailure, text_of(error)),
                None => Self::Success {
                    message: Some(message.unwrap_or_else(|| DEFAULT_SUCCESS_MESSAGE.to_owned())),
                    data: map,
                },
            },
        }
    }

    /// Serialises the envelope to a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Success { message, data } => {
                let mut map = Map::with_capacity(data.len() + 2);
                map.insert("status".to_owned(), Value::from("success"));
                if let Some(text) = message {
                    map.insert("message".to_owned(), Value::from(text.as_str()));
                }
                for (key, value) in data {
                    map.insert(key.clone(), value.clone());
                }
                Value::Object(map)
            }
            Self::Error { message, code } => {
                let mut map = Map::with_capacity(3);
                map.insert("status".to_owned(), Value::from("error"));
                map.insert("message".to_owned(), Value::from(message.as_str()));
                if let Some(kind) = code {
                    map.insert("code".to_owned(), Value::from(kind.to_string()));
                }
                Value::Object(map)
            }
        }
    }
}

fn text_of(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
