//! Error types for schema loading, parameter validation and request decoding.
//!
//! Each error maps onto an [`ErrorCode`] so the boundary that catches it can
//! build an error envelope without re-classifying the failure.

use thiserror::Error;

use crate::response::ErrorCode;

/// Errors raised while loading the command schema.
///
/// Any of these is fatal at startup: a registry that fails its own
/// consistency checks must never serve requests.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema document is not valid JSON or does not match the layout.
    #[error("failed to parse command schema: {0}")]
    Parse(#[source] serde_json::Error),

    /// A required parameter is not declared in the parameter table.
    #[error("command '{command}' requires undeclared parameter '{param}'")]
    UndeclaredRequired {
        /// Command owning the parameter list.
        command: String,
        /// Required name missing from `params`.
        param: String,
    },

    /// A parameter appears more than once in `required_params`.
    #[error("command '{command}' lists required parameter '{param}' more than once")]
    DuplicateRequired {
        /// Command owning the parameter list.
        command: String,
        /// Repeated parameter name.
        param: String,
    },

    /// A required parameter also declares a default.
    #[error("command '{command}' declares a default for required parameter '{param}'")]
    RequiredWithDefault {
        /// Command owning the parameter.
        command: String,
        /// Parameter carrying both markers.
        param: String,
    },

    /// A union type lists no members.
    #[error("parameter '{param}' of command '{command}' has an empty type union")]
    EmptyUnion {
        /// Command owning the parameter.
        command: String,
        /// Parameter with the empty union.
        param: String,
    },

    /// A declared default does not match the parameter's own type.
    #[error(
        "default for parameter '{param}' of command '{command}' is {actual}, expected {expected}"
    )]
    DefaultTypeMismatch {
        /// Command owning the parameter.
        command: String,
        /// Parameter whose default is wrong.
        param: String,
        /// Declared type, rendered as `a|b`.
        expected: String,
        /// JSON type of the default.
        actual: &'static str,
    },
}

/// Errors raised while validating a command's parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The command name is not registered.
    #[error("Unknown command: {name}")]
    UnknownCommand {
        /// Name the client sent.
        name: String,
    },

    /// A required parameter was absent or null.
    #[error("Missing required parameter: {name}")]
    MissingParam {
        /// First missing parameter, in declaration order.
        name: String,
    },

    /// The client supplied a parameter the command does not declare.
    #[error("Unknown parameter: {name}")]
    UnknownParam {
        /// First undeclared parameter, in input order.
        name: String,
    },

    /// A supplied value does not match the declared type.
    #[error("Invalid type for parameter '{name}': expected {expected}, got {actual}")]
    TypeMismatch {
        /// Parameter name.
        name: String,
        /// Declared type, rendered as `a|b`.
        expected: String,
        /// JSON type actually supplied.
        actual: &'static str,
    },
}

impl ValidationError {
    /// Returns the wire code for this failure.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownCommand { .. } => ErrorCode::UnknownCommand,
            Self::MissingParam { .. } => ErrorCode::MissingParam,
            Self::UnknownParam { .. } => ErrorCode::UnknownParam,
            Self::TypeMismatch { .. } => ErrorCode::TypeMismatch,
        }
    }

    /// Creates an unknown command error.
    pub fn unknown_command(name: impl Into<String>) -> Self {
        Self::UnknownCommand { name: name.into() }
    }

    /// Creates a missing parameter error.
    pub fn missing_param(name: impl Into<String>) -> Self {
        Self::MissingParam { name: name.into() }
    }

    /// Creates an unknown parameter error.
    pub fn unknown_param(name: impl Into<String>) -> Self {
        Self::UnknownParam { name: name.into() }
    }
}

/// Errors raised while decoding one inbound message into a request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The message is not valid JSON.
    #[error("Invalid JSON: {message}")]
    InvalidJson {
        /// Parser diagnostic.
        message: String,
        /// Underlying parser error, when one exists.
        #[source]
        source: Option<serde_json::Error>,
    },

    /// The message is JSON but not a `{type, params}` object.
    #[error("Malformed command: {reason}")]
    Malformed {
        /// What was wrong with the shape.
        reason: String,
    },
}

impl RequestError {
    /// Returns the wire code for this failure.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidJson { .. } => ErrorCode::InvalidJson,
            Self::Malformed { .. } => ErrorCode::MalformedCommand,
        }
    }

    /// Creates an invalid JSON error from a serde error.
    #[must_use]
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::InvalidJson {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates an invalid JSON error with a custom message.
    pub fn invalid_json(message: impl Into<String>) -> Self {
        Self::InvalidJson {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a malformed command error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}
