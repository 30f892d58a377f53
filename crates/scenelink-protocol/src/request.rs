//! Request decoding for inbound command messages.
//!
//! A request is a JSON object with a `type` naming the command and an optional
//! `params` object. Extra top-level keys are ignored so older clients that
//! attach bookkeeping fields keep working.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::RequestError;

/// Parsed command invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandRequest {
    #[serde(rename = "type")]
    command_type: String,
    params: Map<String, Value>,
}

impl CommandRequest {
    /// Builds a request from its parts.
    pub fn new(command_type: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            command_type: command_type.into(),
            params,
        }
    }

    /// Parses one framed message into a request.
    ///
    /// Trailing whitespace (including the newline delimiter) is trimmed before
    /// parsing.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidJson`] when the bytes are empty or not
    /// JSON, and [`RequestError::Malformed`] when the JSON does not have the
    /// request shape.
    pub fn parse(line: &[u8]) -> Result<Self, RequestError> {
        let trimmed = trim_trailing_whitespace(line);
        if trimmed.is_empty() {
            return Err(RequestError::invalid_json("empty message"));
        }
        let value: Value = serde_json::from_slice(trimmed).map_err(RequestError::from_json_error)?;
        Self::from_value(value)
    }

    /// Interprets an already decoded JSON value as a request.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Malformed`] when the value is not an object,
    /// when `type` is missing, empty or not a string, or when `params` is
    /// present but not an object. A `null` `params` is treated as empty.
    /// The command name is kept exactly as sent.
    pub fn from_value(value: Value) -> Result<Self, RequestError> {
        let Value::Object(mut object) = value else {
            return Err(RequestError::malformed("expected a JSON object"));
        };

        let command_type = match object.shift_remove("type") {
            Some(Value::String(name)) if !name.is_empty() => name,
            Some(Value::String(_)) => {
                return Err(RequestError::malformed("'type' must not be empty"));
            }
            Some(_) => return Err(RequestError::malformed("'type' must be a string")),
            None => return Err(RequestError::malformed("missing 'type' field")),
        };

        let params = match object.shift_remove("params") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(params)) => params,
            Some(_) => return Err(RequestError::malformed("'params' must be an object")),
        };

        Ok(Self {
            command_type,
            params,
        })
    }

    /// Returns the command name.
    #[must_use]
    pub fn command_type(&self) -> &str {
        &self.command_type
    }

    /// Returns the supplied parameters.
    #[must_use]
    pub const fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    /// Serialises the request as one newline-terminated line.
    ///
    /// # Errors
    ///
    /// Returns the serialiser's error; a request built from JSON values
    /// cannot normally fail to serialise.
    pub fn to_line(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }
}

/// Trims trailing ASCII whitespace from a byte slice.
fn trim_trailing_whitespace(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |pos| pos + 1);
    bytes.get(..end).unwrap_or_default()
}
