//! JSON-RPC 2.0 envelopes used by the MCP stdio transport.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub(crate) const JSONRPC_VERSION: &str = "2.0";

/// Body could not be parsed as JSON.
pub const PARSE_ERROR: i64 = -32_700;
/// JSON was valid but not a request object.
pub const INVALID_REQUEST: i64 = -32_600;
/// No handler for the method.
pub const METHOD_NOT_FOUND: i64 = -32_601;
/// Parameters were missing or had the wrong shape.
pub const INVALID_PARAMS: i64 = -32_602;
/// The server failed while handling a valid request.
pub const INTERNAL_ERROR: i64 = -32_603;
/// The requested resource does not exist.
pub const RESOURCE_NOT_FOUND: i64 = -32_002;

/// One inbound request or notification.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RpcRequest {
    pub(crate) jsonrpc: String,
    /// Absent for notifications.
    #[serde(default)]
    pub(crate) id: Option<Value>,
    pub(crate) method: String,
    #[serde(default)]
    pub(crate) params: Value,
}

/// Error member of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RpcError {
    /// JSON-RPC error code.
    pub code: i64,
    /// Human-readable description.
    pub message: String,
}

/// Outbound response carrying either a result or an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

impl RpcResponse {
    /// Successful response to request `id`.
    #[must_use]
    pub const fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Error response to request `id`; `Value::Null` when it is unknown.
    #[must_use]
    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }

    /// Returns the result member, if any.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Returns the error member, if any.
    #[must_use]
    pub const fn rpc_error(&self) -> Option<&RpcError> {
        self.error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn success_omits_the_error_member() {
        let response = RpcResponse::success(json!(1), json!({}));
        assert_eq!(
            serde_json::to_value(&response).expect("serialise"),
            json!({"jsonrpc": "2.0", "id": 1, "result": {}})
        );
    }

    #[test]
    fn error_keeps_a_null_id() {
        let response = RpcResponse::error(Value::Null, PARSE_ERROR, "Parse error");
        assert_eq!(
            serde_json::to_value(&response).expect("serialise"),
            json!({"jsonrpc": "2.0", "id": null, "error": {"code": -32700, "message": "Parse error"}})
        );
    }

    #[test]
    fn notifications_have_no_id() {
        let request: RpcRequest =
            serde_json::from_value(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
                .expect("parse");
        assert!(request.id.is_none());
        assert!(request.params.is_null());
    }
}
