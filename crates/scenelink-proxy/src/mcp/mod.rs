//! Model Context Protocol server on stdio.
//!
//! Agents speak newline-delimited JSON-RPC 2.0 on stdin and stdout. Each
//! registry command is offered as a tool, and a tool call is forwarded to
//! the socket server through the same [`BackendClient`] the REST proxy uses.
//! Requests are answered one at a time in arrival order; notifications are
//! never answered.
//!
//! A command that fails at the protocol level is still a successful tool
//! call whose result has `isError` set, so the agent sees the server's
//! message. JSON-RPC errors are reserved for malformed requests, unknown
//! tools and unreadable resources.

mod catalogue;
mod rpc;

use std::sync::Arc;

use scenelink_config::McpConfig;
use scenelink_protocol::SchemaRegistry;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::backend::BackendClient;
use crate::errors::{BackendError, McpError};

pub use self::catalogue::{OBJECT_URI_PREFIX, SCENE_INFO_URI};
pub use self::rpc::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
    RESOURCE_NOT_FOUND, RpcError, RpcResponse,
};

use self::catalogue::{resolve_resource, resource_contents, resource_templates, resources, tools};
use self::rpc::{JSONRPC_VERSION, RpcRequest};

const MCP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::mcp");

/// Protocol revision offered when the client does not name one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "scenelink";

#[derive(Debug, Deserialize)]
struct ToolCall {
    name: String,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct ResourceRead {
    uri: String,
}

/// MCP front end for the socket command server.
#[derive(Debug, Clone)]
pub struct McpServer {
    registry: &'static SchemaRegistry,
    backend: Arc<BackendClient>,
}

impl McpServer {
    /// Builds a server from its parts.
    #[must_use]
    pub const fn new(registry: &'static SchemaRegistry, backend: Arc<BackendClient>) -> Self {
        Self { registry, backend }
    }

    /// Builds a server forwarding to the backend named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::Schema`] when the embedded schema fails to load.
    pub fn from_config(config: &McpConfig) -> Result<Self, McpError> {
        let registry = SchemaRegistry::builtin().map_err(|source| McpError::Schema { source })?;
        let backend = BackendClient::new(
            config.backend.authority(),
            config.pool_size,
            config.request_timeout,
        );
        Ok(Self::new(registry, Arc::new(backend)))
    }

    /// Serves the process's stdin and stdout until stdin closes.
    ///
    /// # Errors
    ///
    /// See [`McpServer::serve`].
    pub async fn serve_stdio(&self) -> Result<(), McpError> {
        info!(
            target: MCP_TARGET,
            backend = %self.backend.authority(),
            "MCP server reading from stdin"
        );
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Answers newline-delimited requests from `reader` on `writer`.
    ///
    /// # Errors
    ///
    /// Returns [`McpError`] when either stream fails. Malformed requests are
    /// answered, not returned as errors.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<(), McpError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = reader
                .read_until(b'\n', &mut line)
                .await
                .map_err(|source| McpError::Read { source })?;
            if read == 0 {
                break;
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let Some(response) = self.handle_message(&line).await else {
                continue;
            };
            let mut encoded =
                serde_json::to_vec(&response).map_err(|source| McpError::Encode { source })?;
            encoded.push(b'\n');
            writer
                .write_all(&encoded)
                .await
                .map_err(|source| McpError::Write { source })?;
            writer
                .flush()
                .await
                .map_err(|source| McpError::Write { source })?;
        }
        info!(target: MCP_TARGET, "MCP client closed its input");
        Ok(())
    }

    /// Handles one raw message; `None` means nothing is sent back.
    pub(crate) async fn handle_message(&self, bytes: &[u8]) -> Option<RpcResponse> {
        let value: Value = match serde_json::from_slice(bytes) {
            Ok(value) => value,
            Err(error) => {
                return Some(RpcResponse::error(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {error}"),
                ));
            }
        };
        if value.is_array() {
            return Some(RpcResponse::error(
                Value::Null,
                INVALID_REQUEST,
                "Batch requests are not supported",
            ));
        }
        let id = value.get("id").cloned().unwrap_or(Value::Null);
        let request: RpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(error) => {
                return Some(RpcResponse::error(
                    id,
                    INVALID_REQUEST,
                    format!("Invalid request: {error}"),
                ));
            }
        };
        if request.jsonrpc != JSONRPC_VERSION {
            return Some(RpcResponse::error(
                id,
                INVALID_REQUEST,
                format!("Unsupported jsonrpc version: {}", request.jsonrpc),
            ));
        }
        self.dispatch(request).await
    }

    async fn dispatch(&self, request: RpcRequest) -> Option<RpcResponse> {
        let Some(id) = request.id else {
            debug!(target: MCP_TARGET, method = %request.method, "notification received");
            return None;
        };
        debug!(target: MCP_TARGET, method = %request.method, "request received");
        let response = match request.method.as_str() {
            "initialize" => RpcResponse::success(id, self.initialize(&request.params)),
            "ping" => RpcResponse::success(id, json!({})),
            "tools/list" => RpcResponse::success(id, tools(self.registry)),
            "tools/call" => self.call_tool(id, request.params).await,
            "resources/list" => RpcResponse::success(id, resources()),
            "resources/templates/list" => RpcResponse::success(id, resource_templates()),
            "resources/read" => self.read_resource(id, request.params).await,
            other => RpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {other}")),
        };
        Some(response)
    }

    fn initialize(&self, params: &Value) -> Value {
        let version = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);
        json!({
            "protocolVersion": version,
            "capabilities": {
                "tools": {"listChanged": false},
                "resources": {"subscribe": false, "listChanged": false},
            },
            "serverInfo": {"name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION")},
            "instructions": format!(
                "Each tool runs the scenelink command of the same name (schema {}).",
                self.registry.version()
            ),
        })
    }

    async fn call_tool(&self, id: Value, params: Value) -> RpcResponse {
        let call: ToolCall = match serde_json::from_value(params) {
            Ok(call) => call,
            Err(error) => {
                return RpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {error}"));
            }
        };
        if self.registry.lookup(&call.name).is_err() {
            return RpcResponse::error(id, INVALID_PARAMS, format!("Unknown tool: {}", call.name));
        }
        let arguments = call.arguments.unwrap_or_default();
        let result = match self.forward(&call.name, arguments).await {
            Ok((reply, text)) => {
                let failed = reply.get("status").and_then(Value::as_str) == Some("error");
                json!({
                    "content": [{"type": "text", "text": text}],
                    "structuredContent": reply,
                    "isError": failed,
                })
            }
            Err(error) => {
                warn!(target: MCP_TARGET, tool = %call.name, %error, "tool call failed");
                json!({
                    "content": [{"type": "text", "text": error.to_string()}],
                    "isError": true,
                })
            }
        };
        RpcResponse::success(id, result)
    }

    async fn read_resource(&self, id: Value, params: Value) -> RpcResponse {
        let read: ResourceRead = match serde_json::from_value(params) {
            Ok(read) => read,
            Err(error) => {
                return RpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {error}"));
            }
        };
        let Some(query) = resolve_resource(&read.uri) else {
            return RpcResponse::error(
                id,
                RESOURCE_NOT_FOUND,
                format!("Resource not found: {}", read.uri),
            );
        };
        match self.forward(query.command, query.params).await {
            Ok((reply, text)) if reply.get("status").and_then(Value::as_str) == Some("error") => {
                let message = reply
                    .get("message")
                    .and_then(Value::as_str)
                    .map_or(text, str::to_owned);
                RpcResponse::error(id, RESOURCE_NOT_FOUND, message)
            }
            Ok((_, text)) => RpcResponse::success(id, resource_contents(&read.uri, text)),
            Err(error) => RpcResponse::error(id, INTERNAL_ERROR, error.to_string()),
        }
    }

    /// Runs one command and returns the decoded reply with its raw text.
    async fn forward(
        &self,
        command: &str,
        params: Map<String, Value>,
    ) -> Result<(Value, String), BackendError> {
        let request = json!({"type": command, "params": params});
        let bytes = self.backend.round_trip(&request).await?;
        let text = String::from_utf8_lossy(&bytes).trim_end().to_owned();
        let reply = serde_json::from_str(&text).map_err(|error| BackendError::InvalidReply {
            backend: self.backend.authority().to_owned(),
            detail: error.to_string(),
        })?;
        Ok((reply, text))
    }
}
