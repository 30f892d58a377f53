//! HTTP routes translating REST calls into socket commands.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use scenelink_protocol::{CommandResponse, ErrorCode, SchemaRegistry};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use super::PROXY_TARGET;
use super::backend::BackendClient;

const SERVICE_NAME: &str = env!("CARGO_PKG_NAME");
const JSON_CONTENT_TYPE: &str = "application/json";

/// Shared state handed to every route.
#[derive(Debug, Clone)]
pub struct ProxyState {
    registry: &'static SchemaRegistry,
    backend: Arc<BackendClient>,
}

impl ProxyState {
    /// Bundles the schema registry and the backend client.
    #[must_use]
    pub const fn new(registry: &'static SchemaRegistry, backend: Arc<BackendClient>) -> Self {
        Self { registry, backend }
    }
}

/// Builds the proxy's router.
pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route("/mcp/status", get(status))
        .route("/mcp/schema", get(schema))
        .route("/mcp/schema/{command}", get(command_schema))
        .route("/mcp/command", post(command))
        .route("/houdini/run", post(legacy_run))
        .with_state(state)
}

async fn status(State(state): State<ProxyState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "backend": state.backend.authority(),
    }))
}

async fn schema(State(state): State<ProxyState>) -> Response {
    (
        [(header::CONTENT_TYPE, JSON_CONTENT_TYPE)],
        state.registry.source(),
    )
        .into_response()
}

async fn command_schema(
    State(state): State<ProxyState>,
    Path(command): Path<String>,
) -> Response {
    match state.registry.describe(&command) {
        Ok(description) => Json(description).into_response(),
        Err(_) => envelope(
            StatusCode::NOT_FOUND,
            ErrorCode::NotFound,
            format!("Command '{command}' not found in schema"),
        ),
    }
}

async fn command(State(state): State<ProxyState>, body: Bytes) -> Response {
    let request = match parse_object(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    if !request.contains_key("type") {
        return envelope(
            StatusCode::BAD_REQUEST,
            ErrorCode::InvalidRequest,
            "Missing required field: type",
        );
    }
    forward(&state, Value::Object(request)).await
}

/// Accepts `{"command": <name>, "args": {...}}` from older clients.
async fn legacy_run(State(state): State<ProxyState>, body: Bytes) -> Response {
    let mut request = match parse_object(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let command_type = match request.remove("command") {
        Some(Value::String(name)) if !name.is_empty() => name,
        _ => {
            return envelope(
                StatusCode::BAD_REQUEST,
                ErrorCode::InvalidRequest,
                "No command specified",
            );
        }
    };
    let params = request
        .remove("args")
        .unwrap_or_else(|| Value::Object(Map::new()));
    forward(&state, json!({"type": command_type, "params": params})).await
}

async fn forward(state: &ProxyState, request: Value) -> Response {
    debug!(
        target: PROXY_TARGET,
        command = request.get("type").and_then(serde_json::Value::as_str).unwrap_or_default(),
        "forwarding command"
    );
    match state.backend.round_trip(&request).await {
        Ok(reply) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, JSON_CONTENT_TYPE)],
            reply,
        )
            .into_response(),
        Err(error) => {
            warn!(target: PROXY_TARGET, %error, "socket round-trip failed");
            envelope(
                StatusCode::BAD_GATEWAY,
                ErrorCode::TransportError,
                error.to_string(),
            )
        }
    }
}

fn parse_object(body: &[u8]) -> Result<Map<String, Value>, Response> {
    match serde_json::from_slice(body) {
        Ok(Value::Object(request)) => Ok(request),
        _ => Err(envelope(
            StatusCode::BAD_REQUEST,
            ErrorCode::InvalidRequest,
            "Invalid request body",
        )),
    }
}

fn envelope(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Response {
    (status, Json(CommandResponse::error(code, message))).into_response()
}
