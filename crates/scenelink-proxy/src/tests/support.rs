//! Shared fixtures for proxy tests.

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use scenelink_config::{Endpoint, ServerConfig};
use scenelink_protocol::SchemaRegistry;
use scenelinkd::{RunningServer, StructuredHealthReporter, start_server};
use serde_json::Value;
use tower::ServiceExt;

use crate::{BackendClient, ProxyState, router};

/// Builds a router forwarding to `authority`.
pub(crate) fn app_for(authority: &str) -> Router {
    let registry = SchemaRegistry::builtin().expect("builtin schema loads");
    let backend = Arc::new(BackendClient::new(authority, 2, Duration::from_secs(5)));
    router(ProxyState::new(registry, backend))
}

/// Returns a loopback authority with nothing listening on it.
pub(crate) fn down_authority() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("reserve port");
    listener.local_addr().expect("address").to_string()
}

/// Starts a command server on an ephemeral loopback port.
pub(crate) fn command_server() -> RunningServer {
    let config = ServerConfig {
        endpoint: Endpoint::new("127.0.0.1", 0),
        ..ServerConfig::default()
    };
    start_server(&config, Arc::new(StructuredHealthReporter::new())).expect("start server")
}

/// Builds a JSON `POST` request.
pub(crate) fn post(path: &str, body: &str) -> Request<Body> {
    Request::post(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_owned()))
        .expect("request")
}

/// Builds a `GET` request.
pub(crate) fn get(path: &str) -> Request<Body> {
    Request::get(path).body(Body::empty()).expect("request")
}

/// Sends `request` through `app` and decodes the JSON reply.
pub(crate) async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = serde_json::from_slice(&bytes).expect("body is JSON");
    (status, body)
}
