//! Router tests driven through `tower::ServiceExt::oneshot`.

use axum::body::to_bytes;
use axum::http::{StatusCode, header};
use rstest::rstest;
use scenelink_protocol::SchemaRegistry;
use serde_json::json;
use tower::ServiceExt;

use super::support::{app_for, call, command_server, down_authority, get, post};

#[rstest]
#[tokio::test]
async fn status_reports_backend_without_contacting_it() {
    let authority = down_authority();
    let (status, body) = call(app_for(&authority), get("/mcp/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "scenelink-proxy");
    assert_eq!(body["backend"], authority.as_str());
}

#[rstest]
#[tokio::test]
async fn schema_is_served_verbatim() {
    let response = app_for(&down_authority())
        .oneshot(get("/mcp/schema"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).map(|value| value.as_bytes()),
        Some(b"application/json".as_slice())
    );
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let registry = SchemaRegistry::builtin().expect("builtin schema loads");
    assert_eq!(bytes.as_ref(), registry.source().as_bytes());
}

#[rstest]
#[tokio::test]
async fn single_command_schema_is_described() {
    let (status, body) = call(app_for(&down_authority()), get("/mcp/schema/create_node")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["required_params"], json!(["node_type"]));
    assert!(body["description"].is_string());
}

#[rstest]
#[case("not json", "Invalid request body")]
#[case("[1,2,3]", "Invalid request body")]
#[case(r#"{"params":{}}"#, "Missing required field: type")]
#[tokio::test]
async fn unusable_bodies_are_rejected(#[case] body: &str, #[case] message: &str) {
    let (status, reply) = call(app_for(&down_authority()), post("/mcp/command", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        reply,
        json!({"status": "error", "message": message, "code": "invalid_request"})
    );
}

#[rstest]
#[case(r#"{"args":{}}"#)]
#[case(r#"{"command":""}"#)]
#[tokio::test]
async fn legacy_requests_need_a_command(#[case] body: &str) {
    let (status, reply) = call(app_for(&down_authority()), post("/houdini/run", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reply["message"], "No command specified");
}

#[rstest]
#[tokio::test]
async fn unreachable_backend_is_a_gateway_error() {
    let authority = down_authority();
    let (status, reply) = call(
        app_for(&authority),
        post("/mcp/command", r#"{"type":"get_scene_info","params":{}}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(reply["status"], "error");
    assert_eq!(reply["code"], "transport_error");
    assert!(
        reply["message"]
            .as_str()
            .is_some_and(|text| text.starts_with(&format!("Socket server unreachable at {authority}"))),
        "unexpected reply: {reply}"
    );
}

#[rstest]
#[tokio::test]
async fn commands_round_trip_through_the_socket_server() {
    let server = command_server();
    let authority = server.local_addr().expect("bound").to_string();
    let app = app_for(&authority);

    let (status, created) = call(
        app.clone(),
        post(
            "/mcp/command",
            r#"{"type":"create_node","params":{"node_type":"geo","node_name":"my_geometry"}}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        created,
        json!({
            "status": "success",
            "message": "Node created: /obj/my_geometry",
            "node_path": "/obj/my_geometry",
        })
    );

    let (status, listed) = call(
        app,
        post("/mcp/command", r#"{"type":"list_available_commands"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["commands"].as_array().map(Vec::len), Some(10));

    server.stop().expect("stop server");
}
