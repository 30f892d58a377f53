//! Behavioural tests for the REST proxy.

use axum::Router;
use axum::http::StatusCode;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use scenelinkd::RunningServer;
use serde_json::Value;
use tokio::runtime::Runtime;

use super::support::{app_for, call, command_server, down_authority, get, post};

struct TestWorld {
    runtime: Runtime,
    app: Option<Router>,
    server: Option<RunningServer>,
    reply: Option<(StatusCode, Value)>,
}

impl TestWorld {
    fn send(&mut self, request: axum::http::Request<axum::body::Body>) {
        let app = self.app.clone().expect("proxy should be configured");
        self.reply = Some(self.runtime.block_on(call(app, request)));
    }

    fn reply(&self) -> &(StatusCode, Value) {
        self.reply.as_ref().expect("no reply recorded")
    }
}

impl Drop for TestWorld {
    fn drop(&mut self) {
        if let Some(server) = self.server.take() {
            server.stop().expect("stop server");
        }
    }
}

#[fixture]
fn world() -> TestWorld {
    TestWorld {
        runtime: tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime"),
        app: None,
        server: None,
        reply: None,
    }
}

#[given("a proxy in front of a running command server")]
fn given_live_backend(world: &mut TestWorld) {
    let server = command_server();
    let authority = server.local_addr().expect("bound").to_string();
    world.app = Some(app_for(&authority));
    world.server = Some(server);
}

#[given("a proxy whose socket server is down")]
fn given_dead_backend(world: &mut TestWorld) {
    world.app = Some(app_for(&down_authority()));
}

#[when("the client posts {body} to {path}")]
fn when_posts(world: &mut TestWorld, body: String, path: String) {
    world.send(post(path.trim_matches('"'), &body));
}

#[when("the client gets {path}")]
fn when_gets(world: &mut TestWorld, path: String) {
    world.send(get(path.trim_matches('"')));
}

#[then("the HTTP status is {code}")]
fn then_status(world: &mut TestWorld, code: u16) {
    assert_eq!(world.reply().0.as_u16(), code);
}

#[then("the body is {expected}")]
fn then_body(world: &mut TestWorld, expected: String) {
    let parsed: Value = serde_json::from_str(&expected).expect("expected body is JSON");
    assert_eq!(world.reply().1, parsed);
}

#[then("the body message is {message}")]
fn then_message(world: &mut TestWorld, message: String) {
    assert_eq!(world.reply().1["message"], message.trim_matches('"'));
}

#[then("the body field {field} is {value}")]
fn then_field(world: &mut TestWorld, field: String, value: String) {
    assert_eq!(
        world.reply().1[field.trim_matches('"')],
        value.trim_matches('"')
    );
}

#[scenario(path = "tests/features/rest_proxy.feature")]
fn rest_proxy_behaviour(world: TestWorld) {
    let _ = world;
}
