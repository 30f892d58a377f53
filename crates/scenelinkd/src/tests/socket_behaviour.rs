//! Behavioural tests for the JSON-lines command socket.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::Value;

use scenelink_config::{CodeExecutionConfig, Endpoint, ServerConfig};

use crate::bootstrap::{RunningServer, start_server};
use crate::health::StructuredHealthReporter;

#[derive(Default)]
struct TestWorld {
    server: Option<RunningServer>,
    client: Option<TcpStream>,
    reader: Option<BufReader<TcpStream>>,
    responses: Vec<Value>,
    others: Vec<TcpStream>,
    last_round_trip: Option<Duration>,
}

impl TestWorld {
    fn send(&mut self, line: &str) {
        let client = self.client.as_mut().expect("client should be connected");
        client
            .write_all(format!("{line}\n").as_bytes())
            .expect("write request");
    }

    fn start(&mut self, config: &ServerConfig) {
        let server =
            start_server(config, Arc::new(StructuredHealthReporter::new())).expect("start server");
        let client = self.connect_to(&server);
        self.reader = Some(BufReader::new(client.try_clone().expect("clone client")));
        self.client = Some(client);
        self.server = Some(server);
    }

    fn connect_to(&self, server: &RunningServer) -> TcpStream {
        let addr = server.local_addr().expect("bound address");
        let client = TcpStream::connect(addr).expect("connect client");
        client
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("read timeout");
        client
    }

    /// Opens another connection, writes `bytes` to it and leaves it waiting.
    fn park_other_client(&mut self, bytes: &[u8]) {
        let server = self.server.as_ref().expect("server should be running");
        let mut other = self.connect_to(server);
        other.write_all(bytes).expect("write from other client");
        self.others.push(other);
        // Let the server pick the bytes up before the main client speaks.
        thread::sleep(Duration::from_millis(100));
    }

    fn receive(&mut self) {
        let reader = self.reader.as_mut().expect("client should be connected");
        let mut line = String::new();
        reader.read_line(&mut line).expect("read response");
        self.responses
            .push(serde_json::from_str(&line).expect("response is JSON"));
    }

    fn last(&self) -> &Value {
        self.responses.last().expect("no response received")
    }
}

impl Drop for TestWorld {
    fn drop(&mut self) {
        self.client.take();
        self.reader.take();
        self.others.clear();
        if let Some(server) = self.server.take() {
            server.stop().expect("stop server");
        }
    }
}

#[fixture]
fn world() -> TestWorld {
    TestWorld::default()
}

fn local_config() -> ServerConfig {
    ServerConfig {
        endpoint: Endpoint::new("127.0.0.1", 0),
        ..ServerConfig::default()
    }
}

#[given("a running command server")]
fn given_server(world: &mut TestWorld) {
    world.start(&local_config());
}

#[given("a running command server with shell code execution")]
fn given_server_with_code(world: &mut TestWorld) {
    let config = ServerConfig {
        code_execution: CodeExecutionConfig {
            enabled: true,
            interpreter: "sh".to_owned(),
            timeout: Duration::from_secs(10),
        },
        ..local_config()
    };
    world.start(&config);
}

#[when("another client holds a partial frame")]
fn when_other_holds_partial(world: &mut TestWorld) {
    world.park_other_client(br#"{"type":"get_scene"#);
}

#[when("another client starts running {code}")]
fn when_other_runs_code(world: &mut TestWorld, code: String) {
    let request = serde_json::json!({
        "type": "execute_houdini_code",
        "params": {"code": code.trim_matches('"')},
    });
    world.park_other_client(format!("{request}\n").as_bytes());
}

#[when("the client sends {line}")]
fn when_sends(world: &mut TestWorld, line: String) {
    let started = Instant::now();
    world.send(&line);
    world.receive();
    world.last_round_trip = Some(started.elapsed());
}

#[when("the client pipelines {count} node creations")]
fn when_pipelines(world: &mut TestWorld, count: usize) {
    let batch: String = (0..count)
        .map(|_| "{\"type\":\"create_node\",\"params\":{\"node_type\":\"geo\"}}\n")
        .collect();
    world
        .client
        .as_mut()
        .expect("client should be connected")
        .write_all(batch.as_bytes())
        .expect("write batch");
    for _ in 0..count {
        world.receive();
    }
}

#[then("the response is {expected}")]
fn then_response_is(world: &mut TestWorld, expected: String) {
    let parsed: Value = serde_json::from_str(&expected).expect("expected response is JSON");
    assert_eq!(world.last(), &parsed);
}

#[then("the response status is {status}")]
fn then_status(world: &mut TestWorld, status: String) {
    assert_eq!(world.last()["status"], status.trim_matches('"'));
}

#[then("the response message is {message}")]
fn then_message(world: &mut TestWorld, message: String) {
    assert_eq!(world.last()["message"], message.trim_matches('"'));
}

#[then("the response field {field} is {value}")]
fn then_field(world: &mut TestWorld, field: String, value: String) {
    assert_eq!(
        world.last()[field.trim_matches('"')],
        value.trim_matches('"'),
        "unexpected response: {}",
        world.last()
    );
}

#[then("the response arrived within {millis} milliseconds")]
fn then_arrived_within(world: &mut TestWorld, millis: u64) {
    let elapsed = world.last_round_trip.expect("a request was sent");
    assert!(
        elapsed < Duration::from_millis(millis),
        "response took {elapsed:?}"
    );
}

#[then("the response lists {count} commands")]
fn then_lists(world: &mut TestWorld, count: usize) {
    let listed = world.last()["commands"]
        .as_array()
        .map(Vec::len)
        .expect("commands array");
    assert_eq!(listed, count);
}

#[then("the responses name nodes {paths}")]
fn then_paths(world: &mut TestWorld, paths: String) {
    let received: Vec<&str> = world
        .responses
        .iter()
        .filter_map(|response| response["node_path"].as_str())
        .collect();
    let expected: Vec<&str> = paths.split(", ").collect();
    assert_eq!(received, expected);
}

#[scenario(path = "tests/features/socket_protocol.feature")]
fn socket_protocol_behaviour(world: TestWorld) {
    let _ = world;
}
