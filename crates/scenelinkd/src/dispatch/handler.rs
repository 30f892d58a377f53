//! Connection handler that dispatches JSONL commands.
//!
//! Each connection is served by one worker thread. Requests are read,
//! executed and answered strictly one after another, so responses leave in
//! the order requests arrived even when a client pipelines them.

use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use scenelink_config::ServerConfig;
use scenelink_protocol::{CommandRequest, CommandResponse, ErrorCode};
use tracing::{debug, info, warn};

use crate::executor::CommandExecutor;
use crate::transport::{ConnectionHandler, FrameError, FrameReader};

use super::DISPATCH_TARGET;
use super::errors::DispatchError;
use super::response::ResponseWriter;

/// Per-connection resource limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionLimits {
    /// Largest accepted frame, excluding the delimiter.
    pub max_message_bytes: usize,
    /// Longest wait for one complete frame.
    pub idle_timeout: Duration,
}

impl ConnectionLimits {
    /// Extracts the limits from resolved server settings.
    #[must_use]
    pub const fn from_config(config: &ServerConfig) -> Self {
        Self {
            max_message_bytes: config.max_message_bytes,
            idle_timeout: config.idle_timeout,
        }
    }
}

/// Connection handler that parses and dispatches JSONL commands.
#[derive(Debug)]
pub struct CommandConnectionHandler {
    executor: Arc<CommandExecutor>,
    limits: ConnectionLimits,
}

impl CommandConnectionHandler {
    /// Creates a handler sharing `executor` across connections.
    #[must_use]
    pub const fn new(executor: Arc<CommandExecutor>, limits: ConnectionLimits) -> Self {
        Self { executor, limits }
    }

    fn serve(&self, stream: TcpStream) -> Result<(), DispatchError> {
        let mut writer = ResponseWriter::new(stream.try_clone()?);
        let mut frames = FrameReader::new(
            stream,
            self.limits.max_message_bytes,
            self.limits.idle_timeout,
        );
        loop {
            match frames.next_frame() {
                Ok(Some(frame)) => writer.write_response(&self.respond(&frame))?,
                Ok(None) => {
                    debug!(target: DISPATCH_TARGET, "client closed connection");
                    return Ok(());
                }
                Err(error @ FrameError::TooLarge { .. }) => {
                    warn!(target: DISPATCH_TARGET, %error, "closing connection after oversized request");
                    let response = CommandResponse::error(ErrorCode::RequestTooLarge, error.to_string());
                    return writer.write_response(&response);
                }
                Err(FrameError::IdleTimeout { timeout }) => {
                    info!(
                        target: DISPATCH_TARGET,
                        idle_secs = timeout.as_secs(),
                        "closing idle connection"
                    );
                    return Ok(());
                }
                Err(FrameError::Io(error)) => return Err(DispatchError::Io(error)),
            }
        }
    }

    fn respond(&self, frame: &[u8]) -> CommandResponse {
        match CommandRequest::parse(frame) {
            Ok(request) => {
                debug!(
                    target: DISPATCH_TARGET,
                    command = request.command_type(),
                    "dispatching request"
                );
                self.executor.execute(&request)
            }
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "rejected undecodable request");
                CommandResponse::error(error.code(), error.to_string())
            }
        }
    }
}

impl ConnectionHandler for CommandConnectionHandler {
    fn handle(&self, stream: TcpStream) {
        let peer = stream.peer_addr().ok();
        if let Err(error) = self.serve(stream) {
            warn!(target: DISPATCH_TARGET, ?peer, %error, "connection ended with error");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::{self, JoinHandle};

    use rstest::{fixture, rstest};
    use scenelink_protocol::SchemaRegistry;
    use serde_json::{Value, json};

    use crate::executor::DisabledCodeRunner;
    use crate::scene::{SceneHost, scene_handlers};

    use super::*;

    /// Test fixture providing a TCP server/client pair for dispatch handler testing.
    struct HandlerTestHarness {
        client: TcpStream,
        reader: BufReader<TcpStream>,
        server_handle: JoinHandle<()>,
    }

    impl HandlerTestHarness {
        fn with_limits(limits: ConnectionLimits) -> Self {
            let host = Arc::new(SceneHost::new());
            let table = scene_handlers(&host, Arc::new(DisabledCodeRunner)).expect("table");
            let registry = SchemaRegistry::builtin().expect("builtin schema loads");
            let executor = Arc::new(CommandExecutor::new(registry, table).expect("executor"));
            let handler = CommandConnectionHandler::new(executor, limits);

            let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
            let addr = listener.local_addr().expect("listener address");
            let server_handle = thread::spawn(move || {
                let (stream, _) = listener.accept().expect("accept connection");
                handler.handle(stream);
            });
            let client = TcpStream::connect(addr).expect("connect client");
            let reader = BufReader::new(client.try_clone().expect("clone client"));
            Self {
                client,
                reader,
                server_handle,
            }
        }

        fn send(&mut self, bytes: &[u8]) {
            self.client.write_all(bytes).expect("write request");
        }

        fn receive(&mut self) -> Option<Value> {
            let mut line = String::new();
            let read = self.reader.read_line(&mut line).expect("read response");
            (read > 0).then(|| serde_json::from_str(&line).expect("response is JSON"))
        }

        fn finish(self) {
            drop(self.client);
            drop(self.reader);
            self.server_handle.join().expect("join server");
        }
    }

    #[fixture]
    fn harness() -> HandlerTestHarness {
        HandlerTestHarness::with_limits(ConnectionLimits {
            max_message_bytes: 1024,
            idle_timeout: Duration::from_secs(5),
        })
    }

    #[rstest]
    fn invalid_json_keeps_connection_open(mut harness: HandlerTestHarness) {
        harness.send(b"{not json\n");
        let rejected = harness.receive().expect("error response");
        assert_eq!(rejected["status"], "error");
        assert_eq!(rejected["code"], "invalid_json");
        assert!(
            rejected["message"]
                .as_str()
                .is_some_and(|text| text.starts_with("Invalid JSON: ")),
            "unexpected message: {rejected}"
        );

        harness.send(b"{\"type\":\"list_available_commands\",\"params\":{}}\n");
        let accepted = harness.receive().expect("success response");
        assert_eq!(accepted["status"], "success");
        harness.finish();
    }

    #[rstest]
    #[case(b"[1,2]\n".as_slice(), "Malformed command: expected a JSON object")]
    #[case(b"{\"params\":{}}\n".as_slice(), "Malformed command: missing 'type' field")]
    #[case(
        b"{\"type\":\"get_scene_info\",\"params\":[]}\n".as_slice(),
        "Malformed command: 'params' must be an object"
    )]
    fn malformed_commands_are_reported(
        mut harness: HandlerTestHarness,
        #[case] request: &[u8],
        #[case] message: &str,
    ) {
        harness.send(request);
        let response = harness.receive().expect("response");
        assert_eq!(response["message"], message);
        assert_eq!(response["code"], "malformed_command");
        harness.finish();
    }

    #[rstest]
    fn pipelined_requests_are_answered_in_order(mut harness: HandlerTestHarness) {
        harness.send(
            concat!(
                r#"{"type":"create_node","params":{"node_type":"geo","node_name":"first"}}"#,
                "\n",
                r#"{"type":"create_node","params":{"node_type":"geo","node_name":"second"}}"#,
                "\n",
            )
            .as_bytes(),
        );
        let first = harness.receive().expect("first response");
        let second = harness.receive().expect("second response");
        assert_eq!(first["node_path"], "/obj/first");
        assert_eq!(second["node_path"], "/obj/second");
        harness.finish();
    }

    #[rstest]
    fn unterminated_request_is_served_at_half_close(mut harness: HandlerTestHarness) {
        harness.send(br#"{"type":"get_scene_info"}"#);
        harness
            .client
            .shutdown(std::net::Shutdown::Write)
            .expect("half close");
        let response = harness.receive().expect("response");
        assert_eq!(response["hip_file"], "untitled.hip");
        assert_eq!(harness.receive(), None);
        harness.finish();
    }

    #[rstest]
    fn oversized_request_is_rejected_and_closed() {
        let mut harness = HandlerTestHarness::with_limits(ConnectionLimits {
            max_message_bytes: 32,
            idle_timeout: Duration::from_secs(5),
        });
        let padding = "x".repeat(64);
        harness.send(format!("{{\"type\":\"{padding}\"}}\n").as_bytes());
        let response = harness.receive().expect("error response");
        assert_eq!(
            response,
            json!({
                "status": "error",
                "message": "Request exceeds the maximum message size of 32 bytes",
                "code": "request_too_large",
            })
        );
        assert_eq!(harness.receive(), None);
        harness.finish();
    }

    #[rstest]
    fn idle_connection_is_closed() {
        let mut harness = HandlerTestHarness::with_limits(ConnectionLimits {
            max_message_bytes: 1024,
            idle_timeout: Duration::from_millis(100),
        });
        assert_eq!(harness.receive(), None);
        harness.finish();
    }
}
