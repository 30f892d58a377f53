//! Connection handler used by the listener tests.

use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::sync::{Arc, Mutex};

use super::ConnectionHandler;

/// Line written to every accepted connection.
pub(crate) const ACK_LINE: &[u8] = b"accepted\n";

/// Acknowledges each connection and remembers the peer it came from.
#[derive(Default)]
pub(crate) struct AckHandler {
    peers: Mutex<Vec<SocketAddr>>,
}

impl AckHandler {
    pub(crate) fn peers(&self) -> Vec<SocketAddr> {
        self.peers.lock().map(|peers| peers.clone()).unwrap_or_default()
    }
}

impl ConnectionHandler for AckHandler {
    fn handle(&self, mut stream: TcpStream) {
        if let (Ok(peer), Ok(mut peers)) = (stream.peer_addr(), self.peers.lock()) {
            peers.push(peer);
        }
        stream.write_all(ACK_LINE).ok();
    }
}

/// Shares one handler between the listener and the test body.
pub(crate) fn ack_handler() -> (Arc<AckHandler>, Arc<dyn ConnectionHandler>) {
    let handler = Arc::new(AckHandler::default());
    let shared: Arc<dyn ConnectionHandler> = Arc::<AckHandler>::clone(&handler);
    (handler, shared)
}
