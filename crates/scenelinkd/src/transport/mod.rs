//! TCP listener and newline-delimited framing for the command socket.
//!
//! The listener binds one endpoint and accepts connections on a background
//! thread, handing each accepted stream to a [`ConnectionHandler`] on its own
//! worker thread. [`FrameReader`] turns a byte stream into complete JSON
//! lines regardless of how the peer's writes were chunked.

mod errors;
mod frame;
mod handler;
mod listener;
#[cfg(test)]
mod test_utils;

pub use self::errors::ListenerError;
pub use self::frame::{FrameError, FrameReader, FrameSource};
pub use self::handler::ConnectionHandler;
pub use self::listener::{ListenerHandle, SocketListener};
#[cfg(test)]
pub(crate) use self::test_utils::{ACK_LINE, ack_handler};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
