//! Listener implementation for the command socket.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use scenelink_config::Endpoint;

use super::{ConnectionHandler, LISTENER_TARGET, ListenerError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Listener bound to a TCP endpoint.
#[derive(Debug)]
pub struct SocketListener {
    endpoint: Endpoint,
    listener: TcpListener,
}

impl SocketListener {
    /// Resolves and binds `endpoint`.
    ///
    /// Only loopback addresses are accepted unless `allow_remote` is set;
    /// anything else is refused because every peer that can connect may run
    /// code in this process.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] when resolution or binding fails, or when
    /// the address is not loopback and `allow_remote` is `false`.
    pub fn bind(endpoint: &Endpoint, allow_remote: bool) -> Result<Self, ListenerError> {
        let addr = resolve(endpoint)?;
        if !addr.ip().is_loopback() {
            if !allow_remote {
                return Err(ListenerError::NonLoopback { addr });
            }
            warn!(
                target: LISTENER_TARGET,
                %addr,
                "binding a non-loopback address; any host that can reach it may execute code"
            );
        }
        let listener =
            TcpListener::bind(addr).map_err(|source| ListenerError::BindTcp { addr, source })?;
        Ok(Self {
            endpoint: endpoint.clone(),
            listener,
        })
    }

    /// Returns the bound address, which differs from the endpoint for port 0.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr().ok()
    }

    /// Starts accepting connections on a background thread.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::NonBlocking`] when the socket cannot be put
    /// into non-blocking mode.
    pub fn start(
        self,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Result<ListenerHandle, ListenerError> {
        self.listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);
        let handle = thread::spawn(move || run_accept_loop(&self, &shutdown_flag, &handler));
        Ok(ListenerHandle {
            shutdown,
            handle: Some(handle),
        })
    }
}

/// Handle to the background listener thread.
///
/// Dropping the handle requests shutdown without waiting for the thread.
#[derive(Debug)]
pub struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    /// Asks the accept loop to stop; connections already accepted run on.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits for the accept loop to exit.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::ThreadPanic`] when the loop panicked.
    pub fn join(mut self) -> Result<(), ListenerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| ListenerError::ThreadPanic),
            None => Ok(()),
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_accept_loop(
    listener: &SocketListener,
    shutdown: &AtomicBool,
    handler: &Arc<dyn ConnectionHandler>,
) {
    info!(
        target: LISTENER_TARGET,
        endpoint = %listener.endpoint,
        "socket listener active"
    );
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match accept_connection(&listener.listener) {
            Ok(Some((stream, peer))) => {
                last_error = None;
                debug!(target: LISTENER_TARGET, %peer, "connection accepted");
                let worker = Arc::clone(handler);
                thread::spawn(move || worker.handle(stream));
            }
            Ok(None) => {
                thread::sleep(ACCEPT_BACKOFF);
            }
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
    info!(
        target: LISTENER_TARGET,
        endpoint = %listener.endpoint,
        "socket listener stopped"
    );
}

fn accept_connection(listener: &TcpListener) -> io::Result<Option<(TcpStream, SocketAddr)>> {
    match listener.accept() {
        Ok((stream, peer)) => {
            stream.set_nonblocking(false)?;
            stream.set_nodelay(true)?;
            Ok(Some((stream, peer)))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}

fn resolve(endpoint: &Endpoint) -> Result<SocketAddr, ListenerError> {
    let addrs = endpoint
        .socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: endpoint.host().to_owned(),
            port: endpoint.port(),
            source,
        })?;
    addrs
        .into_iter()
        .next()
        .ok_or_else(|| ListenerError::ResolveEmpty {
            host: endpoint.host().to_owned(),
            port: endpoint.port(),
        })
}
