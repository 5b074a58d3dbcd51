use may::coroutine::JoinHandle;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::service::ActionService;
use crate::dispatcher::App;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Serves one [`App`] over HTTP through `may_minihttp`.
pub struct ActionServer {
    service: ActionService,
}

impl ActionServer {
    pub fn new(app: Arc<App>) -> Self {
        Self {
            service: ActionService::new(app),
        }
    }

    /// Bind the first address that accepts and start the accept loop.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when `addr` resolves to nothing, otherwise the bind
    /// error of the last address tried.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let mut last_err = None;
        for candidate in addr.to_socket_addrs()? {
            match may_minihttp::HttpServer(self.service.clone()).start(candidate) {
                Ok(handle) => {
                    info!(
                        addr = %candidate,
                        base_url = %self.service.app().config().base_url(),
                        "Server listening"
                    );
                    return Ok(ServerHandle {
                        addr: candidate,
                        handle,
                    });
                }
                Err(err) => {
                    warn!(addr = %candidate, error = %err, "Bind failed");
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "address resolved to nothing")
        }))
    }
}

/// A running [`ActionServer`].
pub struct ServerHandle {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `http://<addr>/`, usable as the app's base URL.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Block until the listener accepts a connection or `timeout` passes.
    ///
    /// # Errors
    ///
    /// `TimedOut` when no connection was accepted in time.
    pub fn wait_ready(&self, timeout: Duration) -> io::Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("{} not accepting connections", self.addr),
                ));
            }
            thread::sleep(READY_POLL_INTERVAL);
        }
    }

    /// Cancel the accept loop and wait for it to exit.
    #[allow(unsafe_code)]
    pub fn stop(self) {
        // SAFETY: cancel is unsafe in may; the handle is owned and the
        // coroutine is joined right after.
        unsafe {
            self.handle.coroutine().cancel();
        }
        if self.handle.join().is_err() {
            warn!(addr = %self.addr, "Accept loop exited with a panic");
        }
        info!(addr = %self.addr, "Server stopped");
    }

    /// Serve until the accept loop exits.
    ///
    /// # Errors
    ///
    /// An `Other` error when the accept loop panicked.
    pub fn join(self) -> io::Result<()> {
        let addr = self.addr;
        self.handle.join().map_err(|payload| {
            io::Error::new(
                io::ErrorKind::Other,
                format!("accept loop on {addr} panicked: {payload:?}"),
            )
        })
    }
}
