//! Broadcast server listener
//!
//! Binds one channel's socket and runs the accept loop that feeds the
//! connection registry.

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::registry::{Connection, ConnectionRegistry};
use crate::server::config::ChannelEndpoint;
use crate::stats::{ChannelStats, ChannelStatsSnapshot};

/// Pause after a failed accept so a persistent error (e.g. EMFILE) cannot spin
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// State shared between the server handle, the accept task and write tasks
pub(crate) struct ChannelState {
    pub(crate) endpoint: ChannelEndpoint,
    pub(crate) registry: ConnectionRegistry,
    pub(crate) stats: ChannelStats,
}

impl ChannelState {
    /// Handle one accept outcome; returns false if the attempt failed
    ///
    /// A failed attempt is logged and counted, and the caller re-arms.
    pub(crate) fn on_accept(&self, result: io::Result<(TcpStream, SocketAddr)>) -> bool {
        match result {
            Ok((socket, peer_addr)) => {
                self.admit(socket, peer_addr);
                true
            }
            Err(e) => {
                self.stats.record_accept_error();
                tracing::warn!(channel = %self.endpoint.name, error = %e, "Failed to accept connection");
                false
            }
        }
    }

    fn admit(&self, socket: TcpStream, peer_addr: SocketAddr) {
        if self.endpoint.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::warn!(channel = %self.endpoint.name, peer = %peer_addr, error = %e, "Failed to set TCP_NODELAY");
            }
        }

        let connection = Arc::new(Connection::new(self.registry.next_id(), socket, peer_addr));

        match self.registry.add(Arc::clone(&connection)) {
            Ok(()) => {
                self.stats.record_accept();
                tracing::debug!(
                    channel = %self.endpoint.name,
                    conn_id = %connection.id(),
                    peer = %peer_addr,
                    clients = self.registry.len(),
                    "Client connected"
                );
            }
            Err(e) => {
                tracing::error!(channel = %self.endpoint.name, peer = %peer_addr, error = %e, "Failed to register client");
                connection.close();
            }
        }
    }

    /// Tear down every registered connection
    pub(crate) fn close_all(&self) -> usize {
        let connections = match self.registry.drain() {
            Ok(connections) => connections,
            Err(e) => {
                tracing::error!(channel = %self.endpoint.name, error = %e, "Failed to drain registry");
                return 0;
            }
        };

        let count = connections.len();
        for connection in connections {
            if connection.close() {
                self.stats.record_close();
            }
        }
        count
    }
}

/// One channel's broadcast server
///
/// Accepts any number of TCP clients and pushes frames to all of them; see
/// [`BroadcastServer::broadcast`] for the delivery policy.
pub struct BroadcastServer {
    pub(crate) state: Arc<ChannelState>,
    pub(crate) runtime: Handle,
    local_addr: SocketAddr,
    /// Present from bind until start or stop
    listener: Mutex<Option<TcpListener>>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    shutdown_tx: watch::Sender<bool>,
}

impl BroadcastServer {
    /// Bind and listen on the endpoint using the current tokio runtime
    ///
    /// Fails synchronously if no runtime is available or the address cannot
    /// be bound.
    pub fn bind(endpoint: ChannelEndpoint) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;
        Self::bind_with_handle(endpoint, runtime)
    }

    /// Bind and listen on the endpoint, driving all I/O on the given runtime
    pub fn bind_with_handle(endpoint: ChannelEndpoint, runtime: Handle) -> Result<Self> {
        let listener = {
            let _guard = runtime.enter();
            let socket = if endpoint.bind_addr.is_ipv4() {
                TcpSocket::new_v4()?
            } else {
                TcpSocket::new_v6()?
            };
            #[cfg(not(windows))]
            socket.set_reuseaddr(true)?;
            socket.bind(endpoint.bind_addr)?;
            socket.listen(endpoint.backlog)?
        };
        let local_addr = listener.local_addr()?;

        tracing::info!(
            channel = %endpoint.name,
            addr = %local_addr,
            backlog = endpoint.backlog,
            max_frame_size = endpoint.max_frame_size,
            "Channel listening"
        );

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            state: Arc::new(ChannelState {
                endpoint,
                registry: ConnectionRegistry::new(),
                stats: ChannelStats::new(),
            }),
            runtime,
            local_addr,
            listener: Mutex::new(Some(listener)),
            accept_task: Mutex::new(None),
            shutdown_tx,
        })
    }

    /// Begin accepting clients
    ///
    /// Returns immediately; accepting runs as a background task. Calling it
    /// again, or after `stop`, does nothing.
    pub fn start(&self) {
        let Some(listener) = lock(&self.listener).take() else {
            tracing::debug!(channel = %self.state.endpoint.name, "Accept loop already started or stopped");
            return;
        };

        let state = Arc::clone(&self.state);
        let shutdown = self.shutdown_tx.subscribe();
        let task = self.runtime.spawn(accept_loop(state, listener, shutdown));
        *lock(&self.accept_task) = Some(task);
    }

    /// Close the listening socket and every client connection
    ///
    /// Best-effort per connection; safe with zero clients and safe to repeat.
    pub async fn stop(&self) {
        self.shutdown_tx.send_replace(true);
        drop(lock(&self.listener).take());

        let task = lock(&self.accept_task).take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::debug!(channel = %self.state.endpoint.name, error = %e, "Accept task ended abnormally");
            }
        }

        let closed = self.state.close_all();
        tracing::info!(channel = %self.state.endpoint.name, closed, "Channel stopped");
    }

    /// Actual bound address
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Endpoint configuration
    pub fn endpoint(&self) -> &ChannelEndpoint {
        &self.state.endpoint
    }

    /// Number of connected clients
    pub fn connection_count(&self) -> usize {
        self.state.registry.len()
    }

    /// Whether the accept loop is running
    pub fn is_running(&self) -> bool {
        lock(&self.accept_task)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Snapshot of the channel counters
    pub fn stats(&self) -> ChannelStatsSnapshot {
        self.state.stats.snapshot()
    }
}

impl Drop for BroadcastServer {
    fn drop(&mut self) {
        self.shutdown_tx.send_replace(true);
        if let Some(task) = lock(&self.accept_task).take() {
            task.abort();
        }
        self.state.close_all();
    }
}

async fn accept_loop(
    state: Arc<ChannelState>,
    listener: TcpListener,
    mut shutdown: watch::Receiver<bool>,
) {
    // A stop signalled before this task first ran is already marked seen
    if *shutdown.borrow_and_update() {
        return;
    }

    loop {
        let result = tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow_and_update() {
                    break;
                }
                continue;
            }
            result = listener.accept() => result,
        };

        if !state.on_accept(result) {
            tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
        }
    }

    tracing::debug!(channel = %state.endpoint.name, "Accept loop ended");
}

/// The guarded values are plain handles, so a poisoned lock is still usable
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
