//! Accepted client connection
//!
//! A connection carries a single-slot send gate: at most one write is ever
//! outstanding, and a frame offered while the gate is closed is dropped for
//! this client.

use std::io;
use std::net::{Shutdown, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};

/// Unique identifier for a connection within one registry
///
/// Identifiers are never reused, so a stale removal cannot hit a newer client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub(crate) u64);

impl ConnectionId {
    /// Get the raw value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Send-path state of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendState {
    /// No write outstanding
    Idle,
    /// A write is in flight
    Sending,
    /// Torn down, terminal
    Closed,
}

/// One accepted client socket
pub struct Connection {
    id: ConnectionId,
    peer_addr: SocketAddr,

    /// True from send initiation until completion or failure
    send_in_flight: AtomicBool,

    /// Flipped to true exactly once, on teardown
    closed: watch::Sender<bool>,

    /// Taken out on teardown
    stream: Mutex<Option<TcpStream>>,
}

impl Connection {
    /// Wrap an accepted socket with its gate open
    pub fn new(id: ConnectionId, stream: TcpStream, peer_addr: SocketAddr) -> Self {
        let (closed, _) = watch::channel(false);

        Self {
            id,
            peer_addr,
            send_in_flight: AtomicBool::new(false),
            closed,
            stream: Mutex::new(Some(stream)),
        }
    }

    /// Connection identifier
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Remote peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Current send-path state
    pub fn state(&self) -> SendState {
        if self.is_closed() {
            SendState::Closed
        } else if self.send_in_flight.load(Ordering::Acquire) {
            SendState::Sending
        } else {
            SendState::Idle
        }
    }

    /// Whether the connection has been torn down
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Atomically close the gate
    ///
    /// Returns false if a send is already in flight or the connection is closed;
    /// the caller must then drop the frame for this client.
    pub fn try_begin_send(&self) -> bool {
        if self.is_closed() {
            return false;
        }

        self.send_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Reopen the gate after a successful write
    pub fn finish_send(&self) {
        self.send_in_flight.store(false, Ordering::Release);
    }

    /// Write the whole frame to the socket
    ///
    /// Fails with `ConnectionAborted` if the connection is closed before or
    /// while the write is pending.
    pub async fn write_frame(&self, frame: &Bytes) -> io::Result<()> {
        let mut closed = self.closed.subscribe();
        let mut guard = self.stream.lock().await;

        if self.is_closed() {
            release_stream(self.id, &mut guard);
            return Err(closed_during_send());
        }

        let stream = guard
            .as_mut()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?;

        let result = tokio::select! {
            result = stream.write_all(frame) => result,
            _ = async { let _ = closed.wait_for(|is_closed| *is_closed).await; } => {
                Err(closed_during_send())
            }
        };

        // `close` cannot take the socket while we hold it, so release it here
        if self.is_closed() {
            release_stream(self.id, &mut guard);
        }

        result
    }

    /// Tear the connection down: shut down both directions and close the socket
    ///
    /// Idempotent. Returns true only for the call that moved the connection to
    /// `Closed`. If a write currently owns the socket, it is interrupted (or
    /// completes) and the write itself shuts the socket down before returning.
    pub fn close(&self) -> bool {
        let first = !self.closed.send_replace(true);

        if let Ok(mut guard) = self.stream.try_lock() {
            release_stream(self.id, &mut guard);
        }

        first
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("state", &self.state())
            .finish()
    }
}

fn closed_during_send() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionAborted, "connection closed during send")
}

fn release_stream(id: ConnectionId, slot: &mut Option<TcpStream>) {
    let Some(stream) = slot.take() else {
        return;
    };

    match stream.into_std() {
        Ok(stream) => {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                tracing::debug!(conn_id = %id, error = %e, "Socket shutdown failed");
            }
        }
        Err(e) => {
            tracing::debug!(conn_id = %id, error = %e, "Socket deregistration failed");
        }
    }
}
