//! Frame broadcaster
//!
//! Fans one frame out to every connected client without blocking the
//! producer. Each client has a single send slot: if its previous frame is
//! still being written, the new frame is dropped for that client only.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::registry::Connection;
use crate::server::listener::{BroadcastServer, ChannelState};

/// Outcome of a single `broadcast` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Clients whose gate was open and now have a write in flight
    pub started: usize,
    /// Clients skipped because a previous send was still pending
    pub dropped: usize,
}

impl BroadcastReport {
    /// Clients visited by the call
    pub fn visited(&self) -> usize {
        self.started + self.dropped
    }
}

impl BroadcastServer {
    /// Deliver one frame to every connected client
    ///
    /// Never blocks on the network and may be called from any thread. Writes
    /// run on the server's runtime; the frame is shared, not copied, between
    /// clients, so the caller may reuse its own buffer as soon as this
    /// returns.
    ///
    /// Per-client failures are handled internally by dropping the client.
    /// The only error is a frame larger than the channel's `max_frame_size`,
    /// which is rejected before any client is touched.
    pub fn broadcast(&self, frame: impl Into<Bytes>) -> Result<BroadcastReport> {
        let frame = frame.into();
        let state = &self.state;
        let max = state.endpoint.max_frame_size;

        if frame.len() > max {
            tracing::warn!(
                channel = %state.endpoint.name,
                len = frame.len(),
                max = max,
                "Frame exceeds channel maximum, rejected"
            );
            return Err(Error::FrameTooLarge {
                len: frame.len(),
                max,
            });
        }

        state.stats.record_broadcast();
        let mut report = BroadcastReport::default();

        let result = state.registry.for_each(|connection| {
            if !connection.try_begin_send() {
                report.dropped += 1;
                return;
            }

            report.started += 1;
            self.runtime.spawn(deliver(
                Arc::clone(state),
                Arc::clone(connection),
                frame.clone(),
            ));
        });

        if let Err(e) = result {
            tracing::error!(channel = %state.endpoint.name, error = %e, "Broadcast aborted");
        }

        if report.dropped > 0 {
            state.stats.record_dropped(report.dropped);
            tracing::trace!(
                channel = %state.endpoint.name,
                dropped = report.dropped,
                "Frame dropped for busy clients"
            );
        }

        Ok(report)
    }
}

/// Complete one client's write: reopen its gate, or tear it down on failure
async fn deliver(state: Arc<ChannelState>, connection: Arc<Connection>, frame: Bytes) {
    match connection.write_frame(&frame).await {
        Ok(()) => {
            connection.finish_send();
            state.stats.record_sent(frame.len());
        }
        Err(e) => {
            state.stats.record_send_error();

            if let Err(e) = state.registry.remove(connection.id()) {
                tracing::error!(channel = %state.endpoint.name, conn_id = %connection.id(), error = %e, "Failed to remove client");
            }
            if connection.close() {
                state.stats.record_close();
            }

            tracing::debug!(
                channel = %state.endpoint.name,
                conn_id = %connection.id(),
                peer = %connection.peer_addr(),
                error = %e,
                "Send failed, client dropped"
            );
        }
    }
}
