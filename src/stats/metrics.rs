//! Statistics for broadcast channels

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live per-channel counters
///
/// Updated from the accept task, write tasks and producers without locking.
#[derive(Debug)]
pub struct ChannelStats {
    started_at: Instant,
    connections_accepted: AtomicU64,
    connections_closed: AtomicU64,
    accept_errors: AtomicU64,
    broadcasts: AtomicU64,
    frames_sent: AtomicU64,
    frames_dropped: AtomicU64,
    send_errors: AtomicU64,
    bytes_sent: AtomicU64,
}

impl ChannelStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            connections_accepted: AtomicU64::new(0),
            connections_closed: AtomicU64::new(0),
            accept_errors: AtomicU64::new(0),
            broadcasts: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            send_errors: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_accept(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_close(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_accept_error(&self) {
        self.accept_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_broadcast(&self) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sent(&self, bytes: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self, frames: usize) {
        self.frames_dropped.fetch_add(frames as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_send_error(&self) {
        self.send_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the counters into a plain snapshot
    pub fn snapshot(&self) -> ChannelStatsSnapshot {
        ChannelStatsSnapshot {
            uptime: self.started_at.elapsed(),
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            accept_errors: self.accept_errors.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
        }
    }
}

impl Default for ChannelStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of a channel's counters
#[derive(Debug, Clone, Default)]
pub struct ChannelStatsSnapshot {
    /// Time since the channel was bound
    pub uptime: Duration,
    /// Total connections ever accepted
    pub connections_accepted: u64,
    /// Connections torn down (send failure or stop)
    pub connections_closed: u64,
    /// Failed accept attempts
    pub accept_errors: u64,
    /// Calls to `broadcast` that passed the size check
    pub broadcasts: u64,
    /// Completed per-client writes
    pub frames_sent: u64,
    /// Frames skipped because the client's previous send was pending
    pub frames_dropped: u64,
    /// Failed per-client writes
    pub send_errors: u64,
    /// Bytes written across all clients
    pub bytes_sent: u64,
}

impl ChannelStatsSnapshot {
    /// Connections accepted and not yet closed
    pub fn active_connections(&self) -> u64 {
        self.connections_accepted
            .saturating_sub(self.connections_closed)
    }

    /// Outbound throughput in bits per second since bind
    pub fn bitrate(&self) -> u64 {
        let secs = self.uptime.as_secs();
        if secs > 0 {
            (self.bytes_sent * 8) / secs
        } else {
            0
        }
    }

    /// Fraction of offered per-client frames that were dropped
    pub fn drop_ratio(&self) -> f64 {
        let offered = self.frames_dropped + self.frames_sent + self.send_errors;
        if offered > 0 {
            self.frames_dropped as f64 / offered as f64
        } else {
            0.0
        }
    }
}
