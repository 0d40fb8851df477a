//! Broadcast server
//!
//! One [`BroadcastServer`] per channel: a listener feeding a connection
//! registry, and a broadcaster that fans frames out to the registry.

pub mod broadcaster;
pub mod config;
pub mod listener;

pub use broadcaster::BroadcastReport;
pub use config::{ChannelEndpoint, DEFAULT_BACKLOG};
pub use listener::BroadcastServer;
