//! Multi-channel sensor bridge
//!
//! Owns one [`BroadcastServer`] per [`Channel`]. Channels share nothing but
//! the runtime: a slow or failing client on one never affects another.

use std::collections::HashMap;
use std::net::IpAddr;

use bytes::Bytes;

use crate::channel::Channel;
use crate::error::{Error, Result};
use crate::server::{BroadcastReport, BroadcastServer, ChannelEndpoint};
use crate::stats::ChannelStatsSnapshot;

/// A set of independent channel servers
pub struct Bridge {
    servers: HashMap<Channel, BroadcastServer>,
}

impl Bridge {
    /// Bind the given channels on their well-known ports on one interface
    pub fn bind(ip: IpAddr, channels: &[Channel]) -> Result<Self> {
        Self::bind_endpoints(
            channels
                .iter()
                .map(|&channel| (channel, ChannelEndpoint::for_channel(channel, ip))),
        )
    }

    /// Bind each channel on its own endpoint
    ///
    /// Fails if any channel cannot be bound; channels bound so far are closed.
    pub fn bind_endpoints<I>(endpoints: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Channel, ChannelEndpoint)>,
    {
        let mut servers = HashMap::new();
        for (channel, endpoint) in endpoints {
            let server = BroadcastServer::bind(endpoint).inspect_err(|e| {
                tracing::error!(channel = %channel, error = %e, "Failed to bind channel");
            })?;
            servers.insert(channel, server);
        }
        Ok(Self { servers })
    }

    /// Start accepting on every channel
    pub fn start(&self) {
        for server in self.servers.values() {
            server.start();
        }
    }

    /// Broadcast a frame on one channel
    pub fn broadcast(&self, channel: Channel, frame: impl Into<Bytes>) -> Result<BroadcastReport> {
        self.server(channel)
            .ok_or(Error::UnknownChannel(channel))?
            .broadcast(frame)
    }

    /// Server for a channel, if bound
    pub fn server(&self, channel: Channel) -> Option<&BroadcastServer> {
        self.servers.get(&channel)
    }

    /// Bound channels
    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.servers.keys().copied()
    }

    /// Counters for every channel
    pub fn stats(&self) -> Vec<(Channel, ChannelStatsSnapshot)> {
        let mut stats: Vec<_> = self
            .servers
            .iter()
            .map(|(&channel, server)| (channel, server.stats()))
            .collect();
        stats.sort_by_key(|(channel, _)| channel.default_port());
        stats
    }

    /// Stop every channel
    pub async fn stop(&self) {
        for server in self.servers.values() {
            server.stop().await;
        }
    }
}
