//! Channel endpoint configuration

use std::net::{IpAddr, SocketAddr};

use crate::channel::Channel;

/// Listen backlog used when none is configured
pub const DEFAULT_BACKLOG: u32 = 100;

/// Configuration for one channel's listener
///
/// No `Default`: the bind address must come from the caller.
#[derive(Debug, Clone)]
pub struct ChannelEndpoint {
    /// Name used in log fields
    pub name: String,

    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Pending-connection queue length passed to listen(2)
    pub backlog: u32,

    /// Largest frame accepted by `broadcast`
    pub max_frame_size: usize,

    /// Enable TCP_NODELAY on accepted sockets
    pub tcp_nodelay: bool,
}

impl ChannelEndpoint {
    /// Create an endpoint for the given address and frame limit
    pub fn new(bind_addr: SocketAddr, max_frame_size: usize) -> Self {
        Self {
            name: bind_addr.to_string(),
            bind_addr,
            backlog: DEFAULT_BACKLOG,
            max_frame_size,
            tcp_nodelay: true, // frames are latency sensitive
        }
    }

    /// Create an endpoint from a channel preset on the given interface
    pub fn for_channel(channel: Channel, ip: IpAddr) -> Self {
        Self::new(
            SocketAddr::new(ip, channel.default_port()),
            channel.max_frame_size(),
        )
        .name(channel.name())
    }

    /// Set the log name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Only the port
    pub fn port(mut self, port: u16) -> Self {
        self.bind_addr.set_port(port);
        self
    }

    /// Set the listen backlog
    pub fn backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Set the maximum frame size
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Toggle TCP_NODELAY
    pub fn nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    #[test]
    fn test_new_endpoint() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let endpoint = ChannelEndpoint::new(addr, 1024);

        assert_eq!(endpoint.bind_addr, addr);
        assert_eq!(endpoint.backlog, DEFAULT_BACKLOG);
        assert_eq!(endpoint.max_frame_size, 1024);
        assert!(endpoint.tcp_nodelay);
        assert_eq!(endpoint.name, "127.0.0.1:9000");
    }

    #[test]
    fn test_for_channel() {
        let endpoint = ChannelEndpoint::for_channel(Channel::Body, IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        assert_eq!(endpoint.bind_addr.port(), 9003);
        assert!(endpoint.bind_addr.ip().is_unspecified());
        assert_eq!(endpoint.max_frame_size, 60_000);
        assert_eq!(endpoint.name, "body");
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "0.0.0.0:1".parse().unwrap();
        let endpoint = ChannelEndpoint::new(addr, 4)
            .port(0)
            .backlog(8)
            .max_frame_size(16)
            .nodelay(false)
            .name("test");

        assert_eq!(endpoint.bind_addr.port(), 0);
        assert_eq!(endpoint.backlog, 8);
        assert_eq!(endpoint.max_frame_size, 16);
        assert!(!endpoint.tcp_nodelay);
        assert_eq!(endpoint.name, "test");
    }
}
