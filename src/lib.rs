//! Non-blocking multi-client TCP broadcast for sensor streams
//!
//! Each data channel of a sensor bridge (color, depth-mapped location, body,
//! face, audio angle, audio stream) gets a [`BroadcastServer`]: it accepts any
//! number of TCP clients and pushes raw byte frames to all of them.
//!
//! Delivery is best-effort. Every client has a single send slot; a frame that
//! arrives while the client's previous write is still pending is dropped for
//! that client. Slow consumers lose frames instead of building up memory or
//! stalling the producer. Frames carry no length prefix.
//!
//! # Example
//! ```no_run
//! use std::net::{IpAddr, Ipv4Addr};
//!
//! use sensor_fanout::{payload, BroadcastServer, Channel, ChannelEndpoint};
//!
//! # async fn example() -> sensor_fanout::Result<()> {
//! let endpoint = ChannelEndpoint::for_channel(Channel::AudioAngle, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
//! let server = BroadcastServer::bind(endpoint)?;
//! server.start();
//!
//! server.broadcast(payload::beam_angle_frame(0.42))?;
//!
//! server.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod channel;
pub mod error;
pub mod payload;
pub mod registry;
pub mod server;
pub mod stats;

pub use bridge::Bridge;
pub use channel::Channel;
pub use error::{Error, Result};
pub use server::{BroadcastReport, BroadcastServer, ChannelEndpoint};
pub use stats::ChannelStatsSnapshot;
