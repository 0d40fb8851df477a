//! Error types

use std::io;

use crate::channel::Channel;

/// Errors surfaced by the broadcast server
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bind or listen failed on the channel's socket
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Server constructed outside a tokio runtime
    #[error("no tokio runtime available; call from a runtime or use bind_with_handle")]
    NoRuntime,

    /// Frame exceeds the channel's declared maximum
    #[error("frame of {len} bytes exceeds channel maximum of {max} bytes")]
    FrameTooLarge { len: usize, max: usize },

    /// Channel is not served by this bridge
    #[error("channel {0} is not bound")]
    UnknownChannel(Channel),

    /// Payload serialization failed
    #[error("payload encoding error: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_too_large_message() {
        let err = Error::FrameTooLarge { len: 10, max: 4 };
        assert_eq!(
            err.to_string(),
            "frame of 10 bytes exceeds channel maximum of 4 bytes"
        );
    }

    #[test]
    fn test_io_conversion() {
        let err: Error = io::Error::new(io::ErrorKind::AddrInUse, "taken").into();
        assert!(matches!(err, Error::Io(_)));
    }
}
