//! Sensor channel presets
//!
//! Each channel of the bridge gets its own listener on a well-known port and
//! declares the largest frame it will ever carry.

/// Width of a full-resolution color frame
pub const COLOR_WIDTH: usize = 1920;

/// Height of a full-resolution color frame
pub const COLOR_HEIGHT: usize = 1080;

/// Bytes per BGRA color pixel
pub const BYTES_PER_COLOR_PIXEL: usize = 4;

/// Bytes per mapped camera-space point (three i16 coordinates)
pub const BYTES_PER_LOCATION_PIXEL: usize = 6;

/// Fixed datagram size of the JSON channels
pub const JSON_FRAME_SIZE: usize = 60_000;

/// Bytes per audio stream chunk
pub const AUDIO_CHUNK_SIZE: usize = 1024;

/// A logical data channel of the sensor bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// BGRA color frames
    Color,
    /// Per-pixel camera-space coordinates mapped onto the color frame
    Location,
    /// Tracked bodies as zero-padded JSON
    Body,
    /// Face tracking results as zero-padded JSON
    Face,
    /// Audio beam angle, one f32
    AudioAngle,
    /// Raw audio samples
    AudioStream,
}

impl Channel {
    /// All channels, in port order
    pub const ALL: [Channel; 6] = [
        Channel::Color,
        Channel::Body,
        Channel::Face,
        Channel::AudioAngle,
        Channel::AudioStream,
        Channel::Location,
    ];

    /// Short name used in logs
    pub fn name(self) -> &'static str {
        match self {
            Channel::Color => "color",
            Channel::Location => "location",
            Channel::Body => "body",
            Channel::Face => "face",
            Channel::AudioAngle => "audio-angle",
            Channel::AudioStream => "audio-stream",
        }
    }

    /// Well-known TCP port
    pub fn default_port(self) -> u16 {
        match self {
            Channel::Color => 9000,
            Channel::Body => 9003,
            Channel::Face => 9006,
            Channel::AudioAngle => 9009,
            Channel::AudioStream => 9012,
            Channel::Location => 18000,
        }
    }

    /// Largest frame this channel carries
    pub fn max_frame_size(self) -> usize {
        match self {
            Channel::Color => COLOR_WIDTH * COLOR_HEIGHT * BYTES_PER_COLOR_PIXEL,
            Channel::Location => COLOR_WIDTH * COLOR_HEIGHT * BYTES_PER_LOCATION_PIXEL,
            Channel::Body | Channel::Face => JSON_FRAME_SIZE,
            Channel::AudioAngle => 4,
            Channel::AudioStream => AUDIO_CHUNK_SIZE,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
