//! Frame payload encoders
//!
//! Helpers producers use to turn sensor readings into the raw byte frames the
//! channels carry. There is no framing on the wire, so every encoder produces
//! a frame whose size the consumer can predict.

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;

use crate::error::{Error, Result};

/// Below this (in metres) a mapped coordinate is treated as invalid
const INVALID_COORDINATE_M: f32 = -100.0;

/// Encode an audio beam angle as a 4-byte little-endian f32
pub fn beam_angle_frame(angle: f32) -> Bytes {
    let mut buf = BytesMut::with_capacity(4);
    buf.put_f32_le(angle);
    buf.freeze()
}

/// Encode camera-space points as three little-endian i16 millimetre values each
pub fn camera_points_frame(points: &[[f32; 3]]) -> Bytes {
    let mut buf = BytesMut::with_capacity(points.len() * 6);
    for point in points {
        for &coordinate in point {
            buf.put_i16_le(to_millimetres(coordinate));
        }
    }
    buf.freeze()
}

/// Convert metres to millimetres, mapping invalid readings to zero
///
/// Out-of-range values saturate at the i16 limits.
pub fn to_millimetres(metres: f32) -> i16 {
    if !metres.is_finite() || metres < INVALID_COORDINATE_M {
        return 0;
    }
    (metres * 1000.0) as i16
}

/// Serialize a value as JSON into a zero-padded frame of exactly `capacity` bytes
///
/// Consumers read fixed-size frames and take the JSON up to the first NUL.
/// A document longer than `capacity` is rejected rather than truncated.
pub fn json_frame<T>(value: &T, capacity: usize) -> Result<Bytes>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_vec(value)?;
    if json.len() > capacity {
        return Err(Error::FrameTooLarge {
            len: json.len(),
            max: capacity,
        });
    }

    let mut buf = BytesMut::zeroed(capacity);
    buf[..json.len()].copy_from_slice(&json);
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct BodyBox {
        tracked: bool,
        from_x: i32,
        to_x: i32,
    }

    #[test]
    fn test_beam_angle_frame() {
        let frame = beam_angle_frame(1.5);
        assert_eq!(frame.len(), 4);
        assert_eq!(&frame[..], &1.5f32.to_le_bytes());
    }

    #[test]
    fn test_to_millimetres() {
        assert_eq!(to_millimetres(1.25), 1250);
        assert_eq!(to_millimetres(-0.5), -500);
        assert_eq!(to_millimetres(-150.0), 0);
        assert_eq!(to_millimetres(f32::NEG_INFINITY), 0);
        assert_eq!(to_millimetres(f32::NAN), 0);
        assert_eq!(to_millimetres(50.0), i16::MAX);
        assert_eq!(to_millimetres(-50.0), i16::MIN);
    }

    #[test]
    fn test_camera_points_frame_layout() {
        let frame = camera_points_frame(&[[0.001, -0.002, 3.0], [f32::NEG_INFINITY, 0.0, 0.0]]);

        assert_eq!(frame.len(), 12);
        assert_eq!(&frame[0..2], &1i16.to_le_bytes());
        assert_eq!(&frame[2..4], &(-2i16).to_le_bytes());
        assert_eq!(&frame[4..6], &3000i16.to_le_bytes());
        assert_eq!(&frame[6..12], &[0u8; 6]);
    }

    #[test]
    fn test_json_frame_pads_to_capacity() {
        let body = BodyBox {
            tracked: true,
            from_x: 10,
            to_x: 20,
        };
        let frame = json_frame(&[body], 128).unwrap();

        assert_eq!(frame.len(), 128);
        let end = frame.iter().position(|&b| b == 0).unwrap();
        let text = std::str::from_utf8(&frame[..end]).unwrap();
        assert_eq!(text, r#"[{"tracked":true,"from_x":10,"to_x":20}]"#);
        assert!(frame[end..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_json_frame_rejects_oversized() {
        let result = json_frame("a string that will not fit", 8);
        assert!(matches!(result, Err(Error::FrameTooLarge { max: 8, .. })));
    }
}
