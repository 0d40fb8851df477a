//! Sensor bridge fed by synthetic producers
//!
//! Run with: cargo run --example synthetic_bridge [BIND_IP]
//!
//! Examples:
//!   cargo run --example synthetic_bridge              # binds all channels on 0.0.0.0
//!   cargo run --example synthetic_bridge 127.0.0.1    # loopback only
//!
//! ## Consuming
//!
//! Frames are raw bytes with no framing. For instance, the audio angle
//! channel carries one little-endian f32 per message:
//!   nc localhost 9009 | xxd
//!
//! The body channel carries 60000-byte frames holding NUL-padded JSON:
//!   nc localhost 9003 | tr -d '\0'
//!
//! Press Ctrl-C to stop; per-channel stats are printed on exit.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use sensor_fanout::channel::{AUDIO_CHUNK_SIZE, BYTES_PER_COLOR_PIXEL, COLOR_HEIGHT, COLOR_WIDTH};
use sensor_fanout::{payload, Bridge, Channel};

/// Screen-space bounding box of one tracked body
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct BodyInfo {
    tracking_id: u64,
    is_tracked: bool,
    from_x: i32,
    to_x: i32,
    from_y: i32,
    to_y: i32,
}

/// Face tracking result for one body
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct FaceResult {
    tracking_id: u64,
    happy: bool,
    mouth_open: bool,
    yaw_degrees: f32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("sensor_fanout=debug,info")),
        )
        .init();

    let ip: IpAddr = match std::env::args().nth(1) {
        Some(arg) if arg == "localhost" => IpAddr::V4(Ipv4Addr::LOCALHOST),
        Some(arg) => arg.parse()?,
        None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
    };

    let bridge = Arc::new(Bridge::bind(ip, &Channel::ALL)?);
    bridge.start();

    for channel in Channel::ALL {
        println!("{:>12}: {}:{}", channel, ip, channel.default_port());
    }

    // Audio is read in a blocking loop on its own thread, like a capture driver
    let running = Arc::new(AtomicBool::new(true));
    let audio_thread = {
        let bridge = Arc::clone(&bridge);
        let running = Arc::clone(&running);
        std::thread::spawn(move || {
            let mut chunk = [0u8; AUDIO_CHUNK_SIZE];
            let mut phase = 0u32;
            while running.load(Ordering::Relaxed) {
                // 16 kHz, 16-bit mono: one chunk every 32 ms
                std::thread::sleep(Duration::from_millis(32));
                for sample in chunk.chunks_exact_mut(2) {
                    let value = ((phase as f32 * 0.05).sin() * 8000.0) as i16;
                    sample.copy_from_slice(&value.to_le_bytes());
                    phase = phase.wrapping_add(1);
                }
                if let Err(e) = bridge.broadcast(Channel::AudioStream, Bytes::copy_from_slice(&chunk)) {
                    tracing::warn!(error = %e, "Audio frame rejected");
                }
            }
        })
    };

    let producers = vec![
        tokio::spawn(color_producer(Arc::clone(&bridge))),
        tokio::spawn(location_producer(Arc::clone(&bridge))),
        tokio::spawn(body_producer(Arc::clone(&bridge))),
        tokio::spawn(angle_producer(Arc::clone(&bridge))),
    ];

    tokio::signal::ctrl_c().await?;
    println!("Shutting down...");

    for producer in &producers {
        producer.abort();
    }
    running.store(false, Ordering::Relaxed);
    let _ = audio_thread.join();

    bridge.stop().await;

    for (channel, stats) in bridge.stats() {
        println!(
            "{:>12}: accepted={} sent={} dropped={} ({:.1}%) bytes={} bitrate={}bps",
            channel,
            stats.connections_accepted,
            stats.frames_sent,
            stats.frames_dropped,
            stats.drop_ratio() * 100.0,
            stats.bytes_sent,
            stats.bitrate(),
        );
    }

    Ok(())
}

async fn color_producer(bridge: Arc<Bridge>) {
    let mut ticker = tokio::time::interval(Duration::from_millis(200));
    let mut shade = 0u8;
    loop {
        ticker.tick().await;
        shade = shade.wrapping_add(8);
        let mut frame = vec![0u8; COLOR_WIDTH * COLOR_HEIGHT * BYTES_PER_COLOR_PIXEL];
        for pixel in frame.chunks_exact_mut(BYTES_PER_COLOR_PIXEL) {
            pixel.copy_from_slice(&[shade, 0x40, 0xff - shade, 0xff]);
        }
        if let Err(e) = bridge.broadcast(Channel::Color, frame) {
            tracing::warn!(error = %e, "Color frame rejected");
        }
    }
}

async fn location_producer(bridge: Arc<Bridge>) {
    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    let mut depth = 0.5f32;
    loop {
        ticker.tick().await;
        depth = if depth > 4.0 { 0.5 } else { depth + 0.1 };
        let points: Vec<[f32; 3]> = (0..COLOR_WIDTH * COLOR_HEIGHT)
            .map(|i| {
                let x = (i % COLOR_WIDTH) as f32 / COLOR_WIDTH as f32 - 0.5;
                let y = (i / COLOR_WIDTH) as f32 / COLOR_HEIGHT as f32 - 0.5;
                [x, y, depth]
            })
            .collect();
        if let Err(e) = bridge.broadcast(Channel::Location, payload::camera_points_frame(&points)) {
            tracing::warn!(error = %e, "Location frame rejected");
        }
    }
}

async fn body_producer(bridge: Arc<Bridge>) {
    let mut ticker = tokio::time::interval(Duration::from_millis(33));
    let mut offset = 0i32;
    loop {
        ticker.tick().await;
        offset = (offset + 4) % 800;

        let bodies: Vec<BodyInfo> = (0..6)
            .map(|i| BodyInfo {
                tracking_id: 72_057_594_037_900_000 + i,
                is_tracked: i == 0,
                from_x: if i == 0 { 400 + offset } else { i32::MAX },
                to_x: if i == 0 { 700 + offset } else { i32::MIN },
                from_y: if i == 0 { 200 } else { i32::MAX },
                to_y: if i == 0 { 900 } else { i32::MIN },
            })
            .collect();
        match payload::json_frame(&bodies, Channel::Body.max_frame_size()) {
            Ok(frame) => {
                if let Err(e) = bridge.broadcast(Channel::Body, frame) {
                    tracing::warn!(error = %e, "Body frame rejected");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to encode bodies"),
        }

        let faces = [FaceResult {
            tracking_id: bodies[0].tracking_id,
            happy: offset % 200 < 100,
            mouth_open: false,
            yaw_degrees: (offset as f32 / 800.0 - 0.5) * 60.0,
        }];
        match payload::json_frame(&faces, Channel::Face.max_frame_size()) {
            Ok(frame) => {
                if let Err(e) = bridge.broadcast(Channel::Face, frame) {
                    tracing::warn!(error = %e, "Face frame rejected");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to encode faces"),
        }
    }
}

async fn angle_producer(bridge: Arc<Bridge>) {
    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    let mut t = 0.0f32;
    loop {
        ticker.tick().await;
        t += 0.1;
        let angle = t.sin() * std::f32::consts::FRAC_PI_2;
        if let Err(e) = bridge.broadcast(Channel::AudioAngle, payload::beam_angle_frame(angle)) {
            tracing::warn!(error = %e, "Angle frame rejected");
        }
    }
}
