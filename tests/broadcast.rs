//! End-to-end broadcast behavior over loopback sockets

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use bytes::Bytes;
use sensor_fanout::{payload, BroadcastServer, Channel, ChannelEndpoint};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn loopback(name: &str, max_frame_size: usize) -> ChannelEndpoint {
    ChannelEndpoint::new((Ipv4Addr::LOCALHOST, 0).into(), max_frame_size).name(name)
}

async fn wait_until<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

async fn connect(server: &BroadcastServer, n: usize) -> Vec<TcpStream> {
    let mut clients = Vec::with_capacity(n);
    for _ in 0..n {
        clients.push(TcpStream::connect(server.local_addr()).await.unwrap());
    }
    wait_until(|| server.connection_count() == n).await;
    clients
}

#[tokio::test]
async fn closed_client_is_removed() {
    init_tracing();
    let server = BroadcastServer::bind(loopback("closed", 1024)).unwrap();
    server.start();

    let clients = connect(&server, 2).await;
    let mut clients = clients.into_iter();
    let dropped = clients.next().unwrap();
    let mut survivor = clients.next().unwrap();
    drop(dropped);

    // The first write to a closed peer may still succeed; keep offering
    // frames until the reset is observed.
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            server.broadcast(Bytes::from_static(b"ping")).unwrap();
            if server.connection_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("closed client was never removed");

    let stats = server.stats();
    assert!(stats.send_errors >= 1);
    assert_eq!(stats.connections_closed, 1);

    // Further broadcasts only reach the survivor
    let report = server.broadcast(Bytes::from_static(b"ping")).unwrap();
    assert_eq!(report.visited(), 1);

    let mut buf = [0u8; 4];
    survivor.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"ping");
}

#[tokio::test]
async fn channels_are_isolated() {
    init_tracing();
    let color = BroadcastServer::bind(loopback("color", 64)).unwrap();
    let body = BroadcastServer::bind(loopback("body", 64)).unwrap();
    color.start();
    body.start();

    let mut color_clients = connect(&color, 1).await;
    let mut body_clients = connect(&body, 1).await;

    color.broadcast(Bytes::from_static(b"color-frame")).unwrap();

    let mut buf = [0u8; 11];
    color_clients[0].read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"color-frame");

    let leaked = tokio::time::timeout(Duration::from_millis(100), body_clients[0].read(&mut buf)).await;
    assert!(leaked.is_err(), "body client received color data");
    assert_eq!(body.stats().frames_sent, 0);
}

#[tokio::test]
async fn stop_ends_delivery() {
    init_tracing();
    let server = BroadcastServer::bind(loopback("stop", 64)).unwrap();
    server.start();
    let mut clients = connect(&server, 3).await;

    server.stop().await;

    let report = server.broadcast(Bytes::from_static(b"late")).unwrap();
    assert_eq!(report.visited(), 0);

    for client in clients.iter_mut() {
        let mut buf = Vec::new();
        let n = client.read_to_end(&mut buf).await.unwrap_or(0);
        assert_eq!(n, 0);
    }
}

/// A plain producer thread hammering the channel must never see two writes
/// interleave on one socket: every delivered frame arrives intact and in order.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn producer_thread_frames_arrive_whole_and_ordered() {
    init_tracing();
    const FRAME_LEN: usize = 1024;
    const FRAMES: u32 = 500;

    let server = BroadcastServer::bind(loopback("audio-stream", FRAME_LEN)).unwrap();
    server.start();
    let mut clients = connect(&server, 1).await;
    let mut client = clients.pop().unwrap();

    std::thread::scope(|scope| {
        scope.spawn(|| {
            let mut chunk = vec![0u8; FRAME_LEN];
            for seq in 1..=FRAMES {
                // Reusing the buffer is safe: broadcast freezes a copy per call
                for (i, byte) in chunk.iter_mut().enumerate() {
                    *byte = (seq as usize + i) as u8;
                }
                chunk[..4].copy_from_slice(&seq.to_be_bytes());
                server.broadcast(Bytes::copy_from_slice(&chunk)).unwrap();
            }
        });
    });

    let mut last_seq = 0u32;
    let mut frame = vec![0u8; FRAME_LEN];
    loop {
        match tokio::time::timeout(Duration::from_millis(300), client.read_exact(&mut frame)).await {
            Ok(Ok(_)) => {
                let seq = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]);
                assert!(seq > last_seq, "frame {seq} after {last_seq}");
                for (i, &byte) in frame.iter().enumerate().skip(4) {
                    assert_eq!(byte, (seq as usize + i) as u8, "corrupted frame {seq}");
                }
                last_seq = seq;
            }
            Ok(Err(e)) => panic!("read failed: {e}"),
            Err(_) => break,
        }
    }

    let stats = server.stats();
    assert!(last_seq >= 1);
    assert_eq!(stats.broadcasts, FRAMES as u64);
    assert_eq!(stats.frames_sent + stats.frames_dropped, FRAMES as u64);
    assert_eq!(stats.send_errors, 0);
}

#[tokio::test]
async fn preset_channel_carries_json_frames() {
    init_tracing();
    let endpoint = ChannelEndpoint::for_channel(Channel::Body, IpAddr::V4(Ipv4Addr::LOCALHOST)).port(0);
    let server = BroadcastServer::bind(endpoint).unwrap();
    server.start();
    let mut clients = connect(&server, 1).await;

    let frame = payload::json_frame(&[[1, 2], [3, 4]], Channel::Body.max_frame_size()).unwrap();
    server.broadcast(frame).unwrap();

    let mut buf = vec![0u8; Channel::Body.max_frame_size()];
    clients[0].read_exact(&mut buf).await.unwrap();
    let end = buf.iter().position(|&b| b == 0).unwrap();
    assert_eq!(&buf[..end], b"[[1,2],[3,4]]");
}
