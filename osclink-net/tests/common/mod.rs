#![allow(dead_code)]
//! Shared helpers for osclink-net integration tests.

use std::time::{Duration, Instant};

use osclink_net::{encode, OscServer, Parser, ServerConfig};
use osclink_types::{Message, Packet, Value};

/// One value of every kind the wire format carries.
pub fn every_kind() -> Vec<Value> {
    vec![
        Value::Int(-7),
        Value::Float(0.25),
        Value::from("hello"),
        Value::Bool(true),
        Value::Bool(false),
        Value::blob_copy(&[1, 2, 3, 4, 5]),
        Value::from(""),
        Value::blob_copy(&[]),
    ]
}

/// Encode `packet` and decode it again, returning every message in order.
pub fn round_trip(packet: impl Into<Packet>) -> Vec<Message> {
    let bytes = encode(&packet.into()).expect("packet should encode");
    decode_all(&bytes)
}

pub fn decode_all(bytes: &[u8]) -> Vec<Message> {
    let parser = Parser::new();
    parser.parse_datagram(bytes);
    std::iter::from_fn(|| parser.try_dequeue()).collect()
}

/// A server on an ephemeral loopback port.
pub fn loopback_server() -> OscServer {
    OscServer::bind(ServerConfig {
        port: 0,
        ..ServerConfig::default()
    })
    .expect("bind loopback server")
}

/// Poll `done` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    done()
}

/// Collect `count` messages from `server`, panicking on timeout.
pub fn receive(server: &OscServer, count: usize, timeout: Duration) -> Vec<Message> {
    let deadline = Instant::now() + timeout;
    let mut out = Vec::with_capacity(count);
    while out.len() < count {
        let left = deadline.saturating_duration_since(Instant::now());
        match server.dequeue_timeout(left) {
            Some(msg) => out.push(msg),
            None => panic!("timed out after {} of {} messages", out.len(), count),
        }
    }
    out
}
