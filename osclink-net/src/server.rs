//! UDP receiver feeding a shared [`Parser`].

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info, warn};

use osclink_types::Message;

use crate::parser::Parser;

/// Socket read timeout; bounds how long `stop` waits for the receiver thread.
const READ_TIMEOUT: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Local UDP port. Zero picks an ephemeral port.
    pub port: u16,
    /// Largest datagram accepted; longer ones are truncated by the OS.
    pub recv_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3333,
            recv_buffer_size: 8192,
        }
    }
}

pub struct OscServer {
    parser: Arc<Parser>,
    local_addr: SocketAddr,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl OscServer {
    /// Bind `0.0.0.0:port` and start the `osc-receiver` thread.
    pub fn bind(config: ServerConfig) -> io::Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", config.port))?;
        socket.set_read_timeout(Some(READ_TIMEOUT))?;
        let local_addr = socket.local_addr()?;

        let parser = Arc::new(Parser::new());
        let stop = Arc::new(AtomicBool::new(false));

        let thread = {
            let parser = parser.clone();
            let stop = stop.clone();
            let buf_len = config.recv_buffer_size.max(1);
            thread::Builder::new()
                .name("osc-receiver".into())
                .spawn(move || receive_loop(&socket, &parser, &stop, buf_len))?
        };

        info!(target: "osc::server", "listening on {}", local_addr);
        Ok(Self {
            parser,
            local_addr,
            stop,
            thread: Some(thread),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Oldest received message, or [`Message::none`] when nothing is waiting.
    pub fn dequeue(&self) -> Message {
        self.parser.dequeue()
    }

    pub fn try_dequeue(&self) -> Option<Message> {
        self.parser.try_dequeue()
    }

    pub fn dequeue_timeout(&self, timeout: Duration) -> Option<Message> {
        self.parser.dequeue_timeout(timeout)
    }

    pub fn message_count(&self) -> usize {
        self.parser.message_count()
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!(target: "osc::server", "osc-receiver thread panicked");
            }
            info!(target: "osc::server", "stopped listening on {}", self.local_addr);
        }
    }
}

impl Drop for OscServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn receive_loop(socket: &UdpSocket, parser: &Parser, stop: &AtomicBool, buf_len: usize) {
    let mut buf = vec![0u8; buf_len];
    while !stop.load(Ordering::Acquire) {
        match socket.recv_from(&mut buf) {
            Ok((len, _from)) => parser.parse_datagram(&buf[..len]),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
            Err(e) => {
                warn!(target: "osc::server", "receive failed: {}", e);
                thread::sleep(READ_TIMEOUT);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ephemeral_port_and_stop() {
        let mut server = OscServer::bind(ServerConfig {
            port: 0,
            ..ServerConfig::default()
        })
        .unwrap();
        assert_ne!(server.local_addr().port(), 0);
        assert!(server.is_running());
        assert!(server.dequeue().is_none());

        server.stop();
        assert!(!server.is_running());
    }

    #[test]
    fn raw_datagram_is_parsed() {
        let server = OscServer::bind(ServerConfig {
            port: 0,
            ..ServerConfig::default()
        })
        .unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let target = ("127.0.0.1", server.local_addr().port());
        sender.send_to(b"/hi\0,T\0\0", target).unwrap();

        let msg = server.dequeue_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(msg.address(), "/hi");
        assert_eq!(msg.bool(0), Ok(true));
    }
}
