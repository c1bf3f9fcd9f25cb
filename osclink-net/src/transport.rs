//! Where serialized packets go.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::{Arc, Mutex, PoisonError};

/// Sink for encoded packets. One call is one datagram.
pub trait Transport: Send {
    fn send(&self, bytes: &[u8]) -> io::Result<()>;
}

impl<T: Transport + Sync> Transport for Arc<T> {
    fn send(&self, bytes: &[u8]) -> io::Result<()> {
        (**self).send(bytes)
    }
}

/// UDP socket connected to a single remote endpoint.
pub struct UdpTransport {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpTransport {
    /// Bind an ephemeral local port and connect it to `address:port`.
    pub fn connect(address: &str, port: u16) -> io::Result<Self> {
        let target = (address, port).to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("{}:{} did not resolve to an address", address, port),
            )
        })?;
        let local: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(local)?;
        socket.connect(target)?;
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl Transport for UdpTransport {
    fn send(&self, bytes: &[u8]) -> io::Result<()> {
        self.socket.send(bytes).map(|_| ())
    }
}

/// Discards everything.
pub struct NullTransport;

impl Transport for NullTransport {
    fn send(&self, _bytes: &[u8]) -> io::Result<()> {
        Ok(())
    }
}

/// Keeps every datagram in memory, for tests and diagnostics.
///
/// Share it as `Arc<RecordingTransport>` to inspect what a worker sent.
#[derive(Default)]
pub struct RecordingTransport {
    datagrams: Mutex<Vec<Vec<u8>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything sent so far, oldest first.
    pub fn datagrams(&self) -> Vec<Vec<u8>> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Vec<u8>>> {
        self.datagrams.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for RecordingTransport {
    fn send(&self, bytes: &[u8]) -> io::Result<()> {
        self.lock().push(bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_keeps_order() {
        let recorder = Arc::new(RecordingTransport::new());
        let transport: Box<dyn Transport> = Box::new(recorder.clone());
        transport.send(b"one").unwrap();
        transport.send(b"two").unwrap();
        assert_eq!(recorder.datagrams(), vec![b"one".to_vec(), b"two".to_vec()]);
        recorder.clear();
        assert!(recorder.is_empty());
    }

    #[test]
    fn udp_reaches_a_local_socket() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(std::time::Duration::from_secs(2)))
            .unwrap();
        let port = receiver.local_addr().unwrap().port();

        let transport = UdpTransport::connect("127.0.0.1", port).unwrap();
        assert_eq!(transport.target().port(), port);
        transport.send(b"/ping\0\0\0").unwrap();

        let mut buf = [0u8; 64];
        let n = receiver.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"/ping\0\0\0");
    }
}
