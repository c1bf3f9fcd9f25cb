//! OSC client: a persistent send queue plus a restartable sender worker.
//!
//! Packets can be queued at any time, including while the client is
//! stopped; they are delivered once the worker runs again.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use log::info;

use osclink_types::{Bundle, Message, Packet, Value};

use crate::queue::SendQueue;
use crate::sender::{spawn_sender, SenderHandle, SenderOptions};
use crate::transport::{Transport, UdpTransport};

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Destination host name or IP.
    pub address: String,
    pub port: u16,
    /// Queue bound; the oldest packets are evicted beyond it.
    pub max_queue_size: usize,
    /// Minimum spacing between sends.
    pub send_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 3333,
            max_queue_size: 100,
            send_interval: Duration::ZERO,
        }
    }
}

/// Lifecycle notifications delivered to [`OscClient::subscribe`] receivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Started { address: String, port: u16 },
    Stopped { address: String, port: u16 },
}

pub struct OscClient {
    config: ClientConfig,
    queue: Arc<SendQueue>,
    worker: Option<SenderHandle>,
    subscribers: Vec<Sender<ClientEvent>>,
}

impl OscClient {
    pub fn new(config: ClientConfig) -> Self {
        let queue = Arc::new(SendQueue::new(config.max_queue_size));
        Self {
            config,
            queue,
            worker: None,
            subscribers: Vec::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Connect a UDP socket to the configured target and start sending.
    pub fn start(&mut self) -> io::Result<()> {
        if self.is_running() {
            return Ok(());
        }
        let transport = UdpTransport::connect(&self.config.address, self.config.port)?;
        self.start_with(Box::new(transport))
    }

    /// Start sending through `transport`. A running worker is stopped first.
    pub fn start_with(&mut self, transport: Box<dyn Transport>) -> io::Result<()> {
        self.stop();

        let options = SenderOptions {
            send_interval: self.config.send_interval,
        };
        self.worker = Some(spawn_sender(self.queue.clone(), transport, options)?);

        info!(
            target: "osc::client",
            "started sending to {}:{}",
            self.config.address,
            self.config.port
        );
        self.notify(ClientEvent::Started {
            address: self.config.address.clone(),
            port: self.config.port,
        });
        Ok(())
    }

    /// Stop the worker. Queued packets stay queued.
    pub fn stop(&mut self) {
        let Some(mut worker) = self.worker.take() else {
            return;
        };
        worker.stop();

        info!(
            target: "osc::client",
            "stopped sending to {}:{} ({} packets pending)",
            self.config.address,
            self.config.port,
            self.queue.len()
        );
        self.notify(ClientEvent::Stopped {
            address: self.config.address.clone(),
            port: self.config.port,
        });
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(SenderHandle::is_running)
    }

    /// Point the client at a new target, restarting it if it was running.
    pub fn retarget(&mut self, address: &str, port: u16) -> io::Result<()> {
        if self.config.address == address && self.config.port == port {
            return Ok(());
        }

        let was_running = self.worker.is_some();
        self.stop();
        self.config.address = address.to_string();
        self.config.port = port;
        if was_running {
            self.start()?;
        }
        Ok(())
    }

    /// Queue a message to `address` carrying `values`.
    pub fn send(&self, address: impl Into<String>, values: impl IntoIterator<Item = Value>) {
        self.queue.enqueue(Message::new(address, values));
    }

    pub fn send_message(&self, msg: Message) {
        self.queue.enqueue(msg);
    }

    pub fn send_bundle(&self, bundle: Bundle) {
        self.queue.enqueue(bundle);
    }

    pub fn send_packet(&self, packet: impl Into<Packet>) {
        self.queue.enqueue(packet);
    }

    /// Packets waiting for the worker.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Packets evicted because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.queue.dropped()
    }

    /// Receive start/stop notifications. Receivers that hang up are forgotten.
    pub fn subscribe(&mut self) -> Receiver<ClientEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    fn notify(&mut self, event: ClientEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl Drop for OscClient {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RecordingTransport;
    use std::time::Instant;

    fn wait_for(mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn lifecycle_events() {
        let mut client = OscClient::new(ClientConfig::default());
        let events = client.subscribe();

        client.start_with(Box::new(RecordingTransport::new())).unwrap();
        assert!(client.is_running());
        client.stop();
        assert!(!client.is_running());

        let seen: Vec<ClientEvent> = events.try_iter().collect();
        assert_eq!(
            seen,
            vec![
                ClientEvent::Started { address: "127.0.0.1".into(), port: 3333 },
                ClientEvent::Stopped { address: "127.0.0.1".into(), port: 3333 },
            ]
        );
    }

    #[test]
    fn stop_without_start_is_silent() {
        let mut client = OscClient::new(ClientConfig::default());
        let events = client.subscribe();
        client.stop();
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn queue_survives_restart() {
        let mut client = OscClient::new(ClientConfig::default());
        client.send("/early", [Value::Int(1)]);
        assert_eq!(client.pending(), 1);

        let recorder = Arc::new(RecordingTransport::new());
        client.start_with(Box::new(recorder.clone())).unwrap();
        assert!(wait_for(|| recorder.len() == 1));
        assert!(recorder.datagrams()[0].starts_with(b"/early\0"));
    }

    #[test]
    fn send_uses_the_given_address() {
        let mut client = OscClient::new(ClientConfig::default());
        let recorder = Arc::new(RecordingTransport::new());
        client.start_with(Box::new(recorder.clone())).unwrap();

        client.send("/given", []);
        assert!(wait_for(|| recorder.len() == 1));
        assert_eq!(recorder.datagrams()[0], b"/given\0\0,\0\0\0");
    }

    #[test]
    fn retarget_while_stopped_only_updates_config() {
        let mut client = OscClient::new(ClientConfig::default());
        let events = client.subscribe();
        client.retarget("localhost", 4000).unwrap();
        assert_eq!(client.config().port, 4000);
        assert!(!client.is_running());
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn overflow_is_counted() {
        let client = OscClient::new(ClientConfig {
            max_queue_size: 2,
            ..ClientConfig::default()
        });
        for n in 0..5 {
            client.send("/n", [Value::Int(n)]);
        }
        assert_eq!(client.pending(), 2);
        assert_eq!(client.dropped(), 3);
    }
}
