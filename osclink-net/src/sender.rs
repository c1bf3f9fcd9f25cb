//! Dedicated send thread draining a [`SendQueue`] into a [`Transport`].
//!
//! Producers only ever touch the queue. The worker serializes each packet
//! into one reusable scratch buffer and hands the bytes to the transport, so
//! socket I/O and encoding both stay off the producer threads.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{error, warn};

use crate::queue::SendQueue;
use crate::transport::Transport;
use crate::writer;

/// How long the worker blocks on an empty queue before re-checking the stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Initial scratch buffer capacity; grows to the largest packet seen.
const SCRATCH_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, Default)]
pub struct SenderOptions {
    /// Minimum spacing between the starts of consecutive sends. Zero disables pacing.
    pub send_interval: Duration,
}

/// Running sender worker. Dropping the handle stops and joins it.
pub struct SenderHandle {
    stop: Arc<AtomicBool>,
    sent: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl SenderHandle {
    /// Ask the worker to exit after the packet in hand, then join it.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!(target: "osc::sender", "osc-sender thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Packets handed to the transport successfully.
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

impl Drop for SenderHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawn the `osc-sender` thread.
pub fn spawn_sender(
    queue: Arc<SendQueue>,
    transport: Box<dyn Transport>,
    options: SenderOptions,
) -> io::Result<SenderHandle> {
    let stop = Arc::new(AtomicBool::new(false));
    let sent = Arc::new(AtomicU64::new(0));

    let thread = {
        let stop = stop.clone();
        let sent = sent.clone();
        thread::Builder::new()
            .name("osc-sender".into())
            .spawn(move || sender_loop(&queue, transport.as_ref(), options, &stop, &sent))?
    };

    Ok(SenderHandle {
        stop,
        sent,
        thread: Some(thread),
    })
}

fn sender_loop(
    queue: &SendQueue,
    transport: &dyn Transport,
    options: SenderOptions,
    stop: &AtomicBool,
    sent: &AtomicU64,
) {
    let mut scratch = Vec::with_capacity(SCRATCH_CAPACITY);

    while !stop.load(Ordering::Acquire) {
        let Some(packet) = queue.recv_timeout(POLL_INTERVAL) else {
            continue;
        };
        let started = Instant::now();

        scratch.clear();
        let encoded = writer::write_packet(&mut scratch, &packet);
        // pooled storage goes back before the I/O
        drop(packet);

        match encoded {
            Ok(()) => match transport.send(&scratch) {
                Ok(()) => {
                    sent.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    warn!(target: "osc::sender", "send of {} bytes failed: {}", scratch.len(), e);
                }
            },
            Err(e) => error!(target: "osc::sender", "dropping unencodable packet: {}", e),
        }

        if !options.send_interval.is_zero() {
            while started.elapsed() < options.send_interval && !stop.load(Ordering::Relaxed) {
                std::hint::spin_loop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::transport::RecordingTransport;
    use osclink_types::{Message, Value};

    fn wait_for(mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn drains_queue_in_order() {
        let queue = Arc::new(SendQueue::new(16));
        let recorder = Arc::new(RecordingTransport::new());
        let mut handle =
            spawn_sender(queue.clone(), Box::new(recorder.clone()), SenderOptions::default()).unwrap();

        for n in 0..3 {
            queue.enqueue(Message::new("/seq", [Value::Int(n)]));
        }
        assert!(wait_for(|| handle.sent() == 3));
        assert_eq!(recorder.len(), 3);

        let parser = Parser::new();
        for datagram in recorder.datagrams() {
            parser.parse_datagram(&datagram);
        }
        let seen: Vec<i32> = (0..3).map(|_| parser.dequeue().int(0).unwrap()).collect();
        assert_eq!(seen, vec![0, 1, 2]);

        handle.stop();
        assert!(!handle.is_running());
    }

    #[test]
    fn unencodable_packet_is_skipped() {
        let queue = Arc::new(SendQueue::new(4));
        let recorder = Arc::new(RecordingTransport::new());
        let _handle =
            spawn_sender(queue.clone(), Box::new(recorder.clone()), SenderOptions::default()).unwrap();

        queue.enqueue(Message::new("/bad", [Value::Invalid]));
        queue.enqueue(Message::new("/good", []));
        assert!(wait_for(|| recorder.len() == 1));
        assert!(recorder.datagrams()[0].starts_with(b"/good\0"));
    }

    #[test]
    fn interval_spaces_sends() {
        let queue = Arc::new(SendQueue::new(4));
        for _ in 0..3 {
            queue.enqueue(Message::new("/tick", []));
        }

        let recorder = Arc::new(RecordingTransport::new());
        let options = SenderOptions {
            send_interval: Duration::from_millis(15),
        };
        let started = Instant::now();
        let _handle = spawn_sender(queue, Box::new(recorder.clone()), options).unwrap();

        assert!(wait_for(|| recorder.len() == 3));
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
