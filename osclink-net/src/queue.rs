//! Bounded outbound packet queue with drop-oldest backpressure.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use crossbeam_queue::ArrayQueue;
use log::debug;

use osclink_types::Packet;

/// Packets waiting for the sender worker.
///
/// Producers never block: once `capacity` packets are queued, each new
/// packet evicts the oldest one. Push and eviction happen in a single
/// `force_push`, so nothing is evicted unless the queue really is full.
pub struct SendQueue {
    packets: ArrayQueue<Packet>,
    // one-slot doorbell; a ring stays latched until the worker takes it
    bell_tx: Sender<()>,
    bell_rx: Receiver<()>,
    dropped: AtomicU64,
}

impl SendQueue {
    /// A queue holding at most `max_queue_size` packets (at least one).
    pub fn new(max_queue_size: usize) -> Self {
        let (bell_tx, bell_rx) = crossbeam_channel::bounded(1);
        Self {
            packets: ArrayQueue::new(max_queue_size.max(1)),
            bell_tx,
            bell_rx,
            dropped: AtomicU64::new(0),
        }
    }

    pub fn enqueue(&self, packet: impl Into<Packet>) {
        if self.packets.force_push(packet.into()).is_some() {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(
                target: "osc::sender",
                "send queue full ({}), evicted oldest packet ({} total)",
                self.packets.capacity(),
                total
            );
        }
        // full means a wakeup is already pending
        let _ = self.bell_tx.try_send(());
    }

    pub fn try_dequeue(&self) -> Option<Packet> {
        self.packets.pop()
    }

    /// Wait up to `timeout` for the oldest packet.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Packet> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(packet) = self.packets.pop() {
                return Some(packet);
            }
            // a ring latched after the pop above wakes this immediately
            if self.bell_rx.recv_deadline(deadline).is_err() {
                return self.packets.pop();
            }
        }
    }

    /// Discard everything queued. Returns how many packets were removed.
    pub fn clear(&self) -> usize {
        std::iter::from_fn(|| self.packets.pop()).count()
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.packets.capacity()
    }

    /// Packets evicted because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
