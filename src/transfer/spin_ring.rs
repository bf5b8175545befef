//! Lock-free bounded ring with busy-wait handoff.
//!
//! Built on crossbeam's `ArrayQueue`. Neither side ever parks: a full ring
//! makes the producer spin, an empty ring makes the consumer spin, both with
//! crossbeam's `Backoff` so that an unpinned run still yields to the scheduler
//! when the peer is descheduled. Closing is an explicit flag, so the consumer
//! can drain without knowing the item count.

use super::{Received, Receiver, Sender, TransferError, TransferPrimitive};
use crossbeam::queue::ArrayQueue;
use crossbeam::utils::{Backoff, CachePadded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Spin-waiting SPSC ring.
#[derive(Debug, Clone, Copy)]
pub struct SpinRing {
    capacity: usize,
}

impl SpinRing {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }
}

struct Shared {
    queue: ArrayQueue<i64>,
    closed: CachePadded<AtomicBool>,
    receiver_gone: CachePadded<AtomicBool>,
}

pub struct SpinRingSender {
    shared: Arc<Shared>,
}

pub struct SpinRingReceiver {
    shared: Arc<Shared>,
}

impl Sender for SpinRingSender {
    #[inline]
    fn send(&mut self, value: i64) -> Result<(), TransferError> {
        let backoff = Backoff::new();
        let mut value = value;
        loop {
            match self.shared.queue.push(value) {
                Ok(()) => return Ok(()),
                Err(rejected) => value = rejected,
            }
            if self.shared.receiver_gone.load(Ordering::Acquire) {
                return Err(TransferError::Disconnected);
            }
            backoff.snooze();
        }
    }
}

impl Drop for SpinRingSender {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::Release);
    }
}

impl Receiver for SpinRingReceiver {
    #[inline]
    fn receive(&mut self) -> Result<Received, TransferError> {
        let backoff = Backoff::new();
        loop {
            if let Some(value) = self.shared.queue.pop() {
                return Ok(Received::Value(value));
            }
            if self.shared.closed.load(Ordering::Acquire) {
                // A push may have landed between the pop and the flag check.
                return Ok(match self.shared.queue.pop() {
                    Some(value) => Received::Value(value),
                    None => Received::Drained,
                });
            }
            backoff.snooze();
        }
    }
}

impl Drop for SpinRingReceiver {
    fn drop(&mut self) {
        self.shared.receiver_gone.store(true, Ordering::Release);
    }
}

impl TransferPrimitive for SpinRing {
    type Sender = SpinRingSender;
    type Receiver = SpinRingReceiver;

    fn name(&self) -> &'static str {
        "spin-ring"
    }

    fn split(self) -> (Self::Sender, Self::Receiver) {
        let shared = Arc::new(Shared {
            queue: ArrayQueue::new(self.capacity.max(1)),
            closed: CachePadded::new(AtomicBool::new(false)),
            receiver_gone: CachePadded::new(AtomicBool::new(false)),
        });
        (
            SpinRingSender {
                shared: Arc::clone(&shared),
            },
            SpinRingReceiver { shared },
        )
    }
}
