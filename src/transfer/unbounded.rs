//! Unbounded lock-free queue with busy-wait receive.
//!
//! Built on crossbeam's `SegQueue`, which grows in segments instead of
//! applying backpressure. The producer never waits, so every sample measures
//! only the consumer's side of the handoff. Closing is an explicit flag, as in
//! [`SpinRing`](super::SpinRing).

use super::{Received, Receiver, Sender, TransferError, TransferPrimitive};
use crossbeam::queue::SegQueue;
use crossbeam::utils::{Backoff, CachePadded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Spin-waiting unbounded SPSC queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnboundedQueue;

impl UnboundedQueue {
    pub fn new() -> Self {
        Self
    }
}

struct Shared {
    queue: SegQueue<i64>,
    closed: CachePadded<AtomicBool>,
    receiver_gone: CachePadded<AtomicBool>,
}

pub struct UnboundedSender {
    shared: Arc<Shared>,
}

pub struct UnboundedReceiver {
    shared: Arc<Shared>,
}

impl Sender for UnboundedSender {
    #[inline]
    fn send(&mut self, value: i64) -> Result<(), TransferError> {
        if self.shared.receiver_gone.load(Ordering::Acquire) {
            return Err(TransferError::Disconnected);
        }
        self.shared.queue.push(value);
        Ok(())
    }
}

impl Drop for UnboundedSender {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::Release);
    }
}

impl Receiver for UnboundedReceiver {
    #[inline]
    fn receive(&mut self) -> Result<Received, TransferError> {
        let backoff = Backoff::new();
        loop {
            if let Some(value) = self.shared.queue.pop() {
                return Ok(Received::Value(value));
            }
            if self.shared.closed.load(Ordering::Acquire) {
                return Ok(match self.shared.queue.pop() {
                    Some(value) => Received::Value(value),
                    None => Received::Drained,
                });
            }
            backoff.snooze();
        }
    }
}

impl Drop for UnboundedReceiver {
    fn drop(&mut self) {
        self.shared.receiver_gone.store(true, Ordering::Release);
    }
}

impl TransferPrimitive for UnboundedQueue {
    type Sender = UnboundedSender;
    type Receiver = UnboundedReceiver;

    fn name(&self) -> &'static str {
        "unbounded-queue"
    }

    fn split(self) -> (Self::Sender, Self::Receiver) {
        let shared = Arc::new(Shared {
            queue: SegQueue::new(),
            closed: CachePadded::new(AtomicBool::new(false)),
            receiver_gone: CachePadded::new(AtomicBool::new(false)),
        });
        (
            UnboundedSender {
                shared: Arc::clone(&shared),
            },
            UnboundedReceiver { shared },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::test_support::{expected_sequence, transfer_sequence};

    #[test]
    fn test_unbounded_queue_preserves_order_and_drains() {
        let observed = transfer_sequence(UnboundedQueue::new(), 10_000);
        assert_eq!(observed, expected_sequence(10_000, true));
    }

    #[test]
    fn test_send_never_waits_for_the_consumer() {
        let (mut tx, mut rx) = UnboundedQueue::new().split();
        for value in 0..100_000 {
            tx.send(value).unwrap();
        }
        tx.close();

        for value in 0..100_000 {
            assert_eq!(rx.receive(), Ok(Received::Value(value)));
        }
        assert_eq!(rx.receive(), Ok(Received::Drained));
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (mut tx, rx) = UnboundedQueue::new().split();
        drop(rx);
        assert_eq!(tx.send(1), Err(TransferError::Disconnected));
    }
}
