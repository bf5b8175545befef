//! Lossy one-to-one ring ("diode").
//!
//! The producer never blocks: when the ring is full the oldest unread value is
//! overwritten and counted as missed. The reader is told about missed values
//! on its next receive, which the harness treats as fatal because a dropped
//! item breaks the index pairing of start and end timestamps. The reader polls
//! until a value arrives; there is no drain signal, so consumers stop by count.

use super::{Received, Receiver, Sender, TransferError, TransferPrimitive};
use crossbeam::queue::ArrayQueue;
use crossbeam::utils::{Backoff, CachePadded};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Overwriting SPSC ring with missed-item reporting.
#[derive(Debug, Clone, Copy)]
pub struct Diode {
    capacity: usize,
}

impl Diode {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }
}

struct Shared {
    queue: ArrayQueue<i64>,
    missed: CachePadded<AtomicU64>,
    sender_gone: AtomicBool,
}

pub struct DiodeSender {
    shared: Arc<Shared>,
}

pub struct DiodePoller {
    shared: Arc<Shared>,
}

impl Sender for DiodeSender {
    #[inline]
    fn send(&mut self, value: i64) -> Result<(), TransferError> {
        if self.shared.queue.force_push(value).is_some() {
            self.shared.missed.fetch_add(1, Ordering::Release);
        }
        Ok(())
    }
}

impl Drop for DiodeSender {
    fn drop(&mut self) {
        self.shared.sender_gone.store(true, Ordering::Release);
    }
}

impl Receiver for DiodePoller {
    #[inline]
    fn receive(&mut self) -> Result<Received, TransferError> {
        let backoff = Backoff::new();
        loop {
            let missed = self.shared.missed.load(Ordering::Acquire);
            if missed > 0 {
                warn!("Diode dropped {} item(s)", missed);
                return Err(TransferError::Missed { count: missed });
            }
            if let Some(value) = self.shared.queue.pop() {
                return Ok(Received::Value(value));
            }
            if self.shared.sender_gone.load(Ordering::Acquire) && self.shared.queue.is_empty() {
                return Err(TransferError::Disconnected);
            }
            backoff.snooze();
        }
    }

    fn signals_drain(&self) -> bool {
        false
    }
}

impl TransferPrimitive for Diode {
    type Sender = DiodeSender;
    type Receiver = DiodePoller;

    fn name(&self) -> &'static str {
        "diode"
    }

    fn split(self) -> (Self::Sender, Self::Receiver) {
        let shared = Arc::new(Shared {
            queue: ArrayQueue::new(self.capacity.max(1)),
            missed: CachePadded::new(AtomicU64::new(0)),
            sender_gone: AtomicBool::new(false),
        });
        (
            DiodeSender {
                shared: Arc::clone(&shared),
            },
            DiodePoller { shared },
        )
    }
}
