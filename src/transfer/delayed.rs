//! Fixed-delay fake queue.
//!
//! An in-memory FIFO whose every receive completes no earlier than
//! `delay_ns` after it was requested, measured on the clock the queue was
//! built with. Paired with a [`SimulatedClock`](crate::clock::SimulatedClock)
//! the delay is exact, which gives the harness a primitive with a known
//! latency distribution. Paired with a real clock it spins, which is useful
//! as a sanity check of a live machine.

use super::{Received, Receiver, Sender, TransferError, TransferPrimitive};
use crate::clock::TimestampSource;
use crossbeam::channel;

#[derive(Debug, Clone)]
pub struct DelayedQueue<C> {
    clock: C,
    delay_ns: u64,
    capacity: usize,
}

impl<C> DelayedQueue<C>
where
    C: TimestampSource + Clone + Send,
{
    pub fn new(clock: C, delay_ns: u64, capacity: usize) -> Self {
        Self {
            clock,
            delay_ns,
            capacity,
        }
    }
}

pub struct DelayedSender(channel::Sender<i64>);

pub struct DelayedReceiver<C> {
    inner: channel::Receiver<i64>,
    clock: C,
    delay_ns: u64,
}

impl Sender for DelayedSender {
    #[inline]
    fn send(&mut self, value: i64) -> Result<(), TransferError> {
        self.0.send(value).map_err(|_| TransferError::Disconnected)
    }
}

impl<C> Receiver for DelayedReceiver<C>
where
    C: TimestampSource + Send,
{
    fn receive(&mut self) -> Result<Received, TransferError> {
        let requested_at = self.clock.now();
        let received = match self.inner.recv() {
            Ok(value) => Received::Value(value),
            Err(channel::RecvError) => return Ok(Received::Drained),
        };
        self.clock.wait_until(requested_at + self.delay_ns);
        Ok(received)
    }
}

impl<C> TransferPrimitive for DelayedQueue<C>
where
    C: TimestampSource + Clone + Send,
{
    type Sender = DelayedSender;
    type Receiver = DelayedReceiver<C>;

    fn name(&self) -> &'static str {
        "delayed-queue"
    }

    fn split(self) -> (Self::Sender, Self::Receiver) {
        let (tx, rx) = channel::bounded(self.capacity);
        (
            DelayedSender(tx),
            DelayedReceiver {
                inner: rx,
                clock: self.clock,
                delay_ns: self.delay_ns,
            },
        )
    }
}
