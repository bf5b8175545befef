//! Bounded channel adapters.
//!
//! Both channels block the sender while the buffer is full and report drain
//! once the sender is dropped and the buffer is empty.

use super::{Received, Receiver, Sender, TransferError, TransferPrimitive};
use crossbeam::channel;
use std::sync::mpsc;

/// Bounded crossbeam channel.
#[derive(Debug, Clone, Copy)]
pub struct CrossbeamChannel {
    capacity: usize,
}

impl CrossbeamChannel {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }
}

pub struct CrossbeamSender(channel::Sender<i64>);

pub struct CrossbeamReceiver(channel::Receiver<i64>);

impl Sender for CrossbeamSender {
    #[inline]
    fn send(&mut self, value: i64) -> Result<(), TransferError> {
        self.0.send(value).map_err(|_| TransferError::Disconnected)
    }
}

impl Receiver for CrossbeamReceiver {
    #[inline]
    fn receive(&mut self) -> Result<Received, TransferError> {
        match self.0.recv() {
            Ok(value) => Ok(Received::Value(value)),
            Err(channel::RecvError) => Ok(Received::Drained),
        }
    }
}

impl TransferPrimitive for CrossbeamChannel {
    type Sender = CrossbeamSender;
    type Receiver = CrossbeamReceiver;

    fn name(&self) -> &'static str {
        "crossbeam-channel"
    }

    fn split(self) -> (Self::Sender, Self::Receiver) {
        let (tx, rx) = channel::bounded(self.capacity);
        (CrossbeamSender(tx), CrossbeamReceiver(rx))
    }
}

/// Bounded standard library channel (`sync_channel`).
#[derive(Debug, Clone, Copy)]
pub struct StdChannel {
    capacity: usize,
}

impl StdChannel {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }
}

pub struct StdSender(mpsc::SyncSender<i64>);

pub struct StdReceiver(mpsc::Receiver<i64>);

impl Sender for StdSender {
    #[inline]
    fn send(&mut self, value: i64) -> Result<(), TransferError> {
        self.0.send(value).map_err(|_| TransferError::Disconnected)
    }
}

impl Receiver for StdReceiver {
    #[inline]
    fn receive(&mut self) -> Result<Received, TransferError> {
        match self.0.recv() {
            Ok(value) => Ok(Received::Value(value)),
            Err(mpsc::RecvError) => Ok(Received::Drained),
        }
    }
}

impl TransferPrimitive for StdChannel {
    type Sender = StdSender;
    type Receiver = StdReceiver;

    fn name(&self) -> &'static str {
        "std-channel"
    }

    fn split(self) -> (Self::Sender, Self::Receiver) {
        let (tx, rx) = mpsc::sync_channel(self.capacity);
        (StdSender(tx), StdReceiver(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::test_support::{expected_sequence, transfer_sequence};

    #[test]
    fn test_crossbeam_channel_preserves_order_and_drains() {
        let observed = transfer_sequence(CrossbeamChannel::new(16), 1_000);
        assert_eq!(observed, expected_sequence(1_000, true));
    }

    #[test]
    fn test_std_channel_preserves_order_and_drains() {
        let observed = transfer_sequence(StdChannel::new(16), 1_000);
        assert_eq!(observed, expected_sequence(1_000, true));
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (mut tx, rx) = CrossbeamChannel::new(4).split();
        drop(rx);
        assert_eq!(tx.send(1), Err(TransferError::Disconnected));

        let (mut tx, rx) = StdChannel::new(4).split();
        drop(rx);
        assert_eq!(tx.send(1), Err(TransferError::Disconnected));
    }
}
