//! Tokio bounded mpsc channel, driven from dedicated threads.
//!
//! The trial tasks are plain OS threads, so the channel is used through its
//! blocking API. `blocking_send` and `blocking_recv` panic when called from
//! inside a Tokio runtime; the trial runner never runs the tasks on one.

use super::{Received, Receiver, Sender, TransferError, TransferPrimitive};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy)]
pub struct TokioChannel {
    capacity: usize,
}

impl TokioChannel {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }
}

pub struct TokioSender(mpsc::Sender<i64>);

pub struct TokioReceiver(mpsc::Receiver<i64>);

impl Sender for TokioSender {
    #[inline]
    fn send(&mut self, value: i64) -> Result<(), TransferError> {
        self.0
            .blocking_send(value)
            .map_err(|_| TransferError::Disconnected)
    }
}

impl Receiver for TokioReceiver {
    #[inline]
    fn receive(&mut self) -> Result<Received, TransferError> {
        Ok(match self.0.blocking_recv() {
            Some(value) => Received::Value(value),
            None => Received::Drained,
        })
    }
}

impl TransferPrimitive for TokioChannel {
    type Sender = TokioSender;
    type Receiver = TokioReceiver;

    fn name(&self) -> &'static str {
        "tokio-mpsc"
    }

    fn split(self) -> (Self::Sender, Self::Receiver) {
        // Tokio rejects zero-capacity channels.
        let (tx, rx) = mpsc::channel(self.capacity.max(1));
        (TokioSender(tx), TokioReceiver(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::test_support::{expected_sequence, transfer_sequence};

    #[test]
    fn test_tokio_channel_preserves_order_and_drains() {
        let observed = transfer_sequence(TokioChannel::new(32), 2_000);
        assert_eq!(observed, expected_sequence(2_000, true));
    }

    #[test]
    fn test_zero_capacity_is_promoted() {
        let observed = transfer_sequence(TokioChannel::new(0), 10);
        assert_eq!(observed, expected_sequence(10, true));
    }
}
