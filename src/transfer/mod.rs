//! # Transfer Primitive Adapters
//!
//! The trial runner is written once against the small capability set defined
//! here: a blocking `send`, a blocking `receive`, an optional drain signal and
//! a missed-item report for lossy primitives. Every primitive under test is a
//! separate adapter implementing [`TransferPrimitive`]; adding a primitive never
//! touches the runner.
//!
//! A primitive is consumed by [`TransferPrimitive::split`] into one sending
//! half and one receiving half. Each half is moved into exactly one task, which
//! is what makes the single-producer/single-consumer topology explicit in the
//! types.
//!
//! Adapters must only wrap order-preserving, single-writer/single-reader
//! primitives: the runner pairs start and end timestamps by item index, which
//! is only valid under FIFO delivery.

use thiserror::Error;

pub mod channel;
pub mod delayed;
pub mod diode;
pub mod spin_ring;
pub mod tokio_mpsc;
pub mod unbounded;

pub use channel::{CrossbeamChannel, StdChannel};
pub use delayed::DelayedQueue;
pub use diode::Diode;
pub use spin_ring::SpinRing;
pub use tokio_mpsc::TokioChannel;
pub use unbounded::UnboundedQueue;

/// Outcome of a single blocking receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received {
    /// The next value in delivery order.
    Value(i64),
    /// The sender closed and every value sent before the close was delivered.
    Drained,
}

/// Failures a primitive can report to the harness.
///
/// Blocking and backpressure are never errors; they are what the benchmark
/// measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The other half was dropped without a clean close.
    #[error("peer disconnected")]
    Disconnected,

    /// A lossy primitive overwrote values before they were read.
    #[error("{count} item(s) overwritten before delivery")]
    Missed { count: u64 },
}

/// Sending half of a primitive, owned by the producer task.
pub trait Sender: Send {
    /// Send one value, blocking while the primitive has no room.
    fn send(&mut self, value: i64) -> Result<(), TransferError>;

    /// Signal that no more values will be sent.
    ///
    /// The default implementation drops the sender, which is how channel-style
    /// primitives signal disconnection.
    fn close(self)
    where
        Self: Sized,
    {
    }
}

/// Receiving half of a primitive, owned by the consumer task.
pub trait Receiver: Send {
    /// Receive the next value, blocking while none is available.
    fn receive(&mut self) -> Result<Received, TransferError>;

    /// Whether this primitive reports [`Received::Drained`] after the sender
    /// closes. Consumers of non-draining primitives stop by count.
    fn signals_drain(&self) -> bool {
        true
    }
}

/// A primitive that can be benchmarked by the trial runner.
pub trait TransferPrimitive {
    type Sender: Sender;
    type Receiver: Receiver;

    /// Stable identifier, also used as the default trial name.
    fn name(&self) -> &'static str;

    /// Consume the primitive into its producer and consumer halves.
    fn split(self) -> (Self::Sender, Self::Receiver);
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Push `count` sequential values through a primitive on two threads and
    /// return everything the receiver observed, including the drain marker.
    pub fn transfer_sequence<P>(primitive: P, count: i64) -> Vec<Received>
    where
        P: TransferPrimitive,
    {
        let (mut tx, mut rx) = primitive.split();
        let drains = rx.signals_drain();

        std::thread::scope(|scope| {
            scope.spawn(move || {
                for value in 0..count {
                    tx.send(value).unwrap();
                }
                tx.close();
            });

            let mut observed = Vec::new();
            for _ in 0..count {
                observed.push(rx.receive().unwrap());
            }
            if drains {
                observed.push(rx.receive().unwrap());
            }
            observed
        })
    }

    pub fn expected_sequence(count: i64, drains: bool) -> Vec<Received> {
        let mut expected: Vec<Received> = (0..count).map(Received::Value).collect();
        if drains {
            expected.push(Received::Drained);
        }
        expected
    }
}
