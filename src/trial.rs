//! # Latency Trial Runner
//!
//! Runs one producer and one consumer over exactly N items through a
//! [`TransferPrimitive`] and turns the captured timestamps into a latency
//! distribution.
//!
//! ## Timestamp Ownership
//!
//! Start and end timestamps live in two preallocated sequences of length N.
//! Each sequence is handed to exactly one task as an exclusive `&mut [u64]`, so
//! no index is ever written by both roles and no locking is needed:
//!
//! - **ReceiveBracket** (default): the consumer owns both sequences and
//!   brackets every `receive` with `start[i] = now()` / `end[i] = now()`.
//! - **SendToReceive**: the producer owns `start[]` and stamps it immediately
//!   before each `send`; the consumer owns `end[]`.
//!
//! ## Trial Phases
//!
//! 1. Allocate timestamp storage and split the primitive (untimed)
//! 2. Spawn the two tasks on scoped OS threads, pin them if configured, and
//!    hold them at a barrier (untimed)
//! 3. Release the barrier and start the trial timer
//! 4. Join both tasks and stop the timer
//! 5. Aggregate the timestamps into a histogram (untimed)
//!
//! ## Failure Policy
//!
//! Delivery is checked against the expected sequence `0..N`. An out-of-order,
//! lost, surplus or missed item aborts the trial: index pairing of start and
//! end timestamps is meaningless once delivery breaks. Nothing is retried.

use crate::clock::{LapTimer, TimestampSource};
use crate::metrics::{aggregate, aggregate_laps, HistogramBounds, LatencyDistribution, RecordingError};
use crate::transfer::{Received, Receiver, Sender, TransferError, TransferPrimitive};
use crate::utils::pin_current_thread;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Barrier;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

/// Which task captures the start timestamp of each sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CaptureMode {
    /// The consumer timestamps immediately before and after each receive.
    #[default]
    ReceiveBracket,
    /// The producer timestamps before each send, the consumer after each receive.
    SendToReceive,
}

/// Per-trial execution settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrialConfig {
    /// Core the producer thread is pinned to, if any.
    pub producer_core: Option<usize>,
    /// Core the consumer thread is pinned to, if any. The clock-only control
    /// trial also runs here.
    pub consumer_core: Option<usize>,
    pub bounds: HistogramBounds,
    pub capture: CaptureMode,
}

/// Immutable record of one completed trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub name: String,
    /// Identifier of the primitive measured; the clock's name for the
    /// clock-only control trial.
    pub primitive: String,
    pub item_count: usize,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    /// Wall time of the concurrent transfer phase only.
    pub elapsed: Duration,
}

/// A finished trial and the distribution built from its samples.
#[derive(Debug, Clone)]
pub struct TrialOutcome {
    pub trial: Trial,
    pub distribution: LatencyDistribution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Producer,
    Consumer,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Producer => write!(f, "producer"),
            Role::Consumer => write!(f, "consumer"),
        }
    }
}

/// Reasons a trial produced no distribution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrialError {
    #[error("item {index} delivered out of order: expected {expected}, received {received}")]
    OutOfOrder {
        index: usize,
        expected: i64,
        received: i64,
    },

    #[error("primitive drained after {received} of {expected} items")]
    Lost { expected: usize, received: usize },

    #[error("primitive delivered unexpected value {value} after the final item")]
    Surplus { value: i64 },

    #[error("transfer failed at item {index}: {source}")]
    Transfer {
        index: usize,
        #[source]
        source: TransferError,
    },

    #[error("{role} thread panicked")]
    WorkerPanicked { role: Role },

    #[error(transparent)]
    Recording(#[from] RecordingError),
}

/// Runs trials against a single timestamp source.
pub struct TrialRunner<C> {
    clock: C,
    config: TrialConfig,
}

impl<C: TimestampSource> TrialRunner<C> {
    pub fn new(clock: C, config: TrialConfig) -> Self {
        Self { clock, config }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn config(&self) -> &TrialConfig {
        &self.config
    }

    /// Transfer `item_count` sequential values through `primitive` and return
    /// the latency distribution of the handoffs.
    ///
    /// ## Errors
    /// - Delivery violations (`OutOfOrder`, `Lost`, `Surplus`, `Transfer`)
    /// - `WorkerPanicked` if either task panicked
    /// - `Recording` if a latency falls outside the configured histogram range
    pub fn run_trial<P>(
        &self,
        name: &str,
        primitive: P,
        item_count: usize,
    ) -> Result<TrialOutcome, TrialError>
    where
        P: TransferPrimitive,
    {
        debug!(
            "Starting trial '{}' ({}): {} items, {:?}",
            name,
            primitive.name(),
            item_count,
            self.config.capture
        );

        let primitive_name = primitive.name();
        let mut starts = vec![0u64; item_count];
        let mut ends = vec![0u64; item_count];
        let (tx, rx) = primitive.split();

        let clock = &self.clock;
        let config = self.config;
        let barrier = Barrier::new(3);
        let barrier = &barrier;
        let (start_slots, end_slots) = (&mut starts[..], &mut ends[..]);

        let (timer, producer, consumer) = thread::scope(|scope| {
            let (producer, consumer) = match config.capture {
                CaptureMode::ReceiveBracket => (
                    scope.spawn(move || {
                        pin_current_thread(config.producer_core, Role::Producer);
                        barrier.wait();
                        produce::<false, _, _>(clock, tx, item_count, &mut [])
                    }),
                    scope.spawn(move || {
                        pin_current_thread(config.consumer_core, Role::Consumer);
                        barrier.wait();
                        consume::<true, _, _>(clock, rx, item_count, start_slots, end_slots)
                    }),
                ),
                CaptureMode::SendToReceive => (
                    scope.spawn(move || {
                        pin_current_thread(config.producer_core, Role::Producer);
                        barrier.wait();
                        produce::<true, _, _>(clock, tx, item_count, start_slots)
                    }),
                    scope.spawn(move || {
                        pin_current_thread(config.consumer_core, Role::Consumer);
                        barrier.wait();
                        consume::<false, _, _>(clock, rx, item_count, &mut [], end_slots)
                    }),
                ),
            };

            barrier.wait();
            let timer = PhaseTimer::start();
            let producer = producer.join();
            let consumer = consumer.join();
            (timer, producer, consumer)
        });
        let trial = timer.finish(name, primitive_name, item_count);

        settle(producer, consumer)?;
        let distribution = aggregate(&starts, &ends, config.bounds)?;
        log_outcome(&trial, &distribution);
        Ok(TrialOutcome {
            trial,
            distribution,
        })
    }

    /// Counter-style variant of [`run_trial`](Self::run_trial).
    ///
    /// The consumer drives a [`LapTimer`] with one lap per receive instead of
    /// start/end pairs. Received values are stored in a preallocated slot
    /// sequence and checked after the timed phase, keeping the check out of
    /// the laps.
    pub fn run_lap_trial<P>(
        &self,
        name: &str,
        primitive: P,
        item_count: usize,
    ) -> Result<TrialOutcome, TrialError>
    where
        P: TransferPrimitive,
    {
        debug!(
            "Starting lap trial '{}' ({}): {} items",
            name,
            primitive.name(),
            item_count
        );

        let primitive_name = primitive.name();
        let mut values = vec![0i64; item_count];
        let (tx, rx) = primitive.split();

        let clock = &self.clock;
        let config = self.config;
        let barrier = Barrier::new(3);
        let barrier = &barrier;
        let value_slots = &mut values[..];

        let (timer, producer, consumer) = thread::scope(|scope| {
            let producer = scope.spawn(move || {
                pin_current_thread(config.producer_core, Role::Producer);
                barrier.wait();
                produce::<false, _, _>(clock, tx, item_count, &mut [])
            });
            let consumer = scope.spawn(move || {
                pin_current_thread(config.consumer_core, Role::Consumer);
                let laps = LapTimer::new(clock, item_count);
                barrier.wait();
                consume_laps(laps, rx, value_slots)
            });

            barrier.wait();
            let timer = PhaseTimer::start();
            let producer = producer.join();
            let consumer = consumer.join();
            (timer, producer, consumer)
        });
        let trial = timer.finish(name, primitive_name, item_count);

        let laps = settle(producer, consumer)?;
        verify_sequence(&values)?;
        let distribution = aggregate_laps(&laps, config.bounds)?;
        log_outcome(&trial, &distribution);
        Ok(TrialOutcome {
            trial,
            distribution,
        })
    }

    /// Clock-only control trial: two back-to-back `now()` calls per sample
    /// with no transfer in between, on the consumer core.
    ///
    /// The resulting distribution is the floor every primitive trial is read
    /// against; it is reported next to them, never subtracted from them.
    pub fn run_clock_baseline(
        &self,
        name: &str,
        item_count: usize,
    ) -> Result<TrialOutcome, TrialError> {
        debug!("Starting clock baseline '{}': {} items", name, item_count);

        let mut starts = vec![0u64; item_count];
        let mut ends = vec![0u64; item_count];

        let clock = &self.clock;
        let config = self.config;
        let (start_slots, end_slots) = (&mut starts[..], &mut ends[..]);

        let timed = thread::scope(|scope| {
            scope
                .spawn(move || {
                    pin_current_thread(config.consumer_core, Role::Consumer);
                    let timer = PhaseTimer::start();
                    for (start, end) in start_slots.iter_mut().zip(end_slots.iter_mut()) {
                        *start = clock.now();
                        *end = clock.now();
                    }
                    timer
                })
                .join()
        });
        let trial = timed
            .map_err(|_| TrialError::WorkerPanicked {
                role: Role::Consumer,
            })?
            .finish(name, clock.name(), item_count);

        let distribution = aggregate(&starts, &ends, config.bounds)?;
        log_outcome(&trial, &distribution);
        Ok(TrialOutcome {
            trial,
            distribution,
        })
    }
}

/// Consumer progress through the item sequence.
#[derive(Debug, Clone, Copy)]
enum ConsumerState {
    /// Waiting for item `index`.
    AwaitingNext { index: usize },
    /// Item `index` arrived carrying `value`; not yet checked.
    Received { index: usize, value: i64 },
    /// All items delivered and the primitive confirmed there are no more.
    Drained,
}

/// Producer task. With `STAMP`, writes `starts[i]` right before sending item i.
fn produce<const STAMP: bool, C, S>(
    clock: &C,
    mut tx: S,
    item_count: usize,
    starts: &mut [u64],
) -> Result<(), TrialError>
where
    C: TimestampSource,
    S: Sender,
{
    for index in 0..item_count {
        if STAMP {
            starts[index] = clock.now();
        }
        tx.send(index as i64)
            .map_err(|source| TrialError::Transfer { index, source })?;
    }
    tx.close();
    Ok(())
}

/// Consumer task. Always writes `ends[i]`; with `BRACKET`, also `starts[i]`.
fn consume<const BRACKET: bool, C, R>(
    clock: &C,
    mut rx: R,
    item_count: usize,
    starts: &mut [u64],
    ends: &mut [u64],
) -> Result<(), TrialError>
where
    C: TimestampSource,
    R: Receiver,
{
    let mut state = ConsumerState::AwaitingNext { index: 0 };
    loop {
        state = match state {
            ConsumerState::AwaitingNext { index } if index < item_count => {
                let start = if BRACKET { clock.now() } else { 0 };
                let received = rx.receive();
                let end = clock.now();
                match received {
                    Ok(Received::Value(value)) => {
                        if BRACKET {
                            starts[index] = start;
                        }
                        ends[index] = end;
                        ConsumerState::Received { index, value }
                    }
                    Ok(Received::Drained) => {
                        return Err(TrialError::Lost {
                            expected: item_count,
                            received: index,
                        })
                    }
                    Err(source) => return Err(TrialError::Transfer { index, source }),
                }
            }
            ConsumerState::AwaitingNext { .. } => {
                expect_drain(&mut rx, item_count)?;
                ConsumerState::Drained
            }
            ConsumerState::Received { index, value } => {
                check_item(index, value)?;
                ConsumerState::AwaitingNext { index: index + 1 }
            }
            ConsumerState::Drained => return Ok(()),
        };
    }
}

/// Lap-timed consumer task. Returns the recorded laps.
///
/// A lap covers one `receive` only. Its result is handled between laps,
/// after the closing clock read and before the next opening one.
fn consume_laps<C, R>(
    mut laps: LapTimer<'_, C>,
    mut rx: R,
    values: &mut [i64],
) -> Result<Vec<u64>, TrialError>
where
    C: TimestampSource,
    R: Receiver,
{
    let expected = values.len();
    let mut index = 0;
    let mut held: Option<Result<Received, TransferError>> = None;
    let mut failure: Option<TrialError> = None;

    while laps.next_with(|| match held.take() {
        Some(Ok(Received::Value(value))) => {
            values[index] = value;
            index += 1;
        }
        Some(Ok(Received::Drained)) => {
            failure = Some(TrialError::Lost {
                expected,
                received: index,
            })
        }
        Some(Err(source)) => failure = Some(TrialError::Transfer { index, source }),
        None => {}
    }) {
        if failure.is_some() {
            break;
        }
        held = Some(rx.receive());
    }

    if let Some(failure) = failure {
        return Err(failure);
    }
    expect_drain(&mut rx, expected)?;
    Ok(laps.into_laps())
}

/// After the final item, a draining primitive must report that it is empty.
fn expect_drain<R: Receiver>(rx: &mut R, item_count: usize) -> Result<(), TrialError> {
    if !rx.signals_drain() {
        return Ok(());
    }
    match rx.receive() {
        Ok(Received::Drained) => Ok(()),
        Ok(Received::Value(value)) => Err(TrialError::Surplus { value }),
        Err(source) => Err(TrialError::Transfer {
            index: item_count,
            source,
        }),
    }
}

#[inline]
fn check_item(index: usize, value: i64) -> Result<(), TrialError> {
    if value != index as i64 {
        return Err(TrialError::OutOfOrder {
            index,
            expected: index as i64,
            received: value,
        });
    }
    Ok(())
}

fn verify_sequence(values: &[i64]) -> Result<(), TrialError> {
    values
        .iter()
        .enumerate()
        .try_for_each(|(index, &value)| check_item(index, value))
}

/// Combine the two task results. Panics outrank delivery errors, and a
/// consumer error outranks the producer's, since a producer only fails after
/// the consumer has gone away.
fn settle<T>(
    producer: thread::Result<Result<(), TrialError>>,
    consumer: thread::Result<Result<T, TrialError>>,
) -> Result<T, TrialError> {
    let producer = producer.map_err(|_| TrialError::WorkerPanicked {
        role: Role::Producer,
    })?;
    let consumer = consumer.map_err(|_| TrialError::WorkerPanicked {
        role: Role::Consumer,
    })?;
    let value = consumer?;
    producer?;
    Ok(value)
}

/// Wall-clock bracket around the concurrent phase of a trial.
struct PhaseTimer {
    started_at: DateTime<Utc>,
    timer: Instant,
}

impl PhaseTimer {
    fn start() -> Self {
        Self {
            started_at: Utc::now(),
            timer: Instant::now(),
        }
    }

    fn finish(self, name: &str, primitive: &str, item_count: usize) -> Trial {
        let elapsed = self.timer.elapsed();
        Trial {
            name: name.to_string(),
            primitive: primitive.to_string(),
            item_count,
            started_at: self.started_at,
            stopped_at: Utc::now(),
            elapsed,
        }
    }
}

fn log_outcome(trial: &Trial, distribution: &LatencyDistribution) {
    info!(
        "Trial '{}' ({}) finished: {} samples in {:?}, p50={}ns p99={}ns max={}ns",
        trial.name,
        trial.primitive,
        distribution.len(),
        trial.elapsed,
        distribution.value_at_percentile(50.0),
        distribution.value_at_percentile(99.0),
        distribution.histogram().max()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{SimulatedClock, WallClock};
    use crate::transfer::{CrossbeamChannel, DelayedQueue, Diode, SpinRing};

    /// Generous ceiling for tests on real clocks, where an unpinned thread can
    /// be descheduled for milliseconds on a busy machine.
    fn relaxed_config() -> TrialConfig {
        TrialConfig {
            bounds: HistogramBounds::default().with_highest(60_000_000_000),
            ..TrialConfig::default()
        }
    }

    /// Delivers `0..n` with two adjacent items swapped.
    struct Swapping;

    struct SwappingSender(crossbeam::channel::Sender<i64>);
    struct SwappingReceiver(crossbeam::channel::Receiver<i64>);

    impl Sender for SwappingSender {
        fn send(&mut self, value: i64) -> Result<(), TransferError> {
            let value = match value {
                3 => 4,
                4 => 3,
                other => other,
            };
            self.0.send(value).map_err(|_| TransferError::Disconnected)
        }
    }

    impl Receiver for SwappingReceiver {
        fn receive(&mut self) -> Result<Received, TransferError> {
            Ok(self.0.recv().map_or(Received::Drained, Received::Value))
        }
    }

    impl TransferPrimitive for Swapping {
        type Sender = SwappingSender;
        type Receiver = SwappingReceiver;

        fn name(&self) -> &'static str {
            "swapping"
        }

        fn split(self) -> (Self::Sender, Self::Receiver) {
            let (tx, rx) = crossbeam::channel::unbounded();
            (SwappingSender(tx), SwappingReceiver(rx))
        }
    }

    /// Sends one extra value after the expected sequence.
    struct Chatty;

    struct ChattySender(crossbeam::channel::Sender<i64>);

    impl Sender for ChattySender {
        fn send(&mut self, value: i64) -> Result<(), TransferError> {
            self.0.send(value).map_err(|_| TransferError::Disconnected)
        }

        fn close(self) {
            let _ = self.0.send(-1);
        }
    }

    impl TransferPrimitive for Chatty {
        type Sender = ChattySender;
        type Receiver = SwappingReceiver;

        fn name(&self) -> &'static str {
            "chatty"
        }

        fn split(self) -> (Self::Sender, Self::Receiver) {
            let (tx, rx) = crossbeam::channel::unbounded();
            (ChattySender(tx), SwappingReceiver(rx))
        }
    }

    /// Closes after the third item regardless of the requested count.
    struct Truncating;

    struct TruncatingSender(Option<crossbeam::channel::Sender<i64>>);

    impl Sender for TruncatingSender {
        fn send(&mut self, value: i64) -> Result<(), TransferError> {
            if value == 3 {
                self.0 = None;
            }
            if let Some(tx) = &self.0 {
                tx.send(value).map_err(|_| TransferError::Disconnected)?;
            }
            Ok(())
        }
    }

    impl TransferPrimitive for Truncating {
        type Sender = TruncatingSender;
        type Receiver = SwappingReceiver;

        fn name(&self) -> &'static str {
            "truncating"
        }

        fn split(self) -> (Self::Sender, Self::Receiver) {
            let (tx, rx) = crossbeam::channel::unbounded();
            (TruncatingSender(Some(tx)), SwappingReceiver(rx))
        }
    }

    #[test]
    fn test_fixed_delay_is_reproduced_exactly() {
        let clock = SimulatedClock::new();
        let runner = TrialRunner::new(clock.clone(), TrialConfig::default());
        let queue = DelayedQueue::new(clock, 100, 64);

        let outcome = runner.run_trial("delayed", queue, 1_000).unwrap();
        let distribution = outcome.distribution;
        assert_eq!(distribution.len(), 1_000);
        assert_eq!(distribution.histogram().min(), 100);
        assert_eq!(distribution.histogram().max(), 100);
        assert_eq!(outcome.trial.item_count, 1_000);
        assert_eq!(outcome.trial.name, "delayed");
        assert_eq!(outcome.trial.primitive, "delayed-queue");
    }

    #[test]
    fn test_zero_items_yield_empty_histogram() {
        let runner = TrialRunner::new(WallClock::new(), relaxed_config());
        let outcome = runner.run_trial("empty", CrossbeamChannel::new(8), 0).unwrap();
        assert!(outcome.distribution.is_empty());

        let outcome = runner.run_trial("empty-diode", Diode::new(8), 0).unwrap();
        assert!(outcome.distribution.is_empty());

        let outcome = runner.run_lap_trial("empty-laps", SpinRing::new(8), 0).unwrap();
        assert!(outcome.distribution.is_empty());

        let outcome = runner.run_clock_baseline("empty-baseline", 0).unwrap();
        assert!(outcome.distribution.is_empty());
    }

    #[test]
    fn test_send_to_receive_capture() {
        let config = TrialConfig {
            capture: CaptureMode::SendToReceive,
            ..relaxed_config()
        };
        let runner = TrialRunner::new(WallClock::new(), config);
        let outcome = runner
            .run_trial("send-to-receive", CrossbeamChannel::new(1024), 10_000)
            .unwrap();
        assert_eq!(outcome.distribution.len(), 10_000);
    }

    #[test]
    fn test_out_of_order_delivery_is_fatal() {
        let runner = TrialRunner::new(WallClock::new(), relaxed_config());
        let err = runner.run_trial("swapping", Swapping, 10).unwrap_err();
        assert_eq!(
            err,
            TrialError::OutOfOrder {
                index: 3,
                expected: 3,
                received: 4,
            }
        );

        let err = runner.run_lap_trial("swapping-laps", Swapping, 10).unwrap_err();
        assert!(matches!(err, TrialError::OutOfOrder { index: 3, .. }));
    }

    #[test]
    fn test_surplus_item_is_fatal() {
        let runner = TrialRunner::new(WallClock::new(), relaxed_config());
        let err = runner.run_trial("chatty", Chatty, 5).unwrap_err();
        assert_eq!(err, TrialError::Surplus { value: -1 });
    }

    #[test]
    fn test_lossy_primitive_overflow_is_fatal() {
        let clock = SimulatedClock::new();
        // Overrun a two-slot diode before the consumer's first receive.
        let (mut tx, rx) = Diode::new(2).split();
        for value in 0..3 {
            tx.send(value).unwrap();
        }
        let err = consume::<true, _, _>(&clock, rx, 3, &mut [0; 3], &mut [0; 3]).unwrap_err();
        assert_eq!(
            err,
            TrialError::Transfer {
                index: 0,
                source: TransferError::Missed { count: 1 },
            }
        );
    }

    #[test]
    fn test_range_violation_is_reported() {
        let clock = SimulatedClock::new();
        let runner = TrialRunner::new(clock.clone(), TrialConfig::default());
        let queue = DelayedQueue::new(clock, 2_000_000, 8);

        let err = runner.run_trial("stalled", queue, 3).unwrap_err();
        assert!(matches!(
            err,
            TrialError::Recording(RecordingError::OutOfRange {
                violations: 3,
                first_index: 0,
                first_latency_ns: 2_000_000,
                ..
            })
        ));
    }

    #[test]
    fn test_lap_trial_with_simulated_delay() {
        let clock = SimulatedClock::new();
        let runner = TrialRunner::new(clock.clone(), TrialConfig::default());
        let queue = DelayedQueue::new(clock, 250, 16);

        let outcome = runner.run_lap_trial("laps", queue, 500).unwrap();
        assert_eq!(outcome.distribution.len(), 500);
        assert_eq!(outcome.distribution.value_at_percentile(50.0), 250);
        assert_eq!(outcome.distribution.value_at_percentile(100.0), 250);
    }

    #[test]
    fn test_lap_trial_reports_early_drain() {
        let runner = TrialRunner::new(WallClock::new(), relaxed_config());
        let err = runner.run_lap_trial("short-laps", Truncating, 10).unwrap_err();
        assert_eq!(
            err,
            TrialError::Lost {
                expected: 10,
                received: 3,
            }
        );
    }

    #[test]
    fn test_custom_trial_name_keeps_primitive() {
        let runner = TrialRunner::new(WallClock::new(), relaxed_config());

        let outcome = runner
            .run_trial("warm-cache", SpinRing::new(64), 100)
            .unwrap();
        assert_eq!(outcome.trial.name, "warm-cache");
        assert_eq!(outcome.trial.primitive, "spin-ring");

        let outcome = runner
            .run_lap_trial("cold-cache", CrossbeamChannel::new(64), 100)
            .unwrap();
        assert_eq!(outcome.trial.name, "cold-cache");
        assert_eq!(outcome.trial.primitive, "crossbeam-channel");
    }

    #[test]
    fn test_clock_baseline_records_every_sample() {
        let runner = TrialRunner::new(WallClock::new(), relaxed_config());
        let outcome = runner.run_clock_baseline("control", 10_000).unwrap();
        assert_eq!(outcome.distribution.len(), 10_000);
        assert_eq!(outcome.trial.primitive, "wall-clock");
    }

    #[test]
    fn test_settle_prefers_consumer_error() {
        let producer: thread::Result<Result<(), TrialError>> = Ok(Err(TrialError::Transfer {
            index: 2,
            source: TransferError::Disconnected,
        }));
        let consumer: thread::Result<Result<(), TrialError>> = Ok(Err(TrialError::OutOfOrder {
            index: 1,
            expected: 1,
            received: 7,
        }));
        assert!(matches!(
            settle(producer, consumer),
            Err(TrialError::OutOfOrder { index: 1, .. })
        ));
    }

    #[test]
    fn test_settle_reports_panics_first() {
        let producer: thread::Result<Result<(), TrialError>> = Err(Box::new("boom"));
        let consumer: thread::Result<Result<(), TrialError>> =
            Ok(Err(TrialError::Lost { expected: 4, received: 1 }));
        assert_eq!(
            settle(producer, consumer),
            Err(TrialError::WorkerPanicked {
                role: Role::Producer
            })
        );
    }
}
