//! # Timestamp Sources
//!
//! Monotonic nanosecond timestamps for the trial runner. Every source reports
//! nanoseconds elapsed since its own origin, so two readings from the same
//! source can be subtracted directly into a latency sample.
//!
//! ## Available Sources
//!
//! - **WallClock**: the operating system's monotonic clock via `Instant`.
//!   Portable, but each read is a vDSO call (tens of nanoseconds).
//! - **CycleClock**: the CPU cycle counter (`rdtsc` / `cntvct_el0`) scaled to
//!   nanoseconds with a ratio calibrated once at construction. Cheaper to read,
//!   which matters when the clock itself is the subject of measurement.
//! - **SimulatedClock**: a manually advanced clock for deterministic tests.
//!
//! `LapTimer` is the counter-style alternative to start/end pairs: it
//! preallocates N lap slots and records the time between successive calls
//! to [`LapTimer::next`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// A monotonic nanosecond clock shared by the producer and consumer tasks.
pub trait TimestampSource: Sync {
    /// Current time in nanoseconds since this source's origin.
    ///
    /// Must be non-decreasing across calls on a single thread and must not
    /// have side effects beyond reading the underlying clock.
    fn now(&self) -> u64;

    /// Block until `now()` reaches `deadline_ns`.
    #[inline]
    fn wait_until(&self, deadline_ns: u64) {
        while self.now() < deadline_ns {
            std::hint::spin_loop();
        }
    }

    /// Short identifier used for trial names and log output.
    fn name(&self) -> &'static str;
}

/// Monotonic wall-clock nanoseconds.
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    origin: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimestampSource for WallClock {
    #[inline]
    fn now(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }

    fn name(&self) -> &'static str {
        "wall-clock"
    }
}

/// Cycle-counter clock scaled to nanoseconds.
///
/// The tick-to-nanosecond ratio is calibrated against `Instant` when the clock
/// is created. On platforms without a supported counter the raw reading is
/// already in nanoseconds and the ratio is 1.0.
#[derive(Debug, Clone, Copy)]
pub struct CycleClock {
    origin_ticks: u64,
    ns_per_tick: f64,
}

impl CycleClock {
    /// Number of calibration windows; the median ratio is kept.
    const CALIBRATION_ROUNDS: usize = 15;
    const CALIBRATION_WINDOW: Duration = Duration::from_millis(2);

    /// Create a cycle clock, calibrating the counter frequency first.
    ///
    /// Calibration sleeps for roughly `CALIBRATION_ROUNDS * CALIBRATION_WINDOW`
    /// (about 30ms), so construct the clock before any trial starts.
    pub fn calibrated() -> Self {
        let ns_per_tick = calibrate_ns_per_tick(Self::CALIBRATION_ROUNDS, Self::CALIBRATION_WINDOW);
        debug!(
            "Calibrated cycle counter: {:.4} ns/tick ({:.3} GHz)",
            ns_per_tick,
            1.0 / ns_per_tick
        );
        Self::with_ratio(ns_per_tick)
    }

    /// Create a cycle clock with a known tick-to-nanosecond ratio.
    pub fn with_ratio(ns_per_tick: f64) -> Self {
        Self {
            origin_ticks: read_counter(),
            ns_per_tick,
        }
    }

    /// Nanoseconds represented by one counter tick.
    pub fn ns_per_tick(&self) -> f64 {
        self.ns_per_tick
    }

    /// Raw counter ticks since the origin.
    #[inline]
    pub fn ticks(&self) -> u64 {
        read_counter().wrapping_sub(self.origin_ticks)
    }
}

impl TimestampSource for CycleClock {
    #[inline]
    fn now(&self) -> u64 {
        (self.ticks() as f64 * self.ns_per_tick) as u64
    }

    fn name(&self) -> &'static str {
        "cycle-clock"
    }
}

/// A manually driven clock.
///
/// Time only moves when [`SimulatedClock::advance`] is called or when a
/// caller waits on a deadline, in which case the clock jumps straight to it.
/// Clones share the same underlying time.
#[derive(Debug, Clone, Default)]
pub struct SimulatedClock {
    now_ns: Arc<AtomicU64>,
}

impl SimulatedClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `delta_ns`.
    pub fn advance(&self, delta_ns: u64) {
        self.now_ns.fetch_add(delta_ns, Ordering::AcqRel);
    }
}

impl TimestampSource for SimulatedClock {
    #[inline]
    fn now(&self) -> u64 {
        self.now_ns.load(Ordering::Acquire)
    }

    fn wait_until(&self, deadline_ns: u64) {
        self.now_ns.fetch_max(deadline_ns, Ordering::AcqRel);
    }

    fn name(&self) -> &'static str {
        "simulated-clock"
    }
}

/// Preallocated lap recorder.
///
/// Call [`next`](LapTimer::next) once before the first measured operation and
/// once after each one; every call after the first closes a lap. Returns
/// `false` once all laps have been recorded.
///
/// ```rust
/// # use handoff_bench::clock::{LapTimer, SimulatedClock};
/// let clock = SimulatedClock::new();
/// let mut laps = LapTimer::new(&clock, 3);
/// while laps.next() {
///     clock.advance(5);
/// }
/// assert_eq!(laps.laps(), &[5, 5, 5]);
/// ```
pub struct LapTimer<'a, C: TimestampSource> {
    clock: &'a C,
    laps: Vec<u64>,
    measured: usize,
    lap_start: u64,
    finished: bool,
}

impl<'a, C: TimestampSource> LapTimer<'a, C> {
    pub fn new(clock: &'a C, count: usize) -> Self {
        Self {
            clock,
            laps: vec![0; count],
            measured: 0,
            lap_start: 0,
            finished: false,
        }
    }

    #[inline]
    pub fn next(&mut self) -> bool {
        self.next_with(|| ())
    }

    /// Like [`next`](LapTimer::next), but runs `between` after the current
    /// lap is closed and before the next one opens, so its cost lands in
    /// neither lap.
    #[inline]
    pub fn next_with(&mut self, between: impl FnOnce()) -> bool {
        let now = self.clock.now();
        if self.finished {
            return false;
        }
        if self.measured > 0 {
            self.laps[self.measured - 1] = now.saturating_sub(self.lap_start);
        }
        between();
        if self.measured == self.laps.len() {
            self.finished = true;
            return false;
        }
        self.measured += 1;
        // Re-read so the bookkeeping above is not charged to the next lap.
        self.lap_start = self.clock.now();
        true
    }

    /// Laps recorded so far.
    pub fn laps(&self) -> &[u64] {
        let closed = if self.finished {
            self.measured
        } else {
            self.measured.saturating_sub(1)
        };
        &self.laps[..closed]
    }

    pub fn into_laps(self) -> Vec<u64> {
        self.laps
    }
}

#[cfg(target_arch = "x86_64")]
#[inline]
fn read_counter() -> u64 {
    // SAFETY: rdtsc has no memory effects and is available on every x86_64 CPU.
    #[allow(unused_unsafe)]
    unsafe {
        core::arch::x86_64::_rdtsc()
    }
}

#[cfg(target_arch = "aarch64")]
#[inline]
fn read_counter() -> u64 {
    let ticks: u64;
    // SAFETY: cntvct_el0 is readable from EL0 on all supported aarch64 targets.
    unsafe {
        std::arch::asm!(
            "isb",
            "mrs {}, cntvct_el0",
            out(reg) ticks,
            options(nostack, nomem),
        );
    }
    ticks
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[inline]
fn read_counter() -> u64 {
    use std::sync::OnceLock;
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_nanos() as u64
}

/// Measure the counter against `Instant` over several short windows and
/// return the median nanoseconds-per-tick ratio.
fn calibrate_ns_per_tick(rounds: usize, window: Duration) -> f64 {
    let mut ratios = Vec::with_capacity(rounds);

    for _ in 0..rounds {
        let start_ticks = read_counter();
        let start_time = Instant::now();
        std::thread::sleep(window);
        let elapsed_ticks = read_counter().wrapping_sub(start_ticks);
        let elapsed_ns = start_time.elapsed().as_nanos() as u64;

        if elapsed_ticks == 0 || elapsed_ns == 0 {
            continue;
        }
        ratios.push(elapsed_ns as f64 / elapsed_ticks as f64);
    }

    if ratios.is_empty() {
        return 1.0;
    }

    ratios.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    ratios[ratios.len() / 2]
}
