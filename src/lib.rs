//! # Handoff Latency Benchmark Library
//!
//! A micro-benchmark harness that measures how long it takes, in nanoseconds,
//! for a value to travel from a single producer to a single consumer through
//! an interchangeable transfer primitive, and reports the result as a full
//! latency distribution rather than an average.
//!
//! ## Supported Transfer Primitives
//!
//! - **crossbeam-channel**: bounded crossbeam channel
//! - **std-channel**: bounded `std::sync::mpsc::sync_channel`
//! - **tokio-mpsc**: bounded Tokio channel driven from dedicated threads
//! - **spin-ring**: lock-free bounded ring with spin/backoff waiting
//! - **unbounded-queue**: unbounded lock-free queue; the producer never waits
//! - **diode**: lossy overwriting ring that reports missed items
//!
//! ## Architecture Overview
//!
//! - `clock`: monotonic nanosecond timestamp sources and the lap recorder
//! - `transfer`: the send/receive capability interface and one adapter per primitive
//! - `trial`: the producer/consumer trial runner
//! - `metrics`: folding samples into HDR histograms and percentile summaries
//! - `report`: writing `<name>.histogram` percentile-distribution artifacts
//! - `results`: run-level JSON summary and console comparison table
//! - `benchmark`: suite orchestration across primitives
//! - `cli`: command-line interface parsing
//! - `logging`: tracing subscriber setup
//! - `utils`: formatting, validation and CPU placement helpers
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use handoff_bench::clock::WallClock;
//! use handoff_bench::transfer::SpinRing;
//! use handoff_bench::trial::{TrialConfig, TrialRunner};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = TrialConfig {
//!         producer_core: Some(2),
//!         consumer_core: Some(3),
//!         ..TrialConfig::default()
//!     };
//!     let runner = TrialRunner::new(WallClock::new(), config);
//!     let outcome = runner.run_trial("spin-ring", SpinRing::new(8192), 100_000)?;
//!
//!     println!("p99: {}ns", outcome.distribution.value_at_percentile(99.0));
//!     Ok(())
//! }
//! ```

/// Suite orchestration
///
/// Contains `BenchmarkConfig` and `BenchmarkRunner`, which turn a list of
/// primitive tags into control and primitive trials, write their artifacts
/// and hand summaries to the results manager.
pub mod benchmark;

/// Command-line interface and configuration
///
/// Argument parsing with clap, including "all" expansion of the primitive list.
pub mod cli;

/// Timestamp sources
pub mod clock;

pub mod logging;

/// Latency aggregation using HDR histograms
///
/// Folds start/end timestamp pairs (or laps) into a bounded, fixed-precision
/// histogram and summarizes it into serializable percentile metrics.
pub mod metrics;

/// Percentile-distribution artifacts
pub mod report;

/// Result collection and output
///
/// Collects one summary per trial, prints the side-by-side comparison table
/// and writes the JSON results document.
pub mod results;

/// Transfer primitive interface and adapters
pub mod transfer;

/// Producer/consumer trial runner
pub mod trial;

pub mod utils;

pub use benchmark::{BenchmarkConfig, BenchmarkRunner};

pub use cli::{Args, ClockKind, PrimitiveKind, TimingMode};

pub use clock::{CycleClock, LapTimer, SimulatedClock, TimestampSource, WallClock};

pub use metrics::{HistogramBounds, LatencyDistribution, LatencyMetrics, RecordingError};

pub use report::DistributionReporter;

pub use results::{ResultsManager, TrialSummary};

pub use transfer::{TransferError, TransferPrimitive};

pub use trial::{CaptureMode, TrialConfig, TrialError, TrialOutcome, TrialRunner};

/// The current version of the handoff benchmark
///
/// Populated from Cargo.toml and written into every results document.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod defaults {
    /// Default number of items transferred per trial
    ///
    /// 100,000 items give stable tail percentiles (p99.9 rests on 100
    /// samples) while a trial still finishes in well under a second on
    /// every integrated primitive.
    pub const MSG_COUNT: usize = 100_000;

    /// Default buffer capacity, in items, of bounded primitives
    pub const CAPACITY: usize = 8192;

    /// Lowest latency the histogram can distinguish from zero, in nanoseconds
    pub const HISTOGRAM_LOWEST_NS: u64 = 1;

    /// Highest recordable latency, in nanoseconds
    ///
    /// A handoff slower than a millisecond means a stall or a timer anomaly;
    /// such samples are reported as errors rather than recorded.
    pub const HISTOGRAM_HIGHEST_NS: u64 = 1_000_000;

    /// Significant decimal digits kept by the histogram
    pub const HISTOGRAM_SIGNIFICANT_FIGURES: u8 = 5;

    /// Default directory for `<name>.histogram` artifacts
    pub const OUTPUT_DIR: &str = ".";

    /// Default output file name for the JSON results document
    pub const OUTPUT_FILE: &str = "handoff_results.json";

    /// Percentiles reported in summaries when none are requested
    pub const PERCENTILES: [f64; 5] = [50.0, 90.0, 99.0, 99.9, 99.99];
}
