use crate::trial::CaptureMode;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Handoff Latency Benchmark - measures producer-to-consumer latency distributions
/// of single-producer/single-consumer transfer primitives
#[derive(Parser, Debug, Clone)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Transfer primitives to benchmark (space-separated, or all)
    #[clap(short = 'p', long, value_enum, default_values_t = vec![PrimitiveKind::All], help_heading = "Core Options", num_args = 1..)]
    pub primitives: Vec<PrimitiveKind>,

    /// Number of items transferred per trial
    #[clap(short = 'n', long, default_value_t = crate::defaults::MSG_COUNT, help_heading = "Core Options")]
    pub msg_count: usize,

    /// Buffer capacity, in items, of bounded primitives
    #[clap(long, default_value_t = crate::defaults::CAPACITY, help_heading = "Core Options")]
    pub capacity: usize,

    /// Timestamp source used for every sample
    #[clap(long, value_enum, default_value_t = ClockKind::Wall, help_heading = "Timing Options")]
    pub clock: ClockKind,

    /// Where each sample's start timestamp is captured
    #[clap(long, value_enum, default_value_t = TimingMode::Bracket, help_heading = "Timing Options")]
    pub timing: TimingMode,

    /// CPU core to pin the producer thread to
    #[clap(long, help_heading = "Timing Options")]
    pub producer_affinity: Option<usize>,

    /// CPU core to pin the consumer thread (and the clock-only control trial) to
    #[clap(long, help_heading = "Timing Options")]
    pub consumer_affinity: Option<usize>,

    /// Skip the clock-only control trial
    #[clap(long, default_value_t = false, help_heading = "Timing Options")]
    pub no_baseline: bool,

    /// Highest recordable latency in nanoseconds; slower samples fail the trial
    #[clap(long, default_value_t = crate::defaults::HISTOGRAM_HIGHEST_NS, help_heading = "Timing Options")]
    pub max_latency_ns: u64,

    /// Directory for <name>.histogram distribution artifacts
    #[clap(long, default_value = crate::defaults::OUTPUT_DIR, help_heading = "Output Options")]
    pub output_dir: PathBuf,

    /// Output file for the run summary (JSON format)
    #[clap(short = 'o', long, default_value = crate::defaults::OUTPUT_FILE, help_heading = "Output Options")]
    pub output_file: PathBuf,

    /// Percentiles reported in the summary (comma-separated)
    #[clap(long, value_delimiter = ',', default_values_t = crate::defaults::PERCENTILES.to_vec(), help_heading = "Output Options")]
    pub percentiles: Vec<f64>,

    /// Continue running other trials even if one fails
    #[clap(long, default_value_t = false)]
    pub continue_on_error: bool,

    /// Verbose output
    #[clap(short = 'v', long, default_value_t = false)]
    pub verbose: bool,

    /// Also write log output to this file
    #[clap(long)]
    pub log_file: Option<PathBuf>,
}

/// Transfer primitives available for benchmarking
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrimitiveKind {
    /// Bounded crossbeam channel
    #[clap(name = "crossbeam-channel")]
    CrossbeamChannel,

    /// Bounded std::sync::mpsc::sync_channel
    #[clap(name = "std-channel")]
    StdChannel,

    /// Bounded Tokio mpsc channel, blocking API
    #[clap(name = "tokio-mpsc")]
    TokioMpsc,

    /// Lock-free bounded ring with spin/backoff waiting
    #[clap(name = "spin-ring")]
    SpinRing,

    /// Unbounded lock-free queue; the producer never waits
    #[clap(name = "unbounded-queue")]
    UnboundedQueue,

    /// Lossy overwriting ring, sized to the trial
    #[clap(name = "diode")]
    Diode,

    /// All available primitives
    #[clap(name = "all")]
    All,
}

impl std::fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl PrimitiveKind {
    /// Artifact and table name of the primitive.
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveKind::CrossbeamChannel => "crossbeam-channel",
            PrimitiveKind::StdChannel => "std-channel",
            PrimitiveKind::TokioMpsc => "tokio-mpsc",
            PrimitiveKind::SpinRing => "spin-ring",
            PrimitiveKind::UnboundedQueue => "unbounded-queue",
            PrimitiveKind::Diode => "diode",
            PrimitiveKind::All => "all",
        }
    }

    /// Expand the "All" variant to every concrete primitive
    ///
    /// Duplicates are removed while keeping first-seen order, so
    /// `-p spin-ring spin-ring` runs one trial.
    pub fn expand_all(primitives: Vec<PrimitiveKind>) -> Vec<PrimitiveKind> {
        let primitives = if primitives.contains(&PrimitiveKind::All) {
            vec![
                PrimitiveKind::CrossbeamChannel,
                PrimitiveKind::StdChannel,
                PrimitiveKind::TokioMpsc,
                PrimitiveKind::SpinRing,
                PrimitiveKind::UnboundedQueue,
                PrimitiveKind::Diode,
            ]
        } else {
            primitives
        };

        let mut unique = Vec::with_capacity(primitives.len());
        for primitive in primitives {
            if !unique.contains(&primitive) {
                unique.push(primitive);
            }
        }
        unique
    }
}

/// Timestamp source selection
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClockKind {
    /// Operating system monotonic clock
    #[clap(name = "wall")]
    Wall,

    /// Calibrated CPU cycle counter
    #[clap(name = "cycle")]
    Cycle,
}

/// How samples are captured
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimingMode {
    /// Consumer timestamps immediately before and after each receive
    #[clap(name = "bracket")]
    Bracket,

    /// Producer timestamps before send, consumer after receive
    #[clap(name = "send-to-receive")]
    SendToReceive,

    /// Consumer records one lap per receive
    #[clap(name = "laps")]
    Laps,
}

impl TimingMode {
    /// Capture mode for start/end trials. Lap trials ignore it.
    pub fn capture_mode(&self) -> CaptureMode {
        match self {
            TimingMode::SendToReceive => CaptureMode::SendToReceive,
            TimingMode::Bracket | TimingMode::Laps => CaptureMode::ReceiveBracket,
        }
    }
}
