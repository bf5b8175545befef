//! # Benchmark Engine Module
//!
//! Orchestrates a full benchmark run: one optional clock-only control trial,
//! then one trial per selected transfer primitive, all against the same
//! timestamp source and trial configuration.
//!
//! ## Key Components
//!
//! - **BenchmarkConfig**: validated run parameters, built from the CLI
//! - **BenchmarkRunner**: resolves the clock, dispatches each primitive tag to
//!   its adapter, writes one distribution artifact per successful trial and
//!   hands every outcome to the results manager
//!
//! ## Primitive Dispatch
//!
//! The trial runner is generic over [`TransferPrimitive`]. Primitive tags from
//! the command line are resolved to concrete adapter types in a single `match`,
//! so each trial is monomorphized and the hot loop has no dynamic dispatch.
//!
//! ## Failure Handling
//!
//! - Correctness violations and worker panics stop the run unless
//!   `continue_on_error` is set.
//! - Histogram range violations are recorded against the offending trial and
//!   never stop the run.
//! - Every failure is recorded in the results either way.

use crate::{
    cli::{Args, ClockKind, PrimitiveKind, TimingMode},
    clock::{CycleClock, TimestampSource, WallClock},
    metrics::HistogramBounds,
    report::DistributionReporter,
    results::{ResultsManager, TrialKind, TrialSummary},
    transfer::{
        CrossbeamChannel, Diode, SpinRing, StdChannel, TokioChannel, TransferPrimitive,
        UnboundedQueue,
    },
    trial::{TrialConfig, TrialError, TrialOutcome, TrialRunner},
    utils::{validate_capacity, validate_core, validate_msg_count, validate_percentiles},
};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Validated configuration for one benchmark run
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Concrete primitives to run, in order ("all" already expanded)
    pub primitives: Vec<PrimitiveKind>,
    pub msg_count: usize,
    pub capacity: usize,
    pub clock: ClockKind,
    pub timing: TimingMode,
    pub producer_core: Option<usize>,
    pub consumer_core: Option<usize>,
    /// Run the clock-only control trial before the primitives
    pub baseline: bool,
    pub bounds: HistogramBounds,
    pub percentiles: Vec<f64>,
    pub output_dir: PathBuf,
    pub continue_on_error: bool,
}

impl BenchmarkConfig {
    /// Build and validate a configuration from parsed arguments
    ///
    /// ## Errors
    /// - message count above the supported maximum
    /// - zero or oversized capacity
    /// - affinity core that does not exist on this machine
    /// - percentile outside 0-100
    /// - histogram ceiling below the floor
    pub fn from_args(args: &Args) -> Result<Self> {
        validate_msg_count(args.msg_count)?;
        validate_capacity(args.capacity)?;
        validate_percentiles(&args.percentiles)?;
        if let Some(core) = args.producer_affinity {
            validate_core(core).context("Invalid producer affinity")?;
        }
        if let Some(core) = args.consumer_affinity {
            validate_core(core).context("Invalid consumer affinity")?;
        }

        let bounds = HistogramBounds::default().with_highest(args.max_latency_ns);
        if bounds.highest_ns < 2 * bounds.lowest_ns {
            anyhow::bail!(
                "Maximum latency {}ns must be at least twice the {}ns histogram floor",
                bounds.highest_ns,
                bounds.lowest_ns
            );
        }

        if args.producer_affinity.is_some() && args.producer_affinity == args.consumer_affinity {
            warn!("Producer and consumer share a core; latencies will include context switches");
        }

        Ok(Self {
            primitives: PrimitiveKind::expand_all(args.primitives.clone()),
            msg_count: args.msg_count,
            capacity: args.capacity,
            clock: args.clock,
            timing: args.timing,
            producer_core: args.producer_affinity,
            consumer_core: args.consumer_affinity,
            baseline: !args.no_baseline,
            bounds,
            percentiles: args.percentiles.clone(),
            output_dir: args.output_dir.clone(),
            continue_on_error: args.continue_on_error,
        })
    }

    /// Per-trial settings shared by every trial of the run.
    pub fn trial_config(&self) -> TrialConfig {
        TrialConfig {
            producer_core: self.producer_core,
            consumer_core: self.consumer_core,
            bounds: self.bounds,
            capture: self.timing.capture_mode(),
        }
    }
}

/// A helper struct to provide a single source of truth for displaying the
/// run configuration.
struct BenchmarkConfigDisplay<'a> {
    config: &'a BenchmarkConfig,
    clock_name: &'static str,
}

impl<'a> std::fmt::Display for BenchmarkConfigDisplay<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = |core: Option<usize>| core.map_or("Not set".to_string(), |c| c.to_string());
        let primitives: Vec<&str> = self.config.primitives.iter().map(|p| p.name()).collect();

        writeln!(
            f,
            "-----------------------------------------------------------------"
        )?;
        writeln!(f, "Handoff latency benchmark")?;
        writeln!(f, "  Primitives:         {}", primitives.join(", "))?;
        writeln!(f, "  Items per Trial:    {}", self.config.msg_count)?;
        writeln!(f, "  Capacity:           {} items", self.config.capacity)?;
        writeln!(f, "  Clock:              {}", self.clock_name)?;
        writeln!(f, "  Timing:             {:?}", self.config.timing)?;
        writeln!(f, "  Producer Affinity:  {}", core(self.config.producer_core))?;
        writeln!(f, "  Consumer Affinity:  {}", core(self.config.consumer_core))?;
        writeln!(
            f,
            "  Histogram Range:    {}..={}ns, {} significant figures",
            self.config.bounds.lowest_ns,
            self.config.bounds.highest_ns,
            self.config.bounds.significant_figures
        )?;
        write!(
            f,
            "-----------------------------------------------------------------"
        )
    }
}

/// Runs the control trial and every configured primitive trial
pub struct BenchmarkRunner {
    config: BenchmarkConfig,
    reporter: DistributionReporter,
}

impl BenchmarkRunner {
    pub fn new(config: BenchmarkConfig) -> Self {
        let reporter = DistributionReporter::new(config.output_dir.clone());
        Self { config, reporter }
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Execute the run, adding one summary per trial to `results`
    ///
    /// ## Returns
    /// - `Ok(())` when every trial completed, or failures were tolerated
    /// - `Err` for the first fatal trial failure, or an artifact write failure
    pub fn run(&self, results: &mut ResultsManager) -> Result<()> {
        match self.config.clock {
            ClockKind::Wall => self.run_with_clock(WallClock::new(), results),
            ClockKind::Cycle => self.run_with_clock(CycleClock::calibrated(), results),
        }
    }

    fn run_with_clock<C: TimestampSource>(
        &self,
        clock: C,
        results: &mut ResultsManager,
    ) -> Result<()> {
        let runner = TrialRunner::new(clock, self.config.trial_config());
        info!(
            "\n{}",
            BenchmarkConfigDisplay {
                config: &self.config,
                clock_name: runner.clock().name(),
            }
        );

        if self.config.baseline {
            let name = runner.clock().name();
            let outcome = runner.run_clock_baseline(name, self.config.msg_count);
            self.record(TrialKind::Control, name, outcome, results)?;
        }

        for &kind in &self.config.primitives {
            info!("Running trial for primitive: {}", kind);
            let outcome = self.run_primitive(&runner, kind)?;
            self.record(TrialKind::Primitive, kind.name(), outcome, results)?;
        }
        Ok(())
    }

    /// Resolve `kind` to its adapter and run one trial through it
    ///
    /// The outer `Result` fails only for a tag with no adapter; the inner one
    /// carries the trial's own outcome.
    pub fn run_primitive<C: TimestampSource>(
        &self,
        runner: &TrialRunner<C>,
        kind: PrimitiveKind,
    ) -> Result<Result<TrialOutcome, TrialError>> {
        let capacity = self.config.capacity;
        let name = kind.name();
        Ok(match kind {
            PrimitiveKind::CrossbeamChannel => {
                self.dispatch(runner, name, CrossbeamChannel::new(capacity))
            }
            PrimitiveKind::StdChannel => self.dispatch(runner, name, StdChannel::new(capacity)),
            PrimitiveKind::TokioMpsc => self.dispatch(runner, name, TokioChannel::new(capacity)),
            PrimitiveKind::SpinRing => self.dispatch(runner, name, SpinRing::new(capacity)),
            PrimitiveKind::UnboundedQueue => self.dispatch(runner, name, UnboundedQueue::new()),
            // Sized to the whole trial so a healthy run never overwrites.
            PrimitiveKind::Diode => self.dispatch(
                runner,
                name,
                Diode::new(self.config.msg_count.max(capacity)),
            ),
            PrimitiveKind::All => anyhow::bail!("'all' must be expanded before dispatch"),
        })
    }

    fn dispatch<C, P>(
        &self,
        runner: &TrialRunner<C>,
        name: &str,
        primitive: P,
    ) -> Result<TrialOutcome, TrialError>
    where
        C: TimestampSource,
        P: TransferPrimitive,
    {
        match self.config.timing {
            TimingMode::Laps => runner.run_lap_trial(name, primitive, self.config.msg_count),
            TimingMode::Bracket | TimingMode::SendToReceive => {
                runner.run_trial(name, primitive, self.config.msg_count)
            }
        }
    }

    /// Write the artifact of a successful trial and record its summary
    fn record(
        &self,
        kind: TrialKind,
        name: &str,
        outcome: Result<TrialOutcome, TrialError>,
        results: &mut ResultsManager,
    ) -> Result<()> {
        match outcome {
            Ok(outcome) => {
                let artifact = self.reporter.write(&outcome.distribution, name)?;
                results.add_summary(TrialSummary::from_outcome(
                    kind,
                    &outcome,
                    &self.config.percentiles,
                    Some(artifact),
                ));
                Ok(())
            }
            Err(e) => {
                error!("Trial '{}' failed: {}", name, e);
                results.add_summary(TrialSummary::failed(
                    kind,
                    name,
                    name,
                    self.config.msg_count,
                    &e,
                ));
                if matches!(e, TrialError::Recording(_)) || self.config.continue_on_error {
                    Ok(())
                } else {
                    Err(anyhow::Error::new(e).context(format!("Trial '{}' failed", name)))
                }
            }
        }
    }
}
