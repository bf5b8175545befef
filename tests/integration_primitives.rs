use anyhow::Result;
use handoff_bench::{
    clock::{CycleClock, WallClock},
    metrics::HistogramBounds,
    transfer::{CrossbeamChannel, Diode, SpinRing, StdChannel, TokioChannel, UnboundedQueue},
    trial::{TrialConfig, TrialRunner},
    TimestampSource,
};

/// Unpinned threads on a shared test machine can be descheduled for
/// milliseconds, so these runs use a generous ceiling.
fn runner<C: TimestampSource>(clock: C) -> TrialRunner<C> {
    TrialRunner::new(
        clock,
        TrialConfig {
            bounds: HistogramBounds::default().with_highest(60_000_000_000),
            ..TrialConfig::default()
        },
    )
}

const ITEMS: usize = 20_000;

#[test]
fn every_primitive_delivers_in_order_on_wall_clock() -> Result<()> {
    let runner = runner(WallClock::new());

    let outcomes = vec![
        runner.run_trial("crossbeam-channel", CrossbeamChannel::new(1024), ITEMS)?,
        runner.run_trial("std-channel", StdChannel::new(1024), ITEMS)?,
        runner.run_trial("tokio-mpsc", TokioChannel::new(1024), ITEMS)?,
        runner.run_trial("spin-ring", SpinRing::new(1024), ITEMS)?,
        runner.run_trial("unbounded-queue", UnboundedQueue::new(), ITEMS)?,
        runner.run_trial("diode", Diode::new(ITEMS), ITEMS)?,
    ];

    for outcome in outcomes {
        assert_eq!(outcome.distribution.len(), ITEMS as u64, "{}", outcome.trial.name);
        assert!(outcome.trial.stopped_at >= outcome.trial.started_at);
    }
    Ok(())
}

#[test]
fn cycle_clock_drives_lap_and_baseline_trials() -> Result<()> {
    let runner = runner(CycleClock::calibrated());

    let laps = runner.run_lap_trial("spin-ring", SpinRing::new(256), ITEMS)?;
    assert_eq!(laps.distribution.len(), ITEMS as u64);

    let baseline = runner.run_clock_baseline("cycle-clock", ITEMS)?;
    assert_eq!(baseline.distribution.len(), ITEMS as u64);
    Ok(())
}

#[test]
fn undersized_diode_fails_instead_of_dropping_samples() {
    let runner = runner(WallClock::new());
    // A one-slot diode under a producer that never blocks overwrites almost
    // immediately; the trial must fail rather than report a short histogram.
    let result = runner.run_trial("diode", Diode::new(1), 1_000_000);
    assert!(result.is_err());
}
