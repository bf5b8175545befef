use anyhow::Result;
use handoff_bench::{
    clock::SimulatedClock,
    transfer::DelayedQueue,
    trial::{CaptureMode, TrialConfig, TrialRunner},
    DistributionReporter,
};

/// A fake queue with a fixed 100ns receive delay must reproduce that delay.
///
/// On simulated time the delay is exact, so p50 and p99 both land in the
/// bucket holding 100ns.
#[test]
fn fixed_delay_round_trips_through_histogram_and_artifact() -> Result<()> {
    let clock = SimulatedClock::new();
    let runner = TrialRunner::new(clock.clone(), TrialConfig::default());
    let queue = DelayedQueue::new(clock, 100, 64);

    let outcome = runner.run_trial("delayed-100ns", queue, 1_000)?;
    let distribution = &outcome.distribution;
    let width = distribution.bucket_width(100);

    assert_eq!(distribution.len(), 1_000);
    assert!(distribution.value_at_percentile(50.0).abs_diff(100) <= width);
    assert!(distribution.value_at_percentile(99.0).abs_diff(100) <= width);

    let dir = tempfile::tempdir()?;
    let path = DistributionReporter::new(dir.path()).write(distribution, &outcome.trial.name)?;
    let text = std::fs::read_to_string(&path)?;
    assert!(path.ends_with("delayed-100ns.histogram"));
    assert!(text.contains("Total count    =         1000"));
    Ok(())
}

/// A large deterministic run: every index is written exactly once by its
/// owning task, with both capture modes.
#[test]
fn large_deterministic_run_records_every_sample() -> Result<()> {
    for capture in [CaptureMode::ReceiveBracket, CaptureMode::SendToReceive] {
        let clock = SimulatedClock::new();
        let config = TrialConfig {
            capture,
            // Producer stamps can run ahead of the simulated receive time.
            bounds: handoff_bench::HistogramBounds::default().with_highest(10_000_000_000),
            ..TrialConfig::default()
        };
        let runner = TrialRunner::new(clock.clone(), config);
        let queue = DelayedQueue::new(clock, 10, 1024);

        let outcome = runner.run_trial("large", queue, 100_000)?;
        assert_eq!(outcome.distribution.len(), 100_000);
    }
    Ok(())
}
