//! # Handoff Latency Benchmark - Main Entry Point
//!
//! Measures the producer-to-consumer handoff latency of each selected
//! transfer primitive and reports full latency distributions.
//!
//! ## Execution Flow
//!
//! 1. **Parse arguments**: command-line configuration via clap
//! 2. **Initialize logging**: tracing subscriber, optional log file
//! 3. **Create benchmark config**: validate CLI values into a `BenchmarkConfig`
//! 4. **Run trials**: the clock-only control trial, then one trial per primitive,
//!    each writing `<name>.histogram` into the output directory
//! 5. **Report**: print the side-by-side comparison and write the JSON summary
//!
//! ## Error Handling
//!
//! The run stops at the first failed trial unless `--continue-on-error` is
//! given. The comparison table and JSON summary are written either way, so a
//! failed run still leaves a record of what completed.
//!
//! Trials run on dedicated OS threads, not on an async runtime: the blocking
//! Tokio channel API used by the `tokio-mpsc` adapter must not be called from
//! inside one.

use anyhow::Result;
use clap::Parser;
use handoff_bench::{
    benchmark::{BenchmarkConfig, BenchmarkRunner},
    cli::Args,
    logging::init_logging,
    results::ResultsManager,
    utils::generate_test_id,
};
use tracing::{debug, error, info};

fn main() -> Result<()> {
    let args = Args::parse();

    // The guard flushes the log file when main returns.
    let _log_guard = init_logging(args.verbose, args.log_file.as_deref())?;

    info!("Starting handoff latency benchmark");
    debug!("Configuration: {:?}", args);

    let config = BenchmarkConfig::from_args(&args)?;

    let run_id = generate_test_id();
    info!("Run id: {}", run_id);
    let mut results_manager = ResultsManager::new(&args.output_file, &config, run_id)?;

    let runner = BenchmarkRunner::new(config);
    let outcome = runner.run(&mut results_manager);
    if let Err(ref e) = outcome {
        error!("Benchmark stopped: {:#}", e);
    }

    results_manager.print_comparison();
    results_manager.finalize()?;
    outcome?;

    info!("Handoff latency benchmark completed successfully");
    Ok(())
}
