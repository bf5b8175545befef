use crate::benchmark::BenchmarkConfig;
use crate::cli::{ClockKind, PrimitiveKind, TimingMode};
use crate::metrics::LatencyMetrics;
use crate::trial::TrialOutcome;
use crate::utils::{format_duration, format_duration_ns, print_table_row, print_table_separator};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Whether a trial measured a primitive or only the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialKind {
    /// Clock-only control trial: the floor primitive trials are read against
    Control,
    Primitive,
}

impl std::fmt::Display for TrialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrialKind::Control => write!(f, "control"),
            TrialKind::Primitive => write!(f, "primitive"),
        }
    }
}

/// Result record for one trial, successful or not
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialSummary {
    pub name: String,
    /// Primitive measured, or the clock for the control trial
    pub primitive: String,
    pub kind: TrialKind,
    pub item_count: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    /// Wall time of the concurrent transfer phase
    pub elapsed: Option<Duration>,
    pub latency: Option<LatencyMetrics>,
    /// Path of the `<name>.histogram` artifact
    pub artifact: Option<PathBuf>,
    pub error: Option<String>,
}

impl TrialSummary {
    /// Summary of a completed trial
    pub fn from_outcome(
        kind: TrialKind,
        outcome: &TrialOutcome,
        percentiles: &[f64],
        artifact: Option<PathBuf>,
    ) -> Self {
        let trial = &outcome.trial;
        Self {
            name: trial.name.clone(),
            primitive: trial.primitive.clone(),
            kind,
            item_count: trial.item_count,
            started_at: Some(trial.started_at),
            stopped_at: Some(trial.stopped_at),
            elapsed: Some(trial.elapsed),
            latency: Some(outcome.distribution.summarize(percentiles)),
            artifact,
            error: None,
        }
    }

    /// Summary of a trial that produced no distribution
    pub fn failed(
        kind: TrialKind,
        name: &str,
        primitive: &str,
        item_count: usize,
        error: &dyn std::fmt::Display,
    ) -> Self {
        Self {
            name: name.to_string(),
            primitive: primitive.to_string(),
            kind,
            item_count,
            started_at: None,
            stopped_at: None,
            elapsed: None,
            latency: None,
            artifact: None,
            error: Some(error.to_string()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Test configuration used for the run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConfiguration {
    pub primitives: Vec<PrimitiveKind>,
    pub msg_count: usize,
    pub capacity: usize,
    pub clock: ClockKind,
    pub timing: TimingMode,
    pub producer_core: Option<usize>,
    pub consumer_core: Option<usize>,
    pub histogram_lowest_ns: u64,
    pub histogram_highest_ns: u64,
    pub histogram_significant_figures: u8,
    pub percentiles: Vec<f64>,
}

impl From<&BenchmarkConfig> for TestConfiguration {
    fn from(config: &BenchmarkConfig) -> Self {
        Self {
            primitives: config.primitives.clone(),
            msg_count: config.msg_count,
            capacity: config.capacity,
            clock: config.clock,
            timing: config.timing,
            producer_core: config.producer_core,
            consumer_core: config.consumer_core,
            histogram_lowest_ns: config.bounds.lowest_ns,
            histogram_highest_ns: config.bounds.highest_ns,
            histogram_significant_figures: config.bounds.significant_figures,
            percentiles: config.percentiles.clone(),
        }
    }
}

/// System information for reproducibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub architecture: String,
    pub cpu_cores: usize,
    pub benchmark_version: String,
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            cpu_cores: crate::utils::get_cpu_cores(),
            benchmark_version: crate::VERSION.to_string(),
        }
    }
}

/// Collects trial summaries and writes the run's JSON document
pub struct ResultsManager {
    output_file: PathBuf,
    run_id: String,
    test_config: TestConfiguration,
    trials: Vec<TrialSummary>,
}

impl ResultsManager {
    /// Create a new results manager
    pub fn new(output_file: &Path, config: &BenchmarkConfig, run_id: String) -> Result<Self> {
        Ok(Self {
            output_file: output_file.to_path_buf(),
            run_id,
            test_config: TestConfiguration::from(config),
            trials: Vec::new(),
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Add one trial summary
    pub fn add_summary(&mut self, summary: TrialSummary) {
        debug!("Adding {} summary for '{}'", summary.kind, summary.name);
        self.trials.push(summary);
    }

    pub fn summaries(&self) -> &[TrialSummary] {
        &self.trials
    }

    /// Print control and primitive distributions side by side
    ///
    /// Control rows come first. No value is adjusted by the control trial;
    /// the reader compares them directly.
    pub fn print_comparison(&self) {
        if self.trials.is_empty() {
            return;
        }

        let header = self.comparison_header();
        let rows = self.comparison_rows();
        let widths: Vec<usize> = (0..header.len())
            .map(|column| {
                rows.iter()
                    .map(|row| row[column].len())
                    .chain(std::iter::once(header[column].len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        println!();
        print_table_separator(&widths);
        print_table_row(&header.iter().map(String::as_str).collect::<Vec<_>>(), &widths);
        print_table_separator(&widths);
        for row in &rows {
            print_table_row(&row.iter().map(String::as_str).collect::<Vec<_>>(), &widths);
        }
        print_table_separator(&widths);

        for failed in self.trials.iter().filter(|t| !t.succeeded()) {
            println!(
                "{} failed: {}",
                failed.name,
                failed.error.as_deref().unwrap_or_default()
            );
        }
    }

    fn comparison_header(&self) -> Vec<String> {
        let mut header = vec![
            "Trial".to_string(),
            "Kind".to_string(),
            "Samples".to_string(),
            "Min".to_string(),
        ];
        header.extend(
            self.test_config
                .percentiles
                .iter()
                .map(|p| format!("p{}", p)),
        );
        header.extend(["Max", "Mean"].map(String::from));
        header
    }

    fn comparison_rows(&self) -> Vec<Vec<String>> {
        let control = self.trials.iter().filter(|t| t.kind == TrialKind::Control);
        let primitives = self.trials.iter().filter(|t| t.kind == TrialKind::Primitive);
        let columns = self.comparison_header().len();

        control
            .chain(primitives)
            .map(|trial| {
                let mut row = vec![trial.name.clone(), trial.kind.to_string()];
                match &trial.latency {
                    Some(latency) => {
                        row.push(latency.total_samples.to_string());
                        row.push(format_duration_ns(latency.min_ns));
                        row.extend(latency.percentiles.iter().map(|p| format_duration_ns(p.value_ns)));
                        row.push(format_duration_ns(latency.max_ns));
                        row.push(format_duration(Duration::from_secs_f64(
                            latency.mean_ns / 1_000_000_000.0,
                        )));
                    }
                    None => row.push("FAILED".to_string()),
                }
                row.resize(columns, "-".to_string());
                row
            })
            .collect()
    }

    /// Finalize results and write to output file
    pub fn finalize(&self) -> Result<()> {
        info!("Finalizing benchmark results");

        let final_results = FinalBenchmarkResults {
            metadata: BenchmarkMetadata {
                run_id: self.run_id.clone(),
                version: crate::VERSION.to_string(),
                timestamp: Utc::now(),
                total_trials: self.trials.len(),
                failed_trials: self.trials.iter().filter(|t| !t.succeeded()).count(),
                test_config: self.test_config.clone(),
                system_info: SystemInfo::default(),
            },
            trials: self.trials.clone(),
            summary: self.calculate_overall_summary(),
        };

        let json = serde_json::to_string_pretty(&final_results)?;
        std::fs::write(&self.output_file, json)
            .with_context(|| format!("Failed to write {}", self.output_file.display()))?;

        info!("Results written to: {:?}", self.output_file);
        Ok(())
    }

    fn calculate_overall_summary(&self) -> OverallSummary {
        let control_median_ns = self
            .trials
            .iter()
            .filter(|t| t.kind == TrialKind::Control)
            .find_map(|t| t.latency.as_ref())
            .map(|latency| latency.median_ns);

        OverallSummary {
            control_median_ns,
            lowest_median_primitive: self.lowest_primitive_by(|latency| latency.median_ns),
            lowest_max_primitive: self.lowest_primitive_by(|latency| latency.max_ns),
        }
    }

    /// Name of the successful primitive trial minimizing `key`
    fn lowest_primitive_by(&self, key: impl Fn(&LatencyMetrics) -> u64) -> Option<String> {
        self.trials
            .iter()
            .filter(|t| t.kind == TrialKind::Primitive)
            .filter_map(|t| t.latency.as_ref().map(|latency| (t, key(latency))))
            .min_by_key(|(_, value)| *value)
            .map(|(t, _)| t.name.clone())
    }
}

/// Final benchmark results structure
#[derive(Debug, Serialize, Deserialize)]
pub struct FinalBenchmarkResults {
    pub metadata: BenchmarkMetadata,
    pub trials: Vec<TrialSummary>,
    pub summary: OverallSummary,
}

/// Benchmark metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct BenchmarkMetadata {
    pub run_id: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub total_trials: usize,
    pub failed_trials: usize,
    pub test_config: TestConfiguration,
    pub system_info: SystemInfo,
}

/// Overall summary across all trials
#[derive(Debug, Serialize, Deserialize)]
pub struct OverallSummary {
    /// Median of the clock-only control trial, if one ran
    pub control_median_ns: Option<u64>,
    pub lowest_median_primitive: Option<String>,
    pub lowest_max_primitive: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use crate::metrics::{aggregate_laps, HistogramBounds};
    use crate::trial::Trial;
    use crate::trial::TrialError;
    use clap::Parser;
    use tempfile::NamedTempFile;

    fn config() -> BenchmarkConfig {
        let args = Args::parse_from(["handoff-bench", "--percentiles", "50,99"]);
        BenchmarkConfig::from_args(&args).unwrap()
    }

    fn outcome(name: &str, laps: &[u64]) -> TrialOutcome {
        let now = Utc::now();
        TrialOutcome {
            trial: Trial {
                name: name.to_string(),
                primitive: name.to_string(),
                item_count: laps.len(),
                started_at: now,
                stopped_at: now,
                elapsed: Duration::from_micros(10),
            },
            distribution: aggregate_laps(laps, HistogramBounds::default()).unwrap(),
        }
    }

    fn populated_manager(output: &Path) -> ResultsManager {
        let mut manager = ResultsManager::new(output, &config(), "run-1".to_string()).unwrap();
        let percentiles = [50.0, 99.0];
        manager.add_summary(TrialSummary::from_outcome(
            TrialKind::Primitive,
            &outcome("spin-ring", &[80, 90, 100]),
            &percentiles,
            Some(PathBuf::from("spin-ring.histogram")),
        ));
        manager.add_summary(TrialSummary::from_outcome(
            TrialKind::Control,
            &outcome("wall-clock", &[20, 20, 30]),
            &percentiles,
            None,
        ));
        manager.add_summary(TrialSummary::failed(
            TrialKind::Primitive,
            "diode",
            "diode",
            3,
            &TrialError::Lost {
                expected: 3,
                received: 1,
            },
        ));
        manager
    }

    #[test]
    fn test_results_manager_creation() {
        let temp_file = NamedTempFile::new().unwrap();
        let manager = ResultsManager::new(temp_file.path(), &config(), "abc".to_string()).unwrap();

        assert_eq!(manager.output_file, temp_file.path());
        assert_eq!(manager.run_id(), "abc");
        assert!(manager.summaries().is_empty());
    }

    #[test]
    fn test_comparison_lists_control_first() {
        let temp_file = NamedTempFile::new().unwrap();
        let manager = populated_manager(temp_file.path());

        let header = manager.comparison_header();
        assert_eq!(
            header,
            vec!["Trial", "Kind", "Samples", "Min", "p50", "p99", "Max", "Mean"]
        );

        let rows = manager.comparison_rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], "wall-clock");
        assert_eq!(rows[0][1], "control");
        assert_eq!(rows[1][0], "spin-ring");
        assert_eq!(rows[1][3], "80ns");
        assert_eq!(rows[1][6], "100ns");
        assert_eq!(rows[2][2], "FAILED");
        assert!(rows
            .iter()
            .flatten()
            .all(|cell| !cell.contains("/s")));
        assert!(rows.iter().all(|row| row.len() == header.len()));
    }

    #[test]
    fn test_finalize_writes_json_document() {
        let temp_file = NamedTempFile::new().unwrap();
        let manager = populated_manager(temp_file.path());
        manager.finalize().unwrap();

        let text = std::fs::read_to_string(temp_file.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(json["metadata"]["run_id"], "run-1");
        assert_eq!(json["metadata"]["version"], crate::VERSION);
        assert_eq!(json["metadata"]["total_trials"], 3);
        assert_eq!(json["metadata"]["failed_trials"], 1);
        assert_eq!(json["trials"][0]["kind"], "primitive");
        assert_eq!(json["trials"][1]["kind"], "control");
        assert_eq!(json["trials"][0]["primitive"], "spin-ring");
        assert_eq!(json["trials"][2]["primitive"], "diode");
        assert_eq!(json["trials"][0]["latency"]["min_ns"], 80);
        assert!(json["trials"][2]["error"]
            .as_str()
            .unwrap()
            .contains("drained after 1 of 3"));
        assert_eq!(json["summary"]["control_median_ns"], 20);
        assert_eq!(json["summary"]["lowest_median_primitive"], "spin-ring");
    }

    #[test]
    fn test_system_info_default() {
        let info = SystemInfo::default();

        assert!(!info.os.is_empty());
        assert!(!info.architecture.is_empty());
        assert!(info.cpu_cores > 0);
    }
}
