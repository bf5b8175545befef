//! # Distribution Reporter
//!
//! Writes one `<name>.histogram` artifact per trial in the HdrHistogram
//! percentile-distribution text layout, the input format of the HdrHistogram
//! plotter and most percentile-comparison tooling:
//!
//! ```text
//!        Value     Percentile TotalCount 1/(1-Percentile)
//!
//!       80.000 0.000000000000          3           1.00
//!       81.000 0.100000000000      10412           1.11
//!          ...
//! #[Mean    =       84.210, StdDeviation   =        3.902]
//! #[Max     =      412.000, Total count    =       100000]
//! ```
//!
//! Values are nanoseconds (value scaling ratio 1.0). Rows step through the
//! distribution with five ticks per half distance to 100%. The file is
//! created or truncated on every write, so rerunning a trial with the same
//! name replaces its artifact.

use crate::metrics::LatencyDistribution;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Percentile ticks per half distance to 100%.
const TICKS_PER_HALF_DISTANCE: u32 = 5;

/// Unit scale applied to every value before printing.
const VALUE_SCALING_RATIO: f64 = 1.0;

/// Writes percentile-distribution artifacts into a directory.
#[derive(Debug, Clone)]
pub struct DistributionReporter {
    output_dir: PathBuf,
}

impl DistributionReporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path the artifact for `name` is written to.
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{}.histogram", name))
    }

    /// Serialize `distribution` to `<output_dir>/<name>.histogram`
    ///
    /// ## Returns
    /// The path of the written artifact.
    ///
    /// ## Errors
    /// - `name` is empty or contains a path separator
    /// - the directory cannot be created or the file cannot be written
    pub fn write(&self, distribution: &LatencyDistribution, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) {
            anyhow::bail!("Invalid artifact name {:?}", name);
        }

        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "Failed to create output directory {}",
                self.output_dir.display()
            )
        })?;

        let path = self.artifact_path(name);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        write_percentile_distribution(distribution, &mut writer)
            .and_then(|_| writer.flush())
            .with_context(|| format!("Failed to write {}", path.display()))?;

        debug!(
            "Wrote {} samples for '{}' to {}",
            distribution.len(),
            name,
            path.display()
        );
        Ok(path)
    }
}

/// Render `distribution` in the percentile-distribution text layout.
pub fn write_percentile_distribution<W: Write>(
    distribution: &LatencyDistribution,
    out: &mut W,
) -> std::io::Result<()> {
    let histogram = distribution.histogram();

    writeln!(
        out,
        "{:>12} {:>14} {:>10} {:>14}",
        "Value", "Percentile", "TotalCount", "1/(1-Percentile)"
    )?;
    writeln!(out)?;

    let mut total_count = 0u64;
    let steps = (!histogram.is_empty())
        .then(|| histogram.iter_quantiles(TICKS_PER_HALF_DISTANCE))
        .into_iter()
        .flatten();
    for step in steps {
        total_count += step.count_since_last_iteration();
        let value = step.value_iterated_to() as f64 / VALUE_SCALING_RATIO;
        let quantile = step.quantile_iterated_to();
        if quantile < 1.0 {
            writeln!(
                out,
                "{:12.3} {:2.12} {:10} {:14.2}",
                value,
                quantile,
                total_count,
                1.0 / (1.0 - quantile)
            )?;
        } else {
            writeln!(out, "{:12.3} {:2.12} {:10}", value, quantile, total_count)?;
        }
    }

    writeln!(
        out,
        "#[Mean    = {:12.3}, StdDeviation   = {:12.3}]",
        histogram.mean() / VALUE_SCALING_RATIO,
        histogram.stdev() / VALUE_SCALING_RATIO
    )?;
    writeln!(
        out,
        "#[Max     = {:12.3}, Total count    = {:12}]",
        histogram.max() as f64 / VALUE_SCALING_RATIO,
        histogram.len()
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{aggregate_laps, HistogramBounds};
    use tempfile::TempDir;

    fn sample_distribution() -> LatencyDistribution {
        aggregate_laps(&[10, 10, 20, 30, 1000], HistogramBounds::default()).unwrap()
    }

    #[test]
    fn test_layout_has_header_rows_and_footer() {
        let mut out = Vec::new();
        write_percentile_distribution(&sample_distribution(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].contains("Value"));
        assert!(lines[0].contains("1/(1-Percentile)"));
        assert_eq!(lines[1], "");
        assert!(lines.iter().any(|l| l.starts_with("#[Mean")));
        assert!(lines.iter().any(|l| l.starts_with("#[Max")));

        let max_line = lines.iter().find(|l| l.starts_with("#[Max")).unwrap();
        assert!(max_line.contains("1000.000"));
        assert!(max_line.trim_end().ends_with("5]"));

        // The last data row has every sample counted.
        let last_row = lines
            .iter()
            .filter(|l| !l.starts_with('#') && !l.is_empty())
            .last()
            .unwrap();
        let columns: Vec<&str> = last_row.split_whitespace().collect();
        assert_eq!(columns[0], "1000.000");
        assert_eq!(columns[2], "5");
    }

    #[test]
    fn test_empty_distribution_is_writable() {
        let distribution = LatencyDistribution::empty(HistogramBounds::default()).unwrap();
        let mut out = Vec::new();
        write_percentile_distribution(&distribution, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Total count    =            0"));
    }

    #[test]
    fn test_write_creates_named_artifact() {
        let dir = TempDir::new().unwrap();
        let reporter = DistributionReporter::new(dir.path().join("nested"));

        let path = reporter.write(&sample_distribution(), "spin-ring").unwrap();
        assert_eq!(path, dir.path().join("nested").join("spin-ring.histogram"));
        assert!(path.exists());
    }

    #[test]
    fn test_rewrite_overwrites_instead_of_appending() {
        let dir = TempDir::new().unwrap();
        let reporter = DistributionReporter::new(dir.path());
        let distribution = sample_distribution();

        let path = reporter.write(&distribution, "diode").unwrap();
        let first = fs::read_to_string(&path).unwrap();
        reporter.write(&distribution, "diode").unwrap();
        let second = fs::read_to_string(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_write_does_not_mutate_distribution() {
        let dir = TempDir::new().unwrap();
        let reporter = DistributionReporter::new(dir.path());
        let distribution = sample_distribution();
        let before = distribution.summarize(&[50.0, 100.0]);

        reporter.write(&distribution, "channel").unwrap();
        assert_eq!(distribution.summarize(&[50.0, 100.0]), before);
    }

    #[test]
    fn test_rejects_path_like_names() {
        let dir = TempDir::new().unwrap();
        let reporter = DistributionReporter::new(dir.path());
        assert!(reporter.write(&sample_distribution(), "../escape").is_err());
        assert!(reporter.write(&sample_distribution(), "").is_err());
    }
}
