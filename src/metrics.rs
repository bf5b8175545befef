//! # Latency Distribution Aggregation
//!
//! Folds per-item samples into an HDR histogram with a fixed value range and
//! precision, and summarizes the result as percentiles.
//!
//! The histogram range is a hard cap. A latency above the configured maximum
//! means the trial stalled or the timer misbehaved; it is reported as a
//! [`RecordingError`] and never clamped, since clamping would silently bend
//! the upper percentiles. A sample whose end precedes its start violates
//! causality and is reported the same way.

use hdrhistogram::{CreationError, Histogram};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Value range and precision of a latency histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramBounds {
    /// Lowest discernible latency in nanoseconds.
    pub lowest_ns: u64,
    /// Highest recordable latency in nanoseconds.
    pub highest_ns: u64,
    /// Significant decimal digits kept for every recorded value (1..=5).
    pub significant_figures: u8,
}

impl Default for HistogramBounds {
    fn default() -> Self {
        Self {
            lowest_ns: crate::defaults::HISTOGRAM_LOWEST_NS,
            highest_ns: crate::defaults::HISTOGRAM_HIGHEST_NS,
            significant_figures: crate::defaults::HISTOGRAM_SIGNIFICANT_FIGURES,
        }
    }
}

impl HistogramBounds {
    /// Same precision and floor, different ceiling.
    pub fn with_highest(self, highest_ns: u64) -> Self {
        Self { highest_ns, ..self }
    }

    fn empty_histogram(&self) -> Result<Histogram<u64>, CreationError> {
        Histogram::new_with_bounds(self.lowest_ns, self.highest_ns, self.significant_figures)
    }
}

/// A latency sample that could not be recorded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordingError {
    #[error(
        "{violations} latency sample(s) above the {highest_ns}ns histogram ceiling \
         (first at index {first_index}: {first_latency_ns}ns)"
    )]
    OutOfRange {
        violations: usize,
        first_index: usize,
        first_latency_ns: u64,
        highest_ns: u64,
    },

    #[error("sample {index} ends before it starts (start {start_ns}ns, end {end_ns}ns)")]
    Causality {
        index: usize,
        start_ns: u64,
        end_ns: u64,
    },

    #[error("histogram rejected sample {index} ({latency_ns}ns)")]
    Rejected { index: usize, latency_ns: u64 },

    #[error("{starts} start timestamps but {ends} end timestamps")]
    LengthMismatch { starts: usize, ends: usize },

    #[error("invalid histogram bounds: {0}")]
    Bounds(String),
}

/// Latency histogram for one trial.
#[derive(Debug, Clone)]
pub struct LatencyDistribution {
    histogram: Histogram<u64>,
    bounds: HistogramBounds,
}

impl LatencyDistribution {
    /// An empty distribution with the given bounds.
    pub fn empty(bounds: HistogramBounds) -> Result<Self, RecordingError> {
        let histogram = bounds
            .empty_histogram()
            .map_err(|e| RecordingError::Bounds(format!("{:?}", e)))?;
        Ok(Self { histogram, bounds })
    }

    /// Number of recorded samples.
    pub fn len(&self) -> u64 {
        self.histogram.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.is_empty()
    }

    pub fn bounds(&self) -> HistogramBounds {
        self.bounds
    }

    /// Latency at percentile `p` (0.0..=100.0), in nanoseconds.
    pub fn value_at_percentile(&self, p: f64) -> u64 {
        self.histogram.value_at_percentile(p)
    }

    /// Width of the bucket `value_ns` falls into.
    pub fn bucket_width(&self, value_ns: u64) -> u64 {
        self.histogram.equivalent_range(value_ns)
    }

    /// Read-only access to the underlying histogram.
    pub fn histogram(&self) -> &Histogram<u64> {
        &self.histogram
    }

    /// Record a set of latencies, failing if any lies above the ceiling.
    ///
    /// All samples are checked before any is recorded, so a failed call leaves
    /// the distribution unchanged.
    pub fn record_all<I>(&mut self, latencies: I) -> Result<(), RecordingError>
    where
        I: IntoIterator<Item = u64>,
        I::IntoIter: Clone,
    {
        let latencies = latencies.into_iter();
        let highest_ns = self.bounds.highest_ns;

        let mut out_of_range = latencies
            .clone()
            .enumerate()
            .filter(|&(_, latency)| latency > highest_ns);
        if let Some((first_index, first_latency_ns)) = out_of_range.next() {
            return Err(RecordingError::OutOfRange {
                violations: 1 + out_of_range.count(),
                first_index,
                first_latency_ns,
                highest_ns,
            });
        }

        for (index, latency) in latencies.enumerate() {
            // Values below the lowest discernible value land in bucket zero.
            self.histogram
                .record(latency)
                .map_err(|_| RecordingError::Rejected {
                    index,
                    latency_ns: latency,
                })?;
        }
        Ok(())
    }

    /// Summarize the distribution at the requested percentiles.
    pub fn summarize(&self, percentiles: &[f64]) -> LatencyMetrics {
        if self.histogram.is_empty() {
            return LatencyMetrics {
                total_samples: 0,
                percentiles: percentiles
                    .iter()
                    .map(|&percentile| PercentileValue {
                        percentile,
                        value_ns: 0,
                    })
                    .collect(),
                ..LatencyMetrics::default()
            };
        }

        LatencyMetrics {
            min_ns: self.histogram.min(),
            max_ns: self.histogram.max(),
            mean_ns: self.histogram.mean(),
            median_ns: self.histogram.value_at_percentile(50.0),
            std_dev_ns: self.histogram.stdev(),
            percentiles: percentiles
                .iter()
                .map(|&percentile| PercentileValue {
                    percentile,
                    value_ns: self.histogram.value_at_percentile(percentile),
                })
                .collect(),
            total_samples: self.histogram.len(),
        }
    }
}

/// Percentile summary of one distribution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyMetrics {
    pub min_ns: u64,
    pub max_ns: u64,
    pub mean_ns: f64,
    pub median_ns: u64,
    pub std_dev_ns: f64,
    pub percentiles: Vec<PercentileValue>,
    pub total_samples: u64,
}

impl LatencyMetrics {
    /// Value recorded for `percentile`, if it was requested.
    pub fn percentile(&self, percentile: f64) -> Option<u64> {
        self.percentiles
            .iter()
            .find(|p| (p.percentile - percentile).abs() < f64::EPSILON)
            .map(|p| p.value_ns)
    }
}

/// Percentile value pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileValue {
    pub percentile: f64,
    pub value_ns: u64,
}

/// Build a distribution from parallel start/end timestamp sequences.
///
/// ## Errors
/// - `LengthMismatch` if the sequences differ in length
/// - `Causality` for the first index whose end precedes its start
/// - `OutOfRange` if any latency exceeds `bounds.highest_ns`
pub fn aggregate(
    starts: &[u64],
    ends: &[u64],
    bounds: HistogramBounds,
) -> Result<LatencyDistribution, RecordingError> {
    if starts.len() != ends.len() {
        return Err(RecordingError::LengthMismatch {
            starts: starts.len(),
            ends: ends.len(),
        });
    }

    if let Some(index) = starts.iter().zip(ends).position(|(start, end)| end < start) {
        return Err(RecordingError::Causality {
            index,
            start_ns: starts[index],
            end_ns: ends[index],
        });
    }

    let mut distribution = LatencyDistribution::empty(bounds)?;
    distribution.record_all(starts.iter().zip(ends).map(|(start, end)| end - start))?;
    Ok(distribution)
}

/// Build a distribution from lap durations recorded by a lap timer.
pub fn aggregate_laps(
    laps: &[u64],
    bounds: HistogramBounds,
) -> Result<LatencyDistribution, RecordingError> {
    let mut distribution = LatencyDistribution::empty(bounds)?;
    distribution.record_all(laps.iter().copied())?;
    Ok(distribution)
}
