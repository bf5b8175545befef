//! # Utility Functions and Helper Module
//!
//! Helpers shared by the harness: human-readable formatting, input validation,
//! CPU placement and table output for the console summary.
//!
//! ## Key Functionality Categories
//!
//! - **Formatting**: durations for display
//! - **Validation**: item counts, capacities, cores and percentiles, with clear
//!   error messages
//! - **CPU Placement**: core enumeration and thread pinning via `core_affinity`
//! - **Display Helpers**: plain-text table rows and separators
//!
//! ## Usage Examples
//!
//! ```rust
//! use handoff_bench::utils::*;
//! use std::time::Duration;
//!
//! let duration_str = format_duration(Duration::from_micros(1500));
//! assert_eq!(duration_str, "1.50ms");
//!
//! # fn main() -> anyhow::Result<()> {
//! validate_capacity(8192)?;
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use std::fmt::Display;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Generate a unique identifier for a benchmark run
///
/// ## Returns
/// String representation of a UUID v4 (e.g., "550e8400-e29b-41d4-a716-446655440000")
///
/// The identifier ties the JSON results file to the log output of the run
/// that produced it.
pub fn generate_test_id() -> String {
    Uuid::new_v4().to_string()
}

/// Convert nanoseconds to a human-readable duration string
///
/// Convenience wrapper around [`format_duration`] for raw latency values.
///
/// ## Examples
///
/// ```rust
/// # use handoff_bench::utils::format_duration_ns;
/// assert_eq!(format_duration_ns(500), "500ns");
/// assert_eq!(format_duration_ns(1500), "1.50μs");
/// assert_eq!(format_duration_ns(1500000), "1.50ms");
/// ```
pub fn format_duration_ns(ns: u64) -> String {
    format_duration(Duration::from_nanos(ns))
}

/// Format a duration in a human-readable way
///
/// ## Unit Selection Logic
///
/// - **Nanoseconds**: < 1,000 ns (e.g., "500ns")
/// - **Microseconds**: < 1,000,000 ns (e.g., "1.50μs")
/// - **Milliseconds**: < 1,000,000,000 ns (e.g., "25.75ms")
/// - **Seconds**: < 60 seconds (e.g., "5.25s")
/// - **Minutes and Hours**: for longer durations (e.g., "5m 30s")
///
/// ```rust
/// # use handoff_bench::utils::format_duration;
/// # use std::time::Duration;
/// assert_eq!(format_duration(Duration::from_nanos(750)), "750ns");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ns = duration.as_nanos();

    if total_ns < 1_000 {
        format!("{}ns", total_ns)
    } else if total_ns < 1_000_000 {
        format!("{:.2}μs", total_ns as f64 / 1_000.0)
    } else if total_ns < 1_000_000_000 {
        format!("{:.2}ms", total_ns as f64 / 1_000_000.0)
    } else if total_ns < 60_000_000_000 {
        format!("{:.2}s", total_ns as f64 / 1_000_000_000.0)
    } else {
        let seconds = duration.as_secs();
        let minutes = seconds / 60;
        let remaining_seconds = seconds % 60;

        if minutes < 60 {
            format!("{}m {}s", minutes, remaining_seconds)
        } else {
            let hours = minutes / 60;
            let remaining_minutes = minutes % 60;
            format!("{}h {}m {}s", hours, remaining_minutes, remaining_seconds)
        }
    }
}

/// Validate the number of items transferred per trial
///
/// ## Validation Rules
///
/// - **Minimum**: 0 (an empty trial is legal and yields an empty histogram)
/// - **Maximum**: 1 billion, since both timestamp sequences are preallocated
///   (16 bytes per item)
pub fn validate_msg_count(msg_count: usize) -> Result<()> {
    if msg_count > 1_000_000_000 {
        anyhow::bail!(
            "Message count {} is too large (maximum 1,000,000,000)",
            msg_count
        );
    }
    Ok(())
}

/// Validate a primitive's buffer capacity in items.
pub fn validate_capacity(capacity: usize) -> Result<()> {
    if capacity == 0 {
        anyhow::bail!("Capacity cannot be zero");
    }
    if capacity > 1 << 30 {
        anyhow::bail!("Capacity {} is too large (maximum 2^30 items)", capacity);
    }
    Ok(())
}

/// Validate that a requested CPU core exists on this machine.
pub fn validate_core(core: usize) -> Result<()> {
    let cores = get_cpu_cores();
    if core >= cores {
        anyhow::bail!(
            "Core {} does not exist (this machine has {} cores, numbered from 0)",
            core,
            cores
        );
    }
    Ok(())
}

/// Validate that every requested percentile lies in `[0, 100]`.
pub fn validate_percentiles(percentiles: &[f64]) -> Result<()> {
    for &p in percentiles {
        if !(0.0..=100.0).contains(&p) {
            anyhow::bail!("Percentile {} is outside the range 0-100", p);
        }
    }
    Ok(())
}

/// Number of logical CPU cores available to this process
///
/// Prefers the affinity-aware core list from `core_affinity` and falls back
/// to `num_cpus` when the platform cannot enumerate cores.
pub fn get_cpu_cores() -> usize {
    core_affinity::get_core_ids()
        .map(|ids| ids.len())
        .unwrap_or_else(num_cpus::get)
}

/// Pin the calling thread to `core`
///
/// ## Parameters
/// - `core`: Index into the process's core list; `None` leaves the thread
///   wherever the scheduler puts it
/// - `role`: Label for log output (e.g. "producer")
///
/// ## Returns
/// `true` if the thread was pinned. Pinning failures are logged and
/// otherwise ignored: an unpinned trial is still a valid trial, just a
/// noisier one.
pub fn pin_current_thread(core: Option<usize>, role: impl Display) -> bool {
    let Some(core) = core else {
        return false;
    };

    let pinned = core_affinity::get_core_ids()
        .and_then(|ids| ids.get(core).copied())
        .map(core_affinity::set_for_current)
        .unwrap_or(false);

    if pinned {
        debug!("Pinned {} thread to core {}", role, core);
    } else {
        warn!("Failed to pin {} thread to core {}", role, core);
    }
    pinned
}

/// Print a formatted table row
///
/// ```rust
/// # use handoff_bench::utils::{print_table_row, print_table_separator};
/// let widths = [18, 10, 10];
/// print_table_separator(&widths);
/// print_table_row(&["Primitive", "p50", "p99"], &widths);
/// print_table_separator(&widths);
/// print_table_row(&["spin-ring", "80ns", "140ns"], &widths);
/// print_table_separator(&widths);
/// ```
pub fn print_table_row(columns: &[&str], widths: &[usize]) {
    println!("{}", format_table_row(columns, widths));
}

/// Print a table separator matching `widths`.
pub fn print_table_separator(widths: &[usize]) {
    println!("{}", format_table_separator(widths));
}

pub fn format_table_row(columns: &[&str], widths: &[usize]) -> String {
    let mut line = String::from("|");
    for (i, column) in columns.iter().enumerate() {
        let width = widths.get(i).copied().unwrap_or(10);
        line.push_str(&format!(" {:width$} |", column, width = width));
    }
    line
}

pub fn format_table_separator(widths: &[usize]) -> String {
    let mut line = String::from("+");
    for &width in widths {
        line.push_str(&"-".repeat(width + 2));
        line.push('+');
    }
    line
}
