//! Fetch log reporter behind `roadseg stats`.
//!
//! Summarizes how segment layer loads went: how many ran, how many failed,
//! how large the layers were, broken down by date range.

use std::collections::HashMap;

use crate::analytics::logger::{self, FetchLogEntry};
use crate::config::schema::LoggingConfig;
use crate::source::DateRange;

// ---------------------------------------------------------------------------
// Aggregated stats
// ---------------------------------------------------------------------------

/// Summary statistics for `roadseg stats`.
#[derive(Debug, Default)]
pub struct FetchStats {
    pub total_loads: usize,
    pub failures: usize,
    pub failure_pct: f64,
    /// Averages over successful loads only.
    pub avg_segments: f64,
    pub avg_groups: f64,
    pub avg_duration_ms: f64,
    pub last_error: Option<String>,
    pub ranges: Vec<RangeStat>,
}

/// Per-date-range breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeStat {
    pub date_range: DateRange,
    pub loads: usize,
    pub failures: usize,
    pub avg_segments: f64,
}

/// Compute stats from the configured fetch log, optionally limited to the
/// last `days` days.
pub fn compute_stats(config: &LoggingConfig, days: Option<u32>) -> FetchStats {
    let entries = logger::read_entries_since_days(config, days);
    build_stats(&entries)
}

pub fn build_stats(entries: &[FetchLogEntry]) -> FetchStats {
    if entries.is_empty() {
        return FetchStats::default();
    }

    let total_loads = entries.len();
    let failures = entries.iter().filter(|e| !e.success).count();
    let successes: Vec<&FetchLogEntry> = entries.iter().filter(|e| e.success).collect();

    FetchStats {
        total_loads,
        failures,
        failure_pct: failures as f64 / total_loads as f64 * 100.0,
        avg_segments: mean(successes.iter().map(|e| e.segment_count as f64)),
        avg_groups: mean(successes.iter().map(|e| e.group_count as f64)),
        avg_duration_ms: mean(entries.iter().map(|e| e.duration_ms as f64)),
        last_error: entries.iter().rev().find_map(|e| e.error.clone()),
        ranges: compute_range_stats(entries),
    }
}

/// Group entries by date range, in `all, today, week, month` order.
fn compute_range_stats(entries: &[FetchLogEntry]) -> Vec<RangeStat> {
    let mut groups: HashMap<DateRange, Vec<&FetchLogEntry>> = HashMap::new();
    for entry in entries {
        groups.entry(entry.date_range).or_default().push(entry);
    }

    [DateRange::All, DateRange::Today, DateRange::Week, DateRange::Month]
        .into_iter()
        .filter_map(|range| {
            let group = groups.get(&range)?;
            Some(RangeStat {
                date_range: range,
                loads: group.len(),
                failures: group.iter().filter(|e| !e.success).count(),
                avg_segments: mean(
                    group
                        .iter()
                        .filter(|e| e.success)
                        .map(|e| e.segment_count as f64),
                ),
            })
        })
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
