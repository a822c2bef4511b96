//! Per-group aggregation.
use chrono::NaiveDateTime;
use serde::Serialize;

use super::density::{DensityBucket, DensityThresholds, IssueDensity};
use super::grouping::SegmentGroup;
use super::{Segment, timestamp};

/// Aggregated figures for one road section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    /// Position of the group in the layer.
    pub index: usize,
    /// Input index of the group's first segment.
    pub first_segment: usize,
    pub segment_count: usize,
    pub total_issues: u32,
    pub total_distance_m: f64,
    /// Distance-weighted average speed; `None` when the section has no
    /// distance at all.
    pub average_speed: Option<f64>,
    #[serde(with = "timestamp")]
    pub start_time: NaiveDateTime,
    #[serde(with = "timestamp")]
    pub end_time: NaiveDateTime,
    pub density: IssueDensity,
    pub bucket: DensityBucket,
}

impl GroupSummary {
    pub fn from_group(index: usize, group: &SegmentGroup<'_>, thresholds: &DensityThresholds) -> Self {
        let total_issues = total_issues(group.segments);
        let total_distance_m: f64 = group.segments.iter().map(Segment::distance_m).sum();
        let density = IssueDensity::compute(total_issues, total_distance_m);

        Self {
            index,
            first_segment: group.offset,
            segment_count: group.len(),
            total_issues,
            total_distance_m,
            average_speed: weighted_speed(group.segments, total_distance_m),
            start_time: group.first().start_time,
            end_time: group.last().end_time,
            density,
            bucket: thresholds.classify(density.value()),
        }
    }

    pub fn total_distance_km(&self) -> f64 {
        self.total_distance_m / 1000.0
    }

    pub fn color(&self) -> &'static str {
        self.bucket.color()
    }
}

/// Sum of issue counts, saturating at `u32::MAX`.
fn total_issues(segments: &[Segment]) -> u32 {
    segments
        .iter()
        .fold(0u32, |acc, s| acc.saturating_add(s.issue_count))
}

/// Σ(speed × distance) / Σ(distance).
///
/// Only members with a speed and a positive distance add to the numerator;
/// the denominator is the whole section's distance, so members without a
/// speed pull the average down.
fn weighted_speed(segments: &[Segment], total_distance_m: f64) -> Option<f64> {
    if total_distance_m <= 0.0 {
        return None;
    }
    let weighted: f64 = segments
        .iter()
        .filter_map(|s| match (s.average_speed, s.distance) {
            (Some(speed), Some(d)) if d > 0.0 => Some(speed * d),
            _ => None,
        })
        .sum();

    Some(weighted / total_distance_m)
}

/// Collapse a group into one segment spanning it end to end.
///
/// Keeps the first member's id, starts where the first member starts and
/// ends where the last one ends. Distance is `None` only when no member
/// reported one.
pub fn merge_group(group: &SegmentGroup<'_>) -> Segment {
    let first = group.first();
    let last = group.last();
    let any_distance = group.segments.iter().any(|s| s.distance.is_some());
    let total_distance_m: f64 = group.segments.iter().map(Segment::distance_m).sum();

    Segment {
        id: first.id,
        start_latitude: first.start_latitude,
        start_longitude: first.start_longitude,
        end_latitude: last.end_latitude,
        end_longitude: last.end_longitude,
        start_time: first.start_time,
        end_time: last.end_time,
        issue_count: total_issues(group.segments),
        distance: any_distance.then_some(total_distance_m),
        average_speed: weighted_speed(group.segments, total_distance_m),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;

    fn seg(i: i64, issues: u32, distance: Option<f64>, speed: Option<f64>) -> Segment {
        let base = DateTime::from_timestamp(1_700_000_000 + i * 10, 0)
            .unwrap()
            .naive_utc();
        Segment {
            id: Some(i),
            start_latitude: 10.0 + i as f64 * 0.001,
            start_longitude: 20.0,
            end_latitude: 10.0 + (i + 1) as f64 * 0.001,
            end_longitude: 20.0,
            start_time: base,
            end_time: base + chrono::Duration::seconds(9),
            issue_count: issues,
            distance,
            average_speed: speed,
        }
    }

    fn group(segments: &[Segment]) -> SegmentGroup<'_> {
        SegmentGroup {
            offset: 0,
            segments,
        }
    }

    #[test]
    fn totals_and_very_high_bucket() {
        let segments = [
            seg(0, 2, Some(500.0), Some(10.0)),
            seg(1, 1, Some(300.0), Some(20.0)),
            seg(2, 3, Some(200.0), Some(30.0)),
        ];
        let s = GroupSummary::from_group(0, &group(&segments), &DensityThresholds::default());
        assert_eq!(s.total_issues, 6);
        assert_eq!(s.total_distance_m, 1000.0);
        assert_eq!(s.density, IssueDensity::PerKm(6.0));
        assert_eq!(s.bucket, DensityBucket::VeryHigh);
        assert_eq!(s.color(), "#FF0000");
        // (10*500 + 20*300 + 30*200) / 1000
        assert!((s.average_speed.unwrap() - 17.0).abs() < 1e-9);
        assert_eq!(s.start_time, segments[0].start_time);
        assert_eq!(s.end_time, segments[2].end_time);
    }

    #[test]
    fn zero_length_group_has_no_speed() {
        let segments = [seg(0, 3, Some(0.0), Some(12.0))];
        let s = GroupSummary::from_group(0, &group(&segments), &DensityThresholds::default());
        assert_eq!(s.density, IssueDensity::PerSection(3.0));
        assert_eq!(s.bucket, DensityBucket::Medium);
        assert_eq!(s.average_speed, None);
    }

    #[test]
    fn members_without_speed_count_toward_distance() {
        let segments = [seg(0, 0, Some(100.0), Some(8.0)), seg(1, 0, Some(100.0), None)];
        let s = GroupSummary::from_group(0, &group(&segments), &DensityThresholds::default());
        assert_eq!(s.average_speed, Some(4.0));
        assert_eq!(s.bucket, DensityBucket::Low);
    }

    #[test]
    fn section_with_distance_but_no_speed_averages_zero() {
        let segments = [seg(0, 0, Some(100.0), None)];
        let s = GroupSummary::from_group(0, &group(&segments), &DensityThresholds::default());
        assert_eq!(s.average_speed, Some(0.0));
    }

    #[test]
    fn issue_total_saturates() {
        let segments = [
            seg(0, u32::MAX, Some(100.0), None),
            seg(1, 5, Some(100.0), None),
        ];
        let s = GroupSummary::from_group(0, &group(&segments), &DensityThresholds::default());
        assert_eq!(s.total_issues, u32::MAX);
        assert_eq!(s.bucket, DensityBucket::VeryHigh);
        assert_eq!(merge_group(&group(&segments)).issue_count, u32::MAX);
    }

    #[test]
    fn merged_segment_spans_group() {
        let segments = [
            seg(0, 1, Some(100.0), Some(10.0)),
            seg(1, 2, None, None),
            seg(2, 3, Some(300.0), Some(30.0)),
        ];
        let merged = merge_group(&group(&segments));
        assert_eq!(merged.id, Some(0));
        assert_eq!(merged.start(), segments[0].start());
        assert_eq!(merged.end(), segments[2].end());
        assert_eq!(merged.start_time, segments[0].start_time);
        assert_eq!(merged.end_time, segments[2].end_time);
        assert_eq!(merged.issue_count, 6);
        assert_eq!(merged.distance, Some(400.0));
        assert!((merged.average_speed.unwrap() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn merged_segment_without_distances() {
        let segments = [seg(0, 1, None, None)];
        let merged = merge_group(&group(&segments));
        assert_eq!(merged.distance, None);
        assert_eq!(merged.average_speed, None);
    }
}
