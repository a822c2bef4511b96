//! Grouping consecutive segments into road sections.
//!
//! Two consecutive segments belong to the same section when the second one
//! starts where the first one ended, both in space and in time. The scan is
//! a single left-to-right pass: a broken adjacency permanently closes the
//! current group, and groups are never merged afterwards.
use serde::{Deserialize, Serialize};

use super::Segment;

/// Coordinate tolerance in degrees (~11 m).
pub const DEFAULT_COORD_TOLERANCE_DEG: f64 = 0.0001;

/// Maximum gap between one segment's end and the next one's start.
pub const DEFAULT_MAX_GAP_SECS: f64 = 5.0;

// ---------------------------------------------------------------------------
// Adjacency
// ---------------------------------------------------------------------------

/// Thresholds for the space-and-time adjacency test.
///
/// Also serves as the `[grouping]` section of the config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Adjacency {
    /// Maximum per-axis difference between end and start coordinates (degrees, exclusive).
    pub coord_tolerance_deg: f64,
    /// Maximum time gap in seconds (exclusive).
    pub max_gap_secs: f64,
}

impl Default for Adjacency {
    fn default() -> Self {
        Self {
            coord_tolerance_deg: DEFAULT_COORD_TOLERANCE_DEG,
            max_gap_secs: DEFAULT_MAX_GAP_SECS,
        }
    }
}

impl Adjacency {
    /// Whether `next` continues `prev`.
    ///
    /// The time gap is signed: a segment that starts before the previous
    /// one ended is adjacent in time.
    pub fn is_adjacent(&self, prev: &Segment, next: &Segment) -> bool {
        let coord_match = (prev.end_latitude - next.start_latitude).abs()
            < self.coord_tolerance_deg
            && (prev.end_longitude - next.start_longitude).abs() < self.coord_tolerance_deg;

        let gap_secs = (next.start_time - prev.end_time).num_milliseconds() as f64 / 1000.0;

        coord_match && gap_secs < self.max_gap_secs
    }
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

/// A maximal run of adjacent segments, borrowed from the input list.
///
/// Never empty: a group only exists once the segment that closes it has
/// been appended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentGroup<'a> {
    /// Position of the first member in the input list.
    pub offset: usize,
    pub segments: &'a [Segment],
}

impl<'a> SegmentGroup<'a> {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn first(&self) -> &'a Segment {
        &self.segments[0]
    }

    pub fn last(&self) -> &'a Segment {
        &self.segments[self.segments.len() - 1]
    }

    /// Input indices covered by this group.
    pub fn indices(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.segments.len()
    }
}

/// Partition `segments` into groups of consecutive adjacent segments.
///
/// Concatenating the returned groups in order reproduces the input exactly.
/// An empty input yields no groups.
pub fn group_segments<'a>(segments: &'a [Segment], adjacency: &Adjacency) -> Vec<SegmentGroup<'a>> {
    let mut groups = Vec::new();
    let mut start = 0;

    for (i, segment) in segments.iter().enumerate() {
        let closes = match segments.get(i + 1) {
            Some(next) => !adjacency.is_adjacent(segment, next),
            None => true,
        };

        if closes {
            groups.push(SegmentGroup {
                offset: start,
                segments: &segments[start..=i],
            });
            start = i + 1;
        }
    }

    groups
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDateTime};

    use super::*;

    fn at(secs: i64) -> NaiveDateTime {
        DateTime::from_timestamp(secs, 0).unwrap().naive_utc()
    }

    fn seg(start: (f64, f64, i64), end: (f64, f64, i64)) -> Segment {
        Segment {
            id: None,
            start_latitude: start.0,
            start_longitude: start.1,
            end_latitude: end.0,
            end_longitude: end.1,
            start_time: at(start.2),
            end_time: at(end.2),
            issue_count: 1,
            distance: Some(10.0),
            average_speed: None,
        }
    }

    #[test]
    fn near_and_quick_is_adjacent() {
        let a = seg((9.999, 19.999, 90), (10.0, 20.0, 100));
        let b = seg((10.000005, 20.000005, 102), (10.001, 20.001, 110));
        assert!(Adjacency::default().is_adjacent(&a, &b));
    }

    #[test]
    fn tolerance_is_exclusive() {
        let a = seg((0.0, 0.0, 0), (10.0, 20.0, 10));
        let b = seg((10.0, 20.0, 15), (10.1, 20.0, 20));
        // Exactly 5 s apart.
        assert!(!Adjacency::default().is_adjacent(&a, &b));

        let c = seg((10.0002, 20.0, 11), (10.1, 20.0, 20));
        assert!(!Adjacency::default().is_adjacent(&a, &c));
    }

    #[test]
    fn overlapping_times_are_adjacent() {
        let a = seg((0.0, 0.0, 0), (10.0, 20.0, 100));
        let b = seg((10.0, 20.0, 40), (10.1, 20.0, 120));
        assert!(Adjacency::default().is_adjacent(&a, &b));
    }

    #[test]
    fn empty_input_has_no_groups() {
        assert!(group_segments(&[], &Adjacency::default()).is_empty());
    }

    #[test]
    fn single_segment_is_one_group() {
        let only = [seg((0.0, 0.0, 0), (0.001, 0.0, 10))];
        let groups = group_segments(&only, &Adjacency::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].indices(), 0..1);
    }

    #[test]
    fn break_splits_groups() {
        let input = [
            seg((0.0, 0.0, 0), (0.001, 0.0, 10)),
            seg((0.001, 0.0, 11), (0.002, 0.0, 20)),
            // jumps away
            seg((1.0, 1.0, 21), (1.001, 1.0, 30)),
        ];
        let groups = group_segments(&input, &Adjacency::default());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].indices(), 0..2);
        assert_eq!(groups[1].indices(), 2..3);
        assert_eq!(groups[1].first(), &input[2]);
        assert_eq!(groups[0].last(), &input[1]);
    }
}
