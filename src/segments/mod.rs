//! Road segment records and the aggregation built on top of them.
//!
//! A [`Segment`] is one recorded edge of a travel path as returned by
//! `GET /api/road_segments`. The submodules turn an ordered list of segments
//! into road sections:
//!
//! - [`grouping`]: adjacency test and the single-pass grouping fold
//! - [`summary`]: per-group totals, weighted speed, time span
//! - [`density`]: issues-per-km value, density buckets, legend
pub mod density;
pub mod grouping;
pub mod summary;

use std::io::Read;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub use density::{DensityBucket, DensityThresholds, IssueDensity};
pub use grouping::{Adjacency, SegmentGroup, group_segments};
pub use summary::GroupSummary;

/// A `[latitude, longitude]` pair, in the order map renderers expect.
pub type LatLng = [f64; 2];

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// One directed edge of a recorded path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub start_latitude: f64,
    pub start_longitude: f64,
    pub end_latitude: f64,
    pub end_longitude: f64,
    #[serde(with = "timestamp")]
    pub start_time: NaiveDateTime,
    #[serde(with = "timestamp")]
    pub end_time: NaiveDateTime,
    pub issue_count: u32,
    /// Length of the segment in meters.
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub average_speed: Option<f64>,
}

impl Segment {
    pub fn start(&self) -> LatLng {
        [self.start_latitude, self.start_longitude]
    }

    pub fn end(&self) -> LatLng {
        [self.end_latitude, self.end_longitude]
    }

    /// Distance in meters, treating a missing value as zero.
    pub fn distance_m(&self) -> f64 {
        self.distance.unwrap_or(0.0)
    }

    /// Reject records whose numeric fields cannot describe a real edge.
    pub fn validate(&self) -> Result<()> {
        for (name, lat) in [
            ("start_latitude", self.start_latitude),
            ("end_latitude", self.end_latitude),
        ] {
            if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
                anyhow::bail!("{name} out of range: {lat}");
            }
        }
        for (name, lon) in [
            ("start_longitude", self.start_longitude),
            ("end_longitude", self.end_longitude),
        ] {
            if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
                anyhow::bail!("{name} out of range: {lon}");
            }
        }
        if let Some(d) = self.distance
            && !d.is_finite()
        {
            anyhow::bail!("distance is not a finite number");
        }
        if let Some(v) = self.average_speed
            && !v.is_finite()
        {
            anyhow::bail!("average_speed is not a finite number");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a JSON array of segments and validate every record.
///
/// A single malformed record fails the whole batch; callers never see a
/// partially parsed list.
pub fn parse_segments(json: &str) -> Result<Vec<Segment>> {
    let segments: Vec<Segment> =
        serde_json::from_str(json).context("malformed road segment JSON")?;
    validate_all(&segments)?;
    Ok(segments)
}

/// Streaming variant of [`parse_segments`] for response bodies and files.
pub fn read_segments<R: Read>(reader: R) -> Result<Vec<Segment>> {
    let segments: Vec<Segment> =
        serde_json::from_reader(reader).context("malformed road segment JSON")?;
    validate_all(&segments)?;
    Ok(segments)
}

fn validate_all(segments: &[Segment]) -> Result<()> {
    for (i, segment) in segments.iter().enumerate() {
        segment
            .validate()
            .with_context(|| format!("invalid road segment at index {i}"))?;
    }
    Ok(())
}

/// Parse an ISO-8601 timestamp as the backend emits it.
///
/// Accepts naive `YYYY-MM-DDTHH:MM:SS[.ffffff]` (with `T` or a space) and
/// RFC 3339 strings with an offset, which are normalized to UTC.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Serde adapter for segment timestamps.
pub(crate) mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn serialize<S: Serializer>(dt: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {raw:?}")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const ONE: &str = r#"[{
        "id": 7,
        "start_latitude": 52.1, "start_longitude": 4.3,
        "end_latitude": 52.1001, "end_longitude": 4.3001,
        "start_time": "2024-05-01T10:00:00",
        "end_time": "2024-05-01T10:00:04.250000",
        "issue_count": 2,
        "distance": 14.2,
        "average_speed": 6.5
    }]"#;

    #[test]
    fn parses_backend_record() {
        let segments = parse_segments(ONE).unwrap();
        assert_eq!(segments.len(), 1);
        let s = &segments[0];
        assert_eq!(s.id, Some(7));
        assert_eq!(s.issue_count, 2);
        assert_eq!(s.distance, Some(14.2));
        assert_eq!(s.start(), [52.1, 4.3]);
        assert_eq!((s.end_time - s.start_time).num_milliseconds(), 4250);
    }

    #[test]
    fn optional_fields_may_be_null_or_absent() {
        let json = r#"[{
            "start_latitude": 1.0, "start_longitude": 2.0,
            "end_latitude": 1.0, "end_longitude": 2.0,
            "start_time": "2024-05-01 10:00:00",
            "end_time": "2024-05-01 10:00:01",
            "issue_count": 0,
            "distance": null
        }]"#;
        let segments = parse_segments(json).unwrap();
        assert_eq!(segments[0].distance, None);
        assert_eq!(segments[0].average_speed, None);
        assert_eq!(segments[0].distance_m(), 0.0);
    }

    #[test]
    fn missing_timestamp_is_malformed() {
        let json = r#"[{
            "start_latitude": 1.0, "start_longitude": 2.0,
            "end_latitude": 1.0, "end_longitude": 2.0,
            "start_time": null,
            "end_time": "2024-05-01T10:00:01",
            "issue_count": 0
        }]"#;
        assert!(parse_segments(json).is_err());
    }

    #[test]
    fn out_of_range_coordinate_is_malformed() {
        let json = ONE.replace("52.1001", "152.1001");
        let err = parse_segments(&json).unwrap_err();
        assert!(format!("{err:#}").contains("end_latitude"));
    }

    #[test]
    fn timestamp_accepts_offsets() {
        let dt = parse_timestamp("2024-05-01T12:00:00+02:00").unwrap();
        assert_eq!(dt, parse_timestamp("2024-05-01T10:00:00").unwrap());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn serializes_timestamps_in_iso_form() {
        let segments = parse_segments(ONE).unwrap();
        let json = serde_json::to_string(&segments[0]).unwrap();
        assert!(json.contains("\"start_time\":\"2024-05-01T10:00:00\""));
        assert!(json.contains("\"end_time\":\"2024-05-01T10:00:04.250\""));
    }
}
