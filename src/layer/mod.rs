//! The road segment layer handed to a map renderer.
//!
//! A [`SegmentLayer`] holds one [`PolylineRequest`] per input segment, not
//! per group. Every member of a group is drawn with its own two coordinates,
//! and all members share the group's color and popup.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};

use crate::config::RoadsegConfig;
use crate::segments::{
    Adjacency, DensityThresholds, GroupSummary, IssueDensity, LatLng, Segment, group_segments,
    summary::merge_group,
};
use crate::source::DateRange;

/// Stroke width in pixels.
pub const STROKE_WEIGHT: u32 = 5;

pub const STROKE_OPACITY: f64 = 0.7;

const POPUP_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Everything the layer build needs besides the segments.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayerSettings {
    pub adjacency: Adjacency,
    pub thresholds: DensityThresholds,
}

impl LayerSettings {
    pub fn from_config(config: &RoadsegConfig) -> Self {
        Self {
            adjacency: config.grouping,
            thresholds: config.density,
        }
    }
}

// ---------------------------------------------------------------------------
// Draw requests
// ---------------------------------------------------------------------------

/// Popup payload shared by every polyline of a group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Popup {
    pub total_issues: u32,
    pub density: IssueDensity,
    /// Distance-weighted average speed in knots, if available.
    pub average_speed: Option<f64>,
    pub total_distance_km: f64,
    pub start_time: String,
    pub end_time: String,
}

impl Popup {
    fn from_summary(summary: &GroupSummary) -> Self {
        Self {
            total_issues: summary.total_issues,
            density: summary.density,
            average_speed: summary.average_speed,
            total_distance_km: summary.total_distance_km(),
            start_time: summary.start_time.format(POPUP_TIME_FORMAT).to_string(),
            end_time: summary.end_time.format(POPUP_TIME_FORMAT).to_string(),
        }
    }

    /// Plain-text rendering, one field per line.
    pub fn to_text(&self) -> String {
        let speed = match self.average_speed {
            Some(v) => format!("{v:.1} knots"),
            None => "N/A".to_string(),
        };
        format!(
            "Road Section\nTotal Issues: {}\nIssue Density: {}\nAverage Speed: {}\nTotal Distance: {:.1} km\nTime: {} - {}",
            self.total_issues,
            self.density,
            speed,
            self.total_distance_km,
            self.start_time,
            self.end_time,
        )
    }
}

/// One polyline for the renderer: a single segment, colored by its group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolylineRequest {
    pub segment_index: usize,
    pub group_index: usize,
    pub path: [LatLng; 2],
    pub color: &'static str,
    pub weight: u32,
    pub opacity: f64,
    pub popup: Popup,
}

// ---------------------------------------------------------------------------
// Layer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentLayer {
    pub date_range: DateRange,
    pub built_at: DateTime<Utc>,
    pub segment_count: usize,
    pub groups: Vec<GroupSummary>,
    pub polylines: Vec<PolylineRequest>,
    /// One merged segment per group, spanning it end to end.
    pub sections: Vec<Segment>,
}

impl SegmentLayer {
    /// Group, aggregate, and color `segments` in one pass.
    ///
    /// Pure apart from the build timestamp; the result is always complete.
    pub fn build(segments: &[Segment], date_range: DateRange, settings: &LayerSettings) -> Self {
        let groups = group_segments(segments, &settings.adjacency);

        let mut summaries = Vec::with_capacity(groups.len());
        let mut polylines = Vec::with_capacity(segments.len());
        let mut sections = Vec::with_capacity(groups.len());

        for (group_index, group) in groups.iter().enumerate() {
            let summary = GroupSummary::from_group(group_index, group, &settings.thresholds);
            let popup = Popup::from_summary(&summary);

            for (segment_index, segment) in group.indices().zip(group.segments) {
                polylines.push(PolylineRequest {
                    segment_index,
                    group_index,
                    path: [segment.start(), segment.end()],
                    color: summary.color(),
                    weight: STROKE_WEIGHT,
                    opacity: STROKE_OPACITY,
                    popup: popup.clone(),
                });
            }

            summaries.push(summary);
            sections.push(merge_group(group));
        }

        Self {
            date_range,
            built_at: Utc::now(),
            segment_count: segments.len(),
            groups: summaries,
            polylines,
            sections,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.polylines.is_empty()
    }

    /// Export as a GeoJSON `FeatureCollection` of `LineString` features.
    ///
    /// GeoJSON orders positions `[longitude, latitude]`.
    pub fn to_geojson(&self) -> Value {
        let features: Vec<Value> = self
            .polylines
            .iter()
            .map(|p| {
                let [start, end] = p.path;
                json!({
                    "type": "Feature",
                    "geometry": {
                        "type": "LineString",
                        "coordinates": [[start[1], start[0]], [end[1], end[0]]],
                    },
                    "properties": {
                        "segment_index": p.segment_index,
                        "group_index": p.group_index,
                        "stroke": p.color,
                        "stroke-width": p.weight,
                        "stroke-opacity": p.opacity,
                        "popup": p.popup,
                        "description": p.popup.to_text(),
                    },
                })
            })
            .collect();

        json!({
            "type": "FeatureCollection",
            "features": features,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
