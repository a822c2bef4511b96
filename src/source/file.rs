/// Segment source backed by a saved `/api/road_segments` response.
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};

use super::{DateRange, SegmentSource};
use crate::segments::{self, Segment};

/// Reads a JSON array of segments from a file, or from stdin when no path
/// is set. The date-range cutoff is applied locally, the way the backend
/// applies it, against the UTC clock: parsed segment times are UTC, with
/// offset forms converted and naive forms taken as given.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: Option<PathBuf>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn stdin() -> Self {
        Self { path: None }
    }

    /// `-` selects stdin, anything else is a path.
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            Self::stdin()
        } else {
            Self::new(arg)
        }
    }

    fn read(&self) -> Result<Vec<Segment>> {
        match &self.path {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("failed to open {}", path.display()))?;
                segments::read_segments(BufReader::new(file))
                    .with_context(|| format!("failed to read segments from {}", path.display()))
            }
            None => segments::read_segments(std::io::stdin().lock())
                .context("failed to read segments from stdin"),
        }
    }
}

impl SegmentSource for FileSource {
    fn kind(&self) -> &'static str {
        "file"
    }

    fn fetch(&self, range: DateRange) -> Result<Vec<Segment>> {
        let segments = self.read()?;
        Ok(filter_by_range(segments, range, utc_now()))
    }
}

/// The reference clock for local cutoffs, in the zone segment times use.
fn utc_now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Keep segments starting at or after the range's cutoff, in input order.
pub fn filter_by_range(
    mut segments: Vec<Segment>,
    range: DateRange,
    now: NaiveDateTime,
) -> Vec<Segment> {
    if let Some(cutoff) = range.start_bound(now) {
        segments.retain(|s| s.start_time >= cutoff);
    }
    segments
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
