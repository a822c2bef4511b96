//! Where road segments come from.
//!
//! [`SegmentSource`] is the seam between the loader and the outside world:
//! [`HttpSource`] talks to the dashboard backend, [`FileSource`] reads a
//! saved response from disk or stdin. Tests substitute their own sources.
mod file;
mod http;

use std::str::FromStr;

use anyhow::Result;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::segments::Segment;

pub use file::{FileSource, filter_by_range};
pub use http::HttpSource;

/// A provider of ordered segment lists for a date-range filter.
pub trait SegmentSource {
    /// Short name used in logs (`"http"`, `"file"`).
    fn kind(&self) -> &'static str;

    fn fetch(&self, range: DateRange) -> Result<Vec<Segment>>;
}

// ---------------------------------------------------------------------------
// Date range filter
// ---------------------------------------------------------------------------

/// The only filter the road segment endpoint applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateRange {
    #[default]
    All,
    Today,
    Week,
    Month,
}

impl DateRange {
    /// Value of the `dateRange` query parameter.
    pub fn as_query(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Today => "today",
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    pub fn parse(val: &str) -> Option<Self> {
        match val.trim().to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "today" => Some(Self::Today),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            _ => None,
        }
    }

    /// Earliest segment start time included by this range, relative to `now`.
    ///
    /// `today` starts at midnight of `now`'s day, `week` and `month` reach back 7 and
    /// 30 days. `all` has no bound.
    pub fn start_bound(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            Self::All => None,
            Self::Today => now.date().and_hms_opt(0, 0, 0),
            Self::Week => Some(now - chrono::Duration::days(7)),
            Self::Month => Some(now - chrono::Duration::days(30)),
        }
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_query())
    }
}

impl FromStr for DateRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
            .ok_or_else(|| anyhow::anyhow!("unknown date range '{s}' (expected all, today, week, month)"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
