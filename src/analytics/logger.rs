use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::expand_home;
use crate::config::schema::LoggingConfig;
use crate::source::DateRange;

// ---------------------------------------------------------------------------
// Fetch log entry (JSONL analytics)
// ---------------------------------------------------------------------------

/// A single entry in the fetch log (`~/.roadseg/fetch-log.jsonl`).
///
/// One entry per segment layer load, successful or not. Used by the
/// reporter behind `roadseg stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchLogEntry {
    pub timestamp: String,
    pub date_range: DateRange,
    /// Source kind: `"http"` or `"file"`.
    pub source: String,
    pub success: bool,
    #[serde(default)]
    pub segment_count: usize,
    #[serde(default)]
    pub group_count: usize,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl FetchLogEntry {
    pub fn success(
        date_range: DateRange,
        source: &str,
        segment_count: usize,
        group_count: usize,
        duration_ms: u64,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            date_range,
            source: source.to_string(),
            success: true,
            segment_count,
            group_count,
            duration_ms,
            error: None,
        }
    }

    pub fn failure(date_range: DateRange, source: &str, duration_ms: u64, error: &anyhow::Error) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            date_range,
            source: source.to_string(),
            success: false,
            segment_count: 0,
            group_count: 0,
            duration_ms,
            error: Some(format!("{error:#}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Append an entry to the configured fetch log.
///
/// Best-effort: a log that cannot be written never fails the load.
pub fn log_fetch(config: &LoggingConfig, entry: &FetchLogEntry) {
    if !config.enabled {
        return;
    }
    if let Some(path) = fetch_log_path(config) {
        let _ = append_log_entry(&path, entry);
    }
}

fn append_log_entry(path: &Path, entry: &FetchLogEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(entry)?;
    writeln!(file, "{json}")?;

    Ok(())
}

/// Resolve the fetch log path, expanding `~`.
pub fn fetch_log_path(config: &LoggingConfig) -> Option<PathBuf> {
    expand_home(&config.path)
}

// ---------------------------------------------------------------------------
// Reading log entries
// ---------------------------------------------------------------------------

/// Read all entries from a fetch log file.
///
/// Silently skips malformed lines. Returns an empty vec if the file does not
/// exist or cannot be read.
pub fn read_entries(path: &Path) -> Vec<FetchLogEntry> {
    let Ok(file) = fs::File::open(path) else {
        return Vec::new();
    };

    BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .filter_map(|line| serde_json::from_str::<FetchLogEntry>(&line).ok())
        .collect()
}

/// Read entries from the configured log, restricted to the last N days.
///
/// If `days` is `None`, returns all entries.
pub fn read_entries_since_days(config: &LoggingConfig, days: Option<u32>) -> Vec<FetchLogEntry> {
    let Some(path) = fetch_log_path(config) else {
        return Vec::new();
    };
    let entries = read_entries(&path);

    let Some(days) = days else {
        return entries;
    };

    let cutoff = (Utc::now() - chrono::Duration::days(i64::from(days))).to_rfc3339();
    entries
        .into_iter()
        .filter(|e| e.timestamp >= cutoff)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
