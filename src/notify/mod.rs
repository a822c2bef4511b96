//! User-visible notifications.
//!
//! Failures never crash a load; they become a [`Notification`] that the CLI
//! prints and the viewer shows as a toast. Every notification is also
//! appended to `~/.roadseg/events.jsonl` for later inspection.

use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use colored::Colorize;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One transient message for the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub timestamp: String,
    pub level: Level,
    pub message: String,
    /// Underlying error chain, when the notification reports a failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Notification {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            level,
            message: message.into(),
            detail: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Level::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Level::Warning, message)
    }

    /// An error notification carrying the full error chain as detail.
    pub fn error(message: impl Into<String>, error: &anyhow::Error) -> Self {
        Self {
            detail: Some(format!("{error:#}")),
            ..Self::new(Level::Error, message)
        }
    }

    /// Print to stderr, colored by level.
    pub fn print(&self) {
        let tag = match self.level {
            Level::Info => "info".cyan().bold(),
            Level::Warning => "warning".yellow().bold(),
            Level::Error => "error".red().bold(),
        };
        eprintln!("{tag}: {}", self.message);
        if let Some(detail) = &self.detail {
            eprintln!("  {}", detail.dimmed());
        }
    }
}

// ---------------------------------------------------------------------------
// Event log
// ---------------------------------------------------------------------------

/// Append a notification to `~/.roadseg/events.jsonl`.
///
/// Best-effort: failures are silently ignored.
pub fn log_notification(notification: &Notification) {
    let _ = append_event(notification);
}

fn append_event(notification: &Notification) -> anyhow::Result<()> {
    let Some(path) = events_log_path() else {
        return Ok(());
    };

    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(notification)?;
    writeln!(file, "{json}")?;

    Ok(())
}

fn events_log_path() -> Option<PathBuf> {
    crate::config::data_dir().map(|dir| dir.join("events.jsonl"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
