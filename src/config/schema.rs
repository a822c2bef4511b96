/// Configuration schema and defaults for roadseg.
///
/// Defines the TOML-serializable configuration structure with all sections:
/// `[backend]`, `[grouping]`, `[density]`, `[web]`, and `[logging]`.
///
/// Every field has a built-in default. Users only need to set the values
/// they want to override.
use serde::{Deserialize, Serialize};

use crate::segments::{Adjacency, DensityThresholds};
use crate::source::DateRange;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level roadseg configuration.
///
/// Maps directly to `~/.roadseg/config.toml` and `.roadseg.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadsegConfig {
    pub backend: BackendConfig,
    /// Adjacency thresholds for grouping segments into sections.
    pub grouping: Adjacency,
    /// Upper bounds of the density buckets (issues/km).
    pub density: DensityThresholds,
    pub web: WebConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [backend]
// ---------------------------------------------------------------------------

/// Dashboard backend connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the dashboard backend (without `/api/...`).
    pub base_url: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Raw `Cookie` header value for backends behind a login. Empty = none.
    pub session_cookie: String,
    /// Date range used when none is given on the command line.
    pub default_date_range: DateRange,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout_ms: 10_000,
            session_cookie: String::new(),
            default_date_range: DateRange::All,
        }
    }
}

// ---------------------------------------------------------------------------
// [web]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Listen address for `roadseg serve`.
    pub addr: String,
    /// Open the viewer in the default browser on start.
    pub open_browser: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9747".to_string(),
            open_browser: true,
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether fetch logging is enabled.
    pub enabled: bool,
    /// Path to the fetch log file. `~` is expanded to the home directory.
    pub path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "~/.roadseg/fetch-log.jsonl".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Annotated default file
// ---------------------------------------------------------------------------

impl RoadsegConfig {
    /// The annotated config written by `roadseg config init`.
    pub fn default_toml() -> String {
        r#"# roadseg configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (ROADSEG_*)
#   2. Project config (.roadseg.toml in current directory)
#   3. User global config (~/.roadseg/config.toml)
#   4. Built-in defaults

[backend]
base_url = "http://127.0.0.1:5000"
timeout_ms = 10000
session_cookie = ""                   # e.g. "session=..." when the backend requires login
default_date_range = "all"            # all | today | week | month

[grouping]
coord_tolerance_deg = 0.0001          # ~11 m per axis
max_gap_secs = 5.0

[density]
low_max = 1.0                         # issues/km, inclusive
medium_max = 3.0
high_max = 5.0

[web]
addr = "127.0.0.1:9747"
open_browser = true

[logging]
enabled = true
path = "~/.roadseg/fetch-log.jsonl"
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_toml_parses_back_to_defaults() {
        let config: RoadsegConfig = toml::from_str(&RoadsegConfig::default_toml()).unwrap();
        assert_eq!(config, RoadsegConfig::default());
    }

    #[test]
    fn missing_sections_fall_back() {
        let config: RoadsegConfig = toml::from_str(
            r#"
[backend]
base_url = "https://roads.example.org"
"#,
        )
        .unwrap();
        assert_eq!(config.backend.base_url, "https://roads.example.org");
        assert_eq!(config.backend.timeout_ms, 10_000);
        assert_eq!(config.grouping, Adjacency::default());
    }

    #[test]
    fn date_range_is_lowercase_in_toml() {
        let config: RoadsegConfig = toml::from_str(
            r#"
[backend]
default_date_range = "week"
"#,
        )
        .unwrap();
        assert_eq!(config.backend.default_date_range, DateRange::Week);
    }

    #[test]
    fn serializes_round_trip() {
        let toml_str = toml::to_string_pretty(&RoadsegConfig::default()).unwrap();
        let back: RoadsegConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back, RoadsegConfig::default());
    }
}
