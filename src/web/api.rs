//! JSON API handlers for the map viewer.
//!
//! Each handler corresponds to an API endpoint and returns a
//! `Response<Cursor<Vec<u8>>>` with JSON content.

use std::io::Cursor;

use anyhow::{Context, Result};
use serde::Serialize;
use tiny_http::{Response, StatusCode};

use crate::analytics::logger;
use crate::config::{self, RoadsegConfig};
use crate::layer::SegmentLayer;
use crate::loader::ReloadOutcome;
use crate::notify::Notification;
use crate::segments::density::LegendEntry;
use crate::source::{DateRange, HttpSource};

use super::{Viewer, content_type_json};

// ---------------------------------------------------------------------------
// JSON response types
// ---------------------------------------------------------------------------

/// Layer API response. `layer` is the layer currently on the map, which is
/// the previous one when the reload failed.
#[derive(Serialize)]
struct LayerResponse<'a> {
    date_range: DateRange,
    outcome: ReloadOutcome,
    layer: Option<&'a SegmentLayer>,
    notifications: Vec<Notification>,
}

#[derive(Serialize)]
struct LegendResponse {
    title: &'static str,
    entries: Vec<LegendEntry>,
}

/// Config API response: the effective config as JSON plus the raw TOML.
#[derive(Serialize)]
struct ConfigResponse<'a> {
    config: &'a RoadsegConfig,
    toml_text: String,
}

#[derive(Serialize)]
struct HealthResponse {
    backend_url: String,
    backend_reachable: bool,
    backend_status: Option<u16>,
    backend_error: Option<String>,
    config_exists: bool,
    log_exists: bool,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn json_response<T: Serialize>(data: &T) -> Result<Response<Cursor<Vec<u8>>>> {
    json_response_with_status(data, 200)
}

fn json_response_with_status<T: Serialize>(
    data: &T,
    status: u16,
) -> Result<Response<Cursor<Vec<u8>>>> {
    let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
    Ok(Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(status)))
}

/// Extract a query parameter from a URL.
fn parse_query_param<'a>(url: &'a str, name: &str) -> Option<&'a str> {
    url.split('?').nth(1)?.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == name && !v.is_empty()).then_some(v)
    })
}

// ---------------------------------------------------------------------------
// API Handlers
// ---------------------------------------------------------------------------

/// `GET /api/layer?dateRange=R`: reload and return the segment layer.
///
/// Without `dateRange` the current filter is reloaded. An unknown value is
/// rejected with 400 before anything is fetched.
pub fn get_layer(viewer: &mut Viewer, url: &str) -> Result<Response<Cursor<Vec<u8>>>> {
    let range = match parse_query_param(url, "dateRange") {
        None => viewer.state.date_range(),
        Some(raw) => match DateRange::parse(raw) {
            Some(range) => range,
            None => {
                let body = serde_json::json!({ "error": format!("unknown dateRange '{raw}'") });
                return json_response_with_status(&body, 400);
            }
        },
    };

    let (outcome, notifications) = viewer.reload(range);

    let resp = LayerResponse {
        date_range: viewer.state.date_range(),
        outcome,
        layer: viewer.state.layer(),
        notifications,
    };

    json_response(&resp)
}

/// `GET /api/legend`: density buckets, colors, and labels.
pub fn get_legend(cfg: &RoadsegConfig) -> Result<Response<Cursor<Vec<u8>>>> {
    let resp = LegendResponse {
        title: "Road Segments",
        entries: cfg.density.legend(),
    };
    json_response(&resp)
}

/// `GET /api/config`: effective configuration the viewer runs with.
pub fn get_config(cfg: &RoadsegConfig) -> Result<Response<Cursor<Vec<u8>>>> {
    let toml_text = toml::to_string_pretty(cfg).unwrap_or_default();
    json_response(&ConfigResponse {
        config: cfg,
        toml_text,
    })
}

/// `GET /api/health`: backend reachability plus config and log presence.
pub fn get_health(cfg: &RoadsegConfig) -> Result<Response<Cursor<Vec<u8>>>> {
    let source = HttpSource::from_config(&cfg.backend);
    let probe = source.probe();

    let config_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let log_exists = logger::fetch_log_path(&cfg.logging)
        .map(|p| p.exists())
        .unwrap_or(false);

    let resp = HealthResponse {
        backend_url: source.base_url().to_string(),
        backend_reachable: probe.is_ok(),
        backend_status: probe.as_ref().ok().copied(),
        backend_error: probe.err().map(|e| format!("{e:#}")),
        config_exists,
        log_exists,
    };

    json_response(&resp)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use chrono::DateTime;

    use super::*;
    use crate::segments::Segment;
    use crate::source::SegmentSource;

    /// Succeeds on the first fetch, fails on every later one.
    struct FlakySource {
        calls: Cell<u32>,
    }

    impl SegmentSource for FlakySource {
        fn kind(&self) -> &'static str {
            "file"
        }

        fn fetch(&self, _range: DateRange) -> Result<Vec<Segment>> {
            let n = self.calls.get();
            self.calls.set(n + 1);
            if n > 0 {
                anyhow::bail!("HTTP error! status: 500");
            }
            let t = DateTime::from_timestamp(1_700_000_000, 0)
                .unwrap()
                .naive_utc();
            Ok(vec![Segment {
                id: Some(1),
                start_latitude: 10.0,
                start_longitude: 20.0,
                end_latitude: 10.001,
                end_longitude: 20.0,
                start_time: t,
                end_time: t + chrono::Duration::seconds(10),
                issue_count: 2,
                distance: Some(500.0),
                average_speed: Some(8.0),
            }])
        }
    }

    fn viewer() -> Viewer {
        let mut config = RoadsegConfig::default();
        config.logging.enabled = false;
        Viewer::new(
            config,
            Box::new(FlakySource {
                calls: Cell::new(0),
            }),
        )
    }

    fn body_json(resp: Response<Cursor<Vec<u8>>>) -> serde_json::Value {
        let mut body = String::new();
        std::io::Read::read_to_string(&mut resp.into_reader(), &mut body).unwrap();
        serde_json::from_str(&body).unwrap()
    }

    #[test]
    fn parse_query_param_extracts_value() {
        assert_eq!(
            parse_query_param("/api/layer?dateRange=week", "dateRange"),
            Some("week")
        );
        assert_eq!(
            parse_query_param("/api/layer?x=1&dateRange=today", "dateRange"),
            Some("today")
        );
    }

    #[test]
    fn parse_query_param_returns_none_for_missing() {
        assert_eq!(parse_query_param("/api/layer", "dateRange"), None);
        assert_eq!(parse_query_param("/api/layer?dateRange=", "dateRange"), None);
        assert_eq!(parse_query_param("/api/layer?foo=bar", "dateRange"), None);
    }

    #[test]
    fn layer_then_failure_keeps_previous_layer() {
        let mut v = viewer();

        let first = body_json(get_layer(&mut v, "/api/layer?dateRange=week").unwrap());
        assert_eq!(first["outcome"]["status"], "loaded");
        assert_eq!(first["date_range"], "week");
        assert_eq!(first["layer"]["polylines"][0]["color"], "#FFA500");

        let second = body_json(get_layer(&mut v, "/api/layer?dateRange=month").unwrap());
        assert_eq!(second["outcome"]["status"], "failed");
        assert_eq!(second["layer"]["date_range"], "week");
        assert_eq!(second["notifications"][0]["level"], "error");
        assert_eq!(
            second["notifications"][0]["message"],
            "Error loading road segments"
        );
        assert!(!v.state.is_busy());
        assert_eq!(v.state.layer().unwrap().segment_count, 1);
        assert_eq!(
            v.state.drain_notifications().len(),
            0,
            "notifications are handed out once"
        );
    }

    #[test]
    fn unknown_date_range_is_rejected() {
        let mut v = viewer();
        let resp = get_layer(&mut v, "/api/layer?dateRange=year").unwrap();
        assert_eq!(resp.status_code(), StatusCode(400));
        assert!(v.state.layer().is_none());
    }

    #[test]
    fn legend_lists_four_buckets() {
        let json = body_json(get_legend(&RoadsegConfig::default()).unwrap());
        assert_eq!(json["title"], "Road Segments");
        assert_eq!(json["entries"].as_array().unwrap().len(), 4);
        assert_eq!(json["entries"][3]["label"], "5+ issues/km");
    }

    #[test]
    fn config_includes_toml_text() {
        let json = body_json(get_config(&RoadsegConfig::default()).unwrap());
        assert_eq!(json["config"]["web"]["addr"], "127.0.0.1:9747");
        assert!(json["toml_text"].as_str().unwrap().contains("[backend]"));
    }

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            backend_url: "http://127.0.0.1:5000".to_string(),
            backend_reachable: false,
            backend_status: None,
            backend_error: Some("connection refused".to_string()),
            config_exists: true,
            log_exists: false,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"backend_reachable\":false"));
    }
}
