//! Embedded map viewer for roadseg.
//!
//! Provides a lightweight HTTP server (sync, via `tiny_http`) that serves:
//! - A single-page Leaflet map drawing the segment layer with its legend
//! - JSON API endpoints for the layer, legend, config, and health
//!
//! Launched via `roadseg serve` (default: `http://127.0.0.1:9747`).

mod api;
mod frontend;

use std::io::Cursor;

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Response, Server, StatusCode};

use crate::analytics::logger;
use crate::config::RoadsegConfig;
use crate::layer::LayerSettings;
use crate::loader::{MapState, ReloadOutcome};
use crate::notify::{self, Notification};
use crate::source::{DateRange, HttpSource, SegmentSource};

// ---------------------------------------------------------------------------
// Viewer state
// ---------------------------------------------------------------------------

/// Everything the request loop owns between requests.
pub struct Viewer {
    config: RoadsegConfig,
    state: MapState,
    source: Box<dyn SegmentSource>,
}

impl Viewer {
    pub fn new(config: RoadsegConfig, source: Box<dyn SegmentSource>) -> Self {
        let state = MapState::new(
            LayerSettings::from_config(&config),
            config.backend.default_date_range,
        );
        Self {
            config,
            state,
            source,
        }
    }

    /// Reload the layer for `range`, logging the fetch and every
    /// notification it produced.
    fn reload(&mut self, range: DateRange) -> (ReloadOutcome, Vec<Notification>) {
        let (outcome, entry) = self.state.reload(self.source.as_ref(), range);
        if let Some(entry) = entry {
            logger::log_fetch(&self.config.logging, &entry);
        }
        let notifications = self.state.drain_notifications();
        for n in &notifications {
            notify::log_notification(n);
        }
        (outcome, notifications)
    }
}

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the map viewer on `addr`, fetching from the configured backend.
///
/// Blocks the current thread. Requests are handled sequentially by the one
/// thread that owns the map state. A failing handler answers 500 and the
/// loop keeps going.
pub fn serve(config: RoadsegConfig, addr: &str) -> Result<()> {
    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    println!("roadseg viewer running at http://{addr}");
    println!("Press Ctrl+C to stop.\n");

    if config.web.open_browser {
        let _ = open_browser(&format!("http://{addr}"));
    }

    let source = Box::new(HttpSource::from_config(&config.backend));
    let mut viewer = Viewer::new(config, source);

    for request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();

        let resp = match dispatch(&mut viewer, &method, &url) {
            Ok(resp) => resp,
            Err(e) => error_response(&e),
        };
        let _ = request.respond(resp);

        println!(
            "{} {} {}",
            method,
            url,
            chrono::Local::now().format("%H:%M:%S")
        );
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Dispatch an incoming request to the appropriate handler.
pub fn dispatch(
    viewer: &mut Viewer,
    method: &Method,
    url: &str,
) -> Result<Response<Cursor<Vec<u8>>>> {
    let path = url.split('?').next().unwrap_or(url);

    match (method, path) {
        (&Method::Get, "/") | (&Method::Get, "/index.html") => Ok(serve_frontend()),

        (&Method::Get, "/api/layer") => api::get_layer(viewer, url),
        (&Method::Get, "/api/legend") => api::get_legend(&viewer.config),
        (&Method::Get, "/api/config") => api::get_config(&viewer.config),
        (&Method::Get, "/api/health") => api::get_health(&viewer.config),

        _ => Ok(not_found()),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn serve_frontend() -> Response<Cursor<Vec<u8>>> {
    Response::from_data(frontend::INDEX_HTML.as_bytes().to_vec())
        .with_header(content_type_html())
        .with_status_code(StatusCode(200))
}

fn not_found() -> Response<Cursor<Vec<u8>>> {
    let body = r#"{"error": "not found"}"#;
    Response::from_data(body.as_bytes().to_vec())
        .with_header(content_type_json())
        .with_status_code(StatusCode(404))
}

fn error_response(error: &anyhow::Error) -> Response<Cursor<Vec<u8>>> {
    let body = serde_json::json!({ "error": format!("{error:#}") }).to_string();
    Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(500))
}

/// JSON content type header.
pub(crate) fn content_type_json() -> Header {
    Header::from_bytes("Content-Type", "application/json; charset=utf-8").unwrap()
}

fn content_type_html() -> Header {
    Header::from_bytes("Content-Type", "text/html; charset=utf-8").unwrap()
}

/// Attempt to open a URL in the system default browser.
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segments::Segment;

    struct EmptySource;

    impl SegmentSource for EmptySource {
        fn kind(&self) -> &'static str {
            "file"
        }

        fn fetch(&self, _range: DateRange) -> Result<Vec<Segment>> {
            Ok(Vec::new())
        }
    }

    fn viewer() -> Viewer {
        let mut config = RoadsegConfig::default();
        config.logging.enabled = false;
        Viewer::new(config, Box::new(EmptySource))
    }

    #[test]
    fn unknown_path_is_404() {
        let resp = dispatch(&mut viewer(), &Method::Get, "/nope").unwrap();
        assert_eq!(resp.status_code(), StatusCode(404));
    }

    #[test]
    fn wrong_method_is_404() {
        let resp = dispatch(&mut viewer(), &Method::Post, "/api/layer").unwrap();
        assert_eq!(resp.status_code(), StatusCode(404));
    }

    #[test]
    fn index_is_html() {
        let resp = dispatch(&mut viewer(), &Method::Get, "/").unwrap();
        assert_eq!(resp.status_code(), StatusCode(200));
    }

    #[test]
    fn legend_and_config_answer_200() {
        let mut v = viewer();
        for url in ["/api/legend", "/api/config"] {
            let resp = dispatch(&mut v, &Method::Get, url).unwrap();
            assert_eq!(resp.status_code(), StatusCode(200), "{url}");
        }
    }
}
