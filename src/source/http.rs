/// HTTP client for the dashboard backend's road segment endpoint.
///
/// Uses the synchronous `ureq` client. One request per load, no retries:
/// a failed request is reported to the caller, which decides what the user
/// sees.
use std::time::Duration;

use anyhow::{Context, Result};

use super::{DateRange, SegmentSource};
use crate::config::schema::BackendConfig;
use crate::segments::{self, Segment};

/// Path of the segment endpoint relative to the backend base URL.
const SEGMENTS_PATH: &str = "/api/road_segments";

/// Timeout for reachability probes, independent of the fetch timeout.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct HttpSource {
    base_url: String,
    timeout: Duration,
    session_cookie: Option<String>,
}

impl HttpSource {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            session_cookie: None,
        }
    }

    /// Build a source from the resolved `[backend]` config.
    pub fn from_config(config: &BackendConfig) -> Self {
        let mut source = Self::new(&config.base_url, Duration::from_millis(config.timeout_ms));
        if !config.session_cookie.is_empty() {
            source.session_cookie = Some(config.session_cookie.clone());
        }
        source
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of the segment endpoint.
    pub fn segments_url(&self) -> String {
        // "localhost" may resolve to ::1 first and stall when the backend
        // only binds IPv4.
        format!("{}{}", self.base_url, SEGMENTS_PATH).replace("://localhost", "://127.0.0.1")
    }

    /// Check that the backend answers at all.
    ///
    /// Returns the HTTP status of `GET /`; any status, including error
    /// statuses, counts as reachable.
    pub fn probe(&self) -> Result<u16> {
        let url = format!("{}/", self.base_url).replace("://localhost", "://127.0.0.1");
        match ureq::get(&url).timeout(PROBE_TIMEOUT).call() {
            Ok(resp) => Ok(resp.status()),
            Err(ureq::Error::Status(code, _)) => Ok(code),
            Err(e) => Err(e).with_context(|| format!("backend not reachable at {url}")),
        }
    }
}

impl SegmentSource for HttpSource {
    fn kind(&self) -> &'static str {
        "http"
    }

    fn fetch(&self, range: DateRange) -> Result<Vec<Segment>> {
        let url = self.segments_url();

        let mut request = ureq::get(&url).timeout(self.timeout);
        if range != DateRange::All {
            request = request.query("dateRange", range.as_query());
        }
        if let Some(cookie) = &self.session_cookie {
            request = request.set("Cookie", cookie);
        }

        let resp = match request.call() {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, _)) => {
                anyhow::bail!("HTTP error! status: {code} ({url})")
            }
            Err(e) => {
                return Err(e).with_context(|| format!("road segment request to {url} failed"));
            }
        };

        segments::read_segments(resp.into_reader())
            .with_context(|| format!("unexpected road segment response from {url}"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
