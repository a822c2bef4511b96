/// Loader tests against a live local backend.
///
/// Each test starts a `tiny_http` server on an ephemeral port in a
/// background thread, answers a scripted list of responses, and reports the
/// request URLs it saw.
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use roadseg::layer::LayerSettings;
use roadseg::loader::{MapState, ReloadOutcome};
use roadseg::notify::Level;
use roadseg::source::{DateRange, FileSource, HttpSource, SegmentSource};
use tiny_http::{Header, Response, Server};

const TWO_SECTIONS: &str = r#"[
    {"start_latitude": 10.0, "start_longitude": 20.0,
     "end_latitude": 10.001, "end_longitude": 20.0,
     "start_time": "2024-05-01T08:00:00", "end_time": "2024-05-01T08:00:10",
     "issue_count": 0, "distance": 200.0, "average_speed": 10.0},
    {"start_latitude": 10.001, "start_longitude": 20.0,
     "end_latitude": 10.002, "end_longitude": 20.0,
     "start_time": "2024-05-01T08:00:11", "end_time": "2024-05-01T08:00:20",
     "issue_count": 0, "distance": 200.0, "average_speed": 10.0},
    {"start_latitude": 11.0, "start_longitude": 21.0,
     "end_latitude": 11.001, "end_longitude": 21.0,
     "start_time": "2024-05-01T08:00:21", "end_time": "2024-05-01T08:00:30",
     "issue_count": 7, "distance": 1000.0, "average_speed": 12.0}
]"#;

/// Serve `responses` in order, then stop. Returns the base URL and a
/// receiver of request URLs.
fn scripted_backend(responses: Vec<(u16, &'static str)>) -> (String, mpsc::Receiver<String>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for (status, body) in responses {
            let Ok(request) = server.recv() else { return };
            let _ = tx.send(request.url().to_string());
            let resp = Response::from_string(body)
                .with_status_code(status)
                .with_header(
                    Header::from_bytes("Content-Type", "application/json").unwrap(),
                );
            let _ = request.respond(resp);
        }
    });

    (format!("http://{addr}"), rx)
}

fn source(base_url: &str) -> HttpSource {
    HttpSource::new(base_url, Duration::from_secs(5))
}

#[test]
fn http_load_builds_layer_and_sends_date_range() {
    let (base, urls) = scripted_backend(vec![(200, TWO_SECTIONS)]);
    let mut state = MapState::new(LayerSettings::default(), DateRange::All);

    let (outcome, entry) = state.reload(&source(&base), DateRange::Week);

    assert_eq!(
        outcome,
        ReloadOutcome::Loaded {
            segments: 3,
            groups: 2
        }
    );
    assert_eq!(
        urls.recv_timeout(Duration::from_secs(5)).unwrap(),
        "/api/road_segments?dateRange=week"
    );

    let layer = state.layer().unwrap();
    let colors: Vec<&str> = layer.polylines.iter().map(|p| p.color).collect();
    assert_eq!(colors, ["#00FF00", "#00FF00", "#FF0000"]);

    let entry = entry.unwrap();
    assert!(entry.success);
    assert_eq!(entry.source, "http");
    assert_eq!(entry.group_count, 2);
}

#[test]
fn all_range_sends_no_query() {
    let (base, urls) = scripted_backend(vec![(200, "[]")]);
    let mut state = MapState::new(LayerSettings::default(), DateRange::All);

    let (outcome, _) = state.reload(&source(&base), DateRange::All);

    assert_eq!(
        outcome,
        ReloadOutcome::Loaded {
            segments: 0,
            groups: 0
        }
    );
    assert_eq!(
        urls.recv_timeout(Duration::from_secs(5)).unwrap(),
        "/api/road_segments"
    );
    assert_eq!(state.drain_notifications()[0].level, Level::Warning);
}

#[test]
fn server_error_keeps_previous_layer() {
    let (base, _urls) = scripted_backend(vec![
        (200, TWO_SECTIONS),
        (500, r#"{"error": "database unavailable"}"#),
    ]);
    let src = source(&base);
    let mut state = MapState::new(LayerSettings::default(), DateRange::All);

    state.reload(&src, DateRange::All);
    let before = state.layer().cloned().unwrap();
    assert!(state.drain_notifications().is_empty());

    let (outcome, entry) = state.reload(&src, DateRange::Today);

    assert_eq!(outcome, ReloadOutcome::Failed);
    assert_eq!(state.layer(), Some(&before));
    assert!(!state.is_busy());

    let notes = state.drain_notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, Level::Error);
    assert_eq!(notes[0].message, "Error loading road segments");
    assert!(
        notes[0]
            .detail
            .as_deref()
            .unwrap_or_default()
            .contains("status: 500")
    );

    let entry = entry.unwrap();
    assert!(!entry.success);
    assert!(entry.error.unwrap().contains("500"));
}

#[test]
fn malformed_body_fails_like_a_network_error() {
    let (base, _urls) = scripted_backend(vec![(200, r#"{"not": "an array"}"#)]);
    let mut state = MapState::new(LayerSettings::default(), DateRange::All);

    let (outcome, _) = state.reload(&source(&base), DateRange::All);

    assert_eq!(outcome, ReloadOutcome::Failed);
    assert!(state.layer().is_none());
    assert_eq!(state.drain_notifications()[0].level, Level::Error);
}

#[test]
fn unreachable_backend_fails_without_panicking() {
    // Bind and drop to get a port nobody listens on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let src = HttpSource::new(&format!("http://{addr}"), Duration::from_secs(2));
    let mut state = MapState::new(LayerSettings::default(), DateRange::All);

    let (outcome, _) = state.reload(&src, DateRange::Month);
    assert_eq!(outcome, ReloadOutcome::Failed);
    assert_eq!(state.date_range(), DateRange::Month);
}

#[test]
fn file_source_feeds_the_same_loader() {
    let path = std::env::temp_dir().join(format!("roadseg-loader-{}.json", std::process::id()));
    std::fs::write(&path, TWO_SECTIONS).unwrap();

    let src = FileSource::new(&path);
    assert_eq!(src.kind(), "file");

    let mut state = MapState::new(LayerSettings::default(), DateRange::All);
    let (outcome, _) = state.reload(&src, DateRange::All);
    let _ = std::fs::remove_file(&path);

    assert_eq!(
        outcome,
        ReloadOutcome::Loaded {
            segments: 3,
            groups: 2
        }
    );
    assert_eq!(state.layer().unwrap().sections.len(), 2);
}
