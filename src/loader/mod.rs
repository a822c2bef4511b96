//! Explicit map state for segment layer loads.
//!
//! The state object owns everything a page would otherwise keep in globals:
//! the active filter, the rendered layer, the busy flag, and queued
//! notifications. A load is split into [`MapState::begin`] and
//! [`MapState::complete`] so callers that fetch elsewhere can still drive
//! it; [`MapState::reload`] does both around a [`SegmentSource`].
//!
//! Loads are never retried or cancelled. A failed load leaves the previous
//! layer exactly as it was.

use std::time::Instant;

use anyhow::Result;
use serde::Serialize;

use crate::analytics::logger::FetchLogEntry;
use crate::layer::{LayerSettings, SegmentLayer};
use crate::notify::Notification;
use crate::segments::Segment;
use crate::source::{DateRange, SegmentSource};

/// Identifies one started load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    id: u64,
    range: DateRange,
}

impl Ticket {
    pub fn range(&self) -> DateRange {
        self.range
    }
}

/// What happened to a load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReloadOutcome {
    /// A new layer replaced the old one.
    Loaded { segments: usize, groups: usize },
    /// The fetch failed; the previous layer is untouched.
    Failed,
    /// Another load was in flight, nothing was started.
    Busy,
    /// The completion did not belong to the in-flight load and was dropped.
    Stale,
}

#[derive(Debug)]
pub struct MapState {
    date_range: DateRange,
    settings: LayerSettings,
    layer: Option<SegmentLayer>,
    in_flight: Option<Ticket>,
    next_ticket: u64,
    notifications: Vec<Notification>,
}

impl MapState {
    pub fn new(settings: LayerSettings, date_range: DateRange) -> Self {
        Self {
            date_range,
            settings,
            layer: None,
            in_flight: None,
            next_ticket: 0,
            notifications: Vec::new(),
        }
    }

    /// The filter of the most recently started load.
    pub fn date_range(&self) -> DateRange {
        self.date_range
    }

    pub fn layer(&self) -> Option<&SegmentLayer> {
        self.layer.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Start a load for `range`.
    ///
    /// Returns `None` while another load is in flight.
    pub fn begin(&mut self, range: DateRange) -> Option<Ticket> {
        if self.in_flight.is_some() {
            return None;
        }
        let ticket = Ticket {
            id: self.next_ticket,
            range,
        };
        self.next_ticket += 1;
        self.date_range = range;
        self.in_flight = Some(ticket);
        Some(ticket)
    }

    /// Finish the load identified by `ticket` with the fetch result.
    ///
    /// On success the layer is rebuilt from scratch and replaces the old
    /// one. On failure the old layer stays and an error notification is
    /// queued.
    pub fn complete(&mut self, ticket: Ticket, result: Result<Vec<Segment>>) -> ReloadOutcome {
        if self.in_flight != Some(ticket) {
            return ReloadOutcome::Stale;
        }
        self.in_flight = None;

        match result {
            Ok(segments) => {
                let layer = SegmentLayer::build(&segments, ticket.range, &self.settings);
                if layer.is_empty() {
                    self.notifications.push(Notification::warning(format!(
                        "No road segments for date range '{}'",
                        ticket.range
                    )));
                }
                let outcome = ReloadOutcome::Loaded {
                    segments: layer.segment_count,
                    groups: layer.groups.len(),
                };
                self.layer = Some(layer);
                outcome
            }
            Err(error) => {
                self.notifications
                    .push(Notification::error("Error loading road segments", &error));
                ReloadOutcome::Failed
            }
        }
    }

    /// Begin, fetch from `source`, and complete in one call.
    ///
    /// Returns the outcome plus a fetch log entry for it (`None` when the
    /// state was busy and nothing was fetched). A busy refusal queues an
    /// info notification.
    pub fn reload(
        &mut self,
        source: &dyn SegmentSource,
        range: DateRange,
    ) -> (ReloadOutcome, Option<FetchLogEntry>) {
        let Some(ticket) = self.begin(range) else {
            self.notifications
                .push(Notification::info("Road segments are still loading"));
            return (ReloadOutcome::Busy, None);
        };

        let started = Instant::now();
        let result = source.fetch(range);
        let duration_ms = started.elapsed().as_millis() as u64;

        let failure = match &result {
            Ok(_) => None,
            Err(e) => Some(FetchLogEntry::failure(range, source.kind(), duration_ms, e)),
        };

        let outcome = self.complete(ticket, result);
        let log_entry = match (&outcome, failure) {
            (_, Some(entry)) => Some(entry),
            (ReloadOutcome::Loaded { segments, groups }, None) => Some(FetchLogEntry::success(
                range,
                source.kind(),
                *segments,
                *groups,
                duration_ms,
            )),
            _ => None,
        };

        (outcome, log_entry)
    }

    /// Take all queued notifications, oldest first.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
