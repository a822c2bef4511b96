//! Road segment aggregation for a mapping dashboard.
//!
//! Segments fetched from the dashboard backend are folded into contiguous
//! road sections, aggregated, colored by issue density, and handed to a
//! renderer as one polyline per segment.

pub mod analytics;
pub mod cli;
pub mod config;
pub mod layer;
pub mod loader;
pub mod notify;
pub mod segments;
pub mod source;
pub mod web;
