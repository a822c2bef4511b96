//! Fetch analytics: the JSONL fetch log and the reporter over it.
pub mod logger;
pub mod reporter;
