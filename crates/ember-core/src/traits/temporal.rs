//! Natural-language date range collaborator.

use chrono::{DateTime, Utc};

/// Resolves phrases like "last week" into an inclusive range.
pub trait TemporalParser: Send + Sync {
    fn parse_temporal(&self, text: &str) -> Option<(DateTime<Utc>, DateTime<Utc>)>;
}
