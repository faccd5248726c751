//! Soft structured filters scored as the fraction satisfied.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::traits::TemporalParser;
use crate::types::{Experience, SearchFilters, TimeFilter};

/// Evaluates a request's structured filters against experiences.
///
/// A time phrase the parser cannot resolve is dropped from the count rather
/// than failing the request.
#[derive(Debug, Clone)]
pub struct FilterEvaluator<'a> {
    filters: &'a SearchFilters,
    range: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl<'a> FilterEvaluator<'a> {
    pub fn new(filters: &'a SearchFilters, temporal: Option<&dyn TemporalParser>) -> Self {
        let range = match &filters.time {
            Some(TimeFilter::Range { start, end }) => Some((*start, *end)),
            Some(TimeFilter::Phrase(phrase)) => {
                let parsed = temporal.and_then(|p| p.parse_temporal(phrase));
                if parsed.is_none() {
                    debug!(phrase = %phrase, "Time phrase not understood, ignoring");
                }
                parsed
            }
            None => None,
        };
        Self { filters, range }
    }

    /// Number of filters that take part in scoring.
    pub fn supplied(&self) -> usize {
        [
            self.filters.experiencer.is_some(),
            self.filters.perspective.is_some(),
            self.filters.processing.is_some(),
            self.range.is_some(),
            self.filters.reflects.is_some(),
        ]
        .iter()
        .filter(|s| **s)
        .count()
    }

    /// Fraction of supplied filters `experience` satisfies, or `None` when
    /// none were supplied.
    pub fn relevance(&self, experience: &Experience) -> Option<f64> {
        let supplied = self.supplied();
        if supplied == 0 {
            return None;
        }

        let mut satisfied = 0usize;
        if let Some(want) = &self.filters.experiencer {
            satisfied += field_matches(experience.experiencer.as_deref(), want) as usize;
        }
        if let Some(want) = &self.filters.perspective {
            satisfied += field_matches(experience.perspective.as_deref(), want) as usize;
        }
        if let Some(want) = &self.filters.processing {
            satisfied += field_matches(experience.processing.as_deref(), want) as usize;
        }
        if let Some((start, end)) = self.range {
            let ts = experience.timestamp();
            satisfied += (ts >= start && ts <= end) as usize;
        }
        if let Some(target) = &self.filters.reflects {
            satisfied += experience.reflects.iter().any(|id| id == target) as usize;
        }

        Some(satisfied as f64 / supplied as f64)
    }
}

fn field_matches(value: Option<&str>, want: &str) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case(want.trim()))
}
