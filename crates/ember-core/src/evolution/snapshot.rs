//! Per-update observations of a pattern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::grouping::Pattern;

/// Metrics of a pattern at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub coherence: f64,
    pub member_count: usize,
    pub quality_signature: Vec<String>,
    pub theme_tags: Vec<String>,
}

/// New observation of a pattern, fed to the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternUpdate {
    pub pattern_id: String,
    pub timestamp: DateTime<Utc>,
    pub coherence: f64,
    pub member_ids: Vec<String>,
    #[serde(default)]
    pub quality_signature: Vec<String>,
    #[serde(default)]
    pub theme_tags: Vec<String>,
}

impl PatternUpdate {
    pub fn new(
        pattern_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        coherence: f64,
        member_ids: Vec<String>,
    ) -> Self {
        Self {
            pattern_id: pattern_id.into(),
            timestamp,
            coherence,
            member_ids,
            quality_signature: Vec::new(),
            theme_tags: Vec::new(),
        }
    }

    /// Observation of a freshly clustered pattern; keywords become theme
    /// tags.
    pub fn from_pattern(pattern: &Pattern, timestamp: DateTime<Utc>) -> Self {
        Self {
            pattern_id: pattern.id.clone(),
            timestamp,
            coherence: pattern.coherence,
            member_ids: pattern.member_ids.clone(),
            quality_signature: pattern.quality_signature.clone(),
            theme_tags: pattern.keywords.clone(),
        }
    }

    pub fn with_theme_tags(mut self, tags: Vec<String>) -> Self {
        self.theme_tags = tags;
        self
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            timestamp: self.timestamp,
            coherence: self.coherence,
            member_count: self.member_ids.len(),
            quality_signature: self.quality_signature.clone(),
            theme_tags: self.theme_tags.clone(),
        }
    }
}
