//! Unified relevance scoring.
//!
//! Each candidate gets a breakdown of independent signals which are
//! combined with linear weights into one composite score.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Linear weights for the relevance signals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub text: f64,
    pub semantic: f64,
    pub dimension: f64,
    pub filter: f64,
    pub recency: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            text: 0.3,
            semantic: 0.4,
            dimension: 0.1,
            filter: 0.1,
            recency: 0.1,
        }
    }
}

impl ScoringWeights {
    /// Same weights with semantic similarity switched off.
    pub fn without_semantic(self) -> Self {
        Self {
            semantic: 0.0,
            ..self
        }
    }

    /// Validate that weights are non-negative and sum to approximately 1.0.
    pub fn validate(&self) -> Result<(), &'static str> {
        let all = [
            self.text,
            self.semantic,
            self.dimension,
            self.filter,
            self.recency,
        ];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err("Scoring weights must be non-negative");
        }
        if (all.iter().sum::<f64>() - 1.0).abs() > 0.01 {
            return Err("Scoring weights should sum to 1.0");
        }
        Ok(())
    }
}

/// Signal values for one candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Lexical match (0 without query text).
    pub text_match: f64,
    /// Cosine similarity; `None` when either side has no usable vector.
    pub semantic_similarity: Option<f64>,
    /// 1.0 when dimension predicates were supplied and satisfied.
    pub dimension_match: Option<f64>,
    /// Fraction of supplied structured filters satisfied.
    pub filter_relevance: Option<f64>,
    /// Exponential recency decay in (0, 1].
    pub recency: f64,
    /// Weighted combination of the above.
    pub composite: f64,
}

/// Combines signals into a composite score.
#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    weights: ScoringWeights,
    half_life_days: f64,
    now: DateTime<Utc>,
}

impl RelevanceScorer {
    pub fn new(weights: ScoringWeights, half_life_days: f64, now: DateTime<Utc>) -> Self {
        Self {
            weights,
            half_life_days,
            now,
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Recency of a timestamp: halves every `half_life_days`. Future
    /// timestamps score 1.
    pub fn recency(&self, timestamp: DateTime<Utc>) -> f64 {
        let age_days = (self.now - timestamp).num_seconds().max(0) as f64 / 86_400.0;
        0.5f64.powf(age_days / self.half_life_days)
    }

    /// Fill in `recency` and `composite` for a breakdown.
    pub fn score(&self, mut breakdown: ScoreBreakdown, timestamp: DateTime<Utc>) -> ScoreBreakdown {
        breakdown.recency = self.recency(timestamp);

        let w = &self.weights;
        let composite = breakdown.text_match * w.text
            + breakdown.semantic_similarity.unwrap_or(0.0).max(0.0) * w.semantic
            + breakdown.dimension_match.unwrap_or(0.0) * w.dimension
            + breakdown.filter_relevance.unwrap_or(0.0) * w.filter
            + breakdown.recency * w.recency;
        breakdown.composite = composite.clamp(0.0, 1.0);
        breakdown
    }
}
