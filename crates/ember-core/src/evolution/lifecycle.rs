//! Pattern lifecycle stages and the rules that move between them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::trends::Trends;

/// Patterns with fewer members are still emerging.
pub const EMERGING_MAX_MEMBERS: usize = 3;
/// Growth only counts below this size.
pub const GROWING_MAX_MEMBERS: usize = 15;
/// Trend magnitude needed for growth or decline.
pub const TREND_MAGNITUDE_THRESHOLD: f64 = 0.3;
pub const DORMANT_COHERENCE: f64 = 0.3;
pub const MATURE_COHERENCE: f64 = 0.6;
pub const STABLE_COHERENCE: f64 = 0.7;
pub const STABLE_MIN_AGE_DAYS: f64 = 30.0;

/// Lifecycle stage of a pattern.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LifecycleStage {
    /// Too few members to be meaningful.
    #[default]
    Emerging,
    /// Gaining members quickly.
    Growing,
    /// Coherent and established.
    Mature,
    /// Coherent over a long period.
    Stable,
    /// Losing coherence.
    Declining,
    /// Incoherent or no longer observed.
    Dormant,
}

impl LifecycleStage {
    /// Whether the stage counts as active growth or health.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Growing | Self::Mature | Self::Stable)
    }

    /// Whether the stage counts as decay.
    pub fn is_fading(&self) -> bool {
        matches!(self, Self::Declining | Self::Dormant)
    }

    /// Stage after an update, evaluated in priority order. Returns
    /// `current` when no rule applies.
    pub fn classify(
        current: LifecycleStage,
        member_count: usize,
        coherence: f64,
        trends: &Trends,
        age_days: f64,
    ) -> LifecycleStage {
        if member_count < EMERGING_MAX_MEMBERS {
            Self::Emerging
        } else if trends.size.is_increasing()
            && trends.size.magnitude > TREND_MAGNITUDE_THRESHOLD
            && member_count < GROWING_MAX_MEMBERS
        {
            Self::Growing
        } else if trends.coherence.is_decreasing()
            && trends.coherence.magnitude > TREND_MAGNITUDE_THRESHOLD
        {
            Self::Declining
        } else if coherence < DORMANT_COHERENCE {
            Self::Dormant
        } else if age_days > STABLE_MIN_AGE_DAYS && coherence > STABLE_COHERENCE {
            Self::Stable
        } else if coherence > MATURE_COHERENCE {
            Self::Mature
        } else {
            current
        }
    }
}

/// One recorded stage change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTransition {
    pub from: LifecycleStage,
    pub to: LifecycleStage,
    pub timestamp: DateTime<Utc>,
}

/// Stage history of a pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lifecycle {
    pub stage: LifecycleStage,
    pub first_seen: DateTime<Utc>,
    pub transitions: Vec<StageTransition>,
}

impl Lifecycle {
    pub fn new(first_seen: DateTime<Utc>) -> Self {
        Self {
            stage: LifecycleStage::Emerging,
            first_seen,
            transitions: Vec::new(),
        }
    }

    /// Days from first sighting to `latest`.
    pub fn age_days(&self, latest: DateTime<Utc>) -> f64 {
        (latest - self.first_seen).num_seconds().max(0) as f64 / 86_400.0
    }

    /// Move to `to`, recording the change. Returns the previous stage if
    /// the stage actually changed.
    pub fn transition(&mut self, to: LifecycleStage, at: DateTime<Utc>) -> Option<LifecycleStage> {
        if self.stage == to {
            return None;
        }
        let from = self.stage;
        self.transitions.push(StageTransition {
            from,
            to,
            timestamp: at,
        });
        self.stage = to;
        Some(from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::trends::{TrendData, TrendDirection};

    fn trend(direction: TrendDirection, magnitude: f64) -> TrendData {
        TrendData {
            direction,
            magnitude,
            ..Default::default()
        }
    }

    fn flat() -> Trends {
        Trends::default()
    }

    #[test]
    fn test_rule_priority() {
        use LifecycleStage::*;

        assert_eq!(LifecycleStage::classify(Mature, 2, 0.9, &flat(), 40.0), Emerging);

        let growing = Trends {
            size: trend(TrendDirection::Increasing, 0.5),
            coherence: trend(TrendDirection::Decreasing, 0.5),
        };
        assert_eq!(LifecycleStage::classify(Mature, 5, 0.9, &growing, 0.0), Growing);
        // Too big to count as growing
        assert_eq!(LifecycleStage::classify(Mature, 15, 0.9, &growing, 0.0), Declining);

        assert_eq!(LifecycleStage::classify(Mature, 5, 0.2, &flat(), 0.0), Dormant);
        assert_eq!(LifecycleStage::classify(Mature, 5, 0.8, &flat(), 31.0), Stable);
        assert_eq!(LifecycleStage::classify(Emerging, 5, 0.65, &flat(), 0.0), Mature);
        assert_eq!(LifecycleStage::classify(Growing, 5, 0.5, &flat(), 0.0), Growing);
    }

    #[test]
    fn test_transition_records_change() {
        let now = Utc::now();
        let mut lifecycle = Lifecycle::new(now);
        assert_eq!(lifecycle.transition(LifecycleStage::Emerging, now), None);
        assert_eq!(
            lifecycle.transition(LifecycleStage::Mature, now),
            Some(LifecycleStage::Emerging)
        );
        assert_eq!(lifecycle.transitions.len(), 1);
        assert_eq!(lifecycle.stage, LifecycleStage::Mature);
    }

    #[test]
    fn test_age() {
        let now = Utc::now();
        let lifecycle = Lifecycle::new(now - chrono::Duration::days(3));
        assert!((lifecycle.age_days(now) - 3.0).abs() < 1e-6);
    }
}
