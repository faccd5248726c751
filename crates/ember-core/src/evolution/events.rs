//! Evolution events emitted on lifecycle changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use super::lifecycle::LifecycleStage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EvolutionEventType {
    Birth,
    Growth,
    Merge,
    Split,
    Decline,
    Revival,
    Death,
}

impl EvolutionEventType {
    /// Event type for a stage transition.
    pub fn for_transition(from: LifecycleStage, to: LifecycleStage) -> Self {
        match to {
            LifecycleStage::Growing | LifecycleStage::Mature | LifecycleStage::Stable => {
                if from.is_fading() {
                    Self::Revival
                } else {
                    Self::Growth
                }
            }
            LifecycleStage::Declining | LifecycleStage::Emerging => Self::Decline,
            LifecycleStage::Dormant => Self::Death,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventSeverity {
    Minor,
    Moderate,
    Major,
    Critical,
}

impl EventSeverity {
    /// Severity of a metric change of the given magnitude.
    pub fn from_magnitude(change: f64) -> Self {
        let change = change.abs();
        if change > 0.6 {
            Self::Critical
        } else if change > 0.4 {
            Self::Major
        } else if change > 0.2 {
            Self::Moderate
        } else {
            Self::Minor
        }
    }
}

/// A notable change in a pattern's life.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionEvent {
    pub event_id: String,
    pub pattern_id: String,
    pub event_type: EvolutionEventType,
    pub severity: EventSeverity,
    pub timestamp: DateTime<Utc>,
    /// Stage before the event, if the pattern existed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_stage: Option<LifecycleStage>,
    pub to_stage: LifecycleStage,
    /// Patterns merged from or split into.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_patterns: Vec<String>,
    pub description: String,
}

impl EvolutionEvent {
    pub fn new(
        pattern_id: impl Into<String>,
        event_type: EvolutionEventType,
        severity: EventSeverity,
        timestamp: DateTime<Utc>,
        from_stage: Option<LifecycleStage>,
        to_stage: LifecycleStage,
    ) -> Self {
        let pattern_id = pattern_id.into();
        let description = match from_stage {
            Some(from) if from != to_stage => {
                format!("pattern {} {}: {} -> {}", pattern_id, event_type, from, to_stage)
            }
            _ => format!("pattern {} {} ({})", pattern_id, event_type, to_stage),
        };
        Self {
            event_id: Uuid::new_v4().to_string(),
            pattern_id,
            event_type,
            severity,
            timestamp,
            from_stage,
            to_stage,
            related_patterns: Vec::new(),
            description,
        }
    }

    pub fn with_related(mut self, related: Vec<String>) -> Self {
        self.related_patterns = related;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleStage::*;

    #[test]
    fn test_transition_event_types() {
        assert_eq!(
            EvolutionEventType::for_transition(Emerging, Growing),
            EvolutionEventType::Growth
        );
        assert_eq!(
            EvolutionEventType::for_transition(Dormant, Mature),
            EvolutionEventType::Revival
        );
        assert_eq!(
            EvolutionEventType::for_transition(Declining, Stable),
            EvolutionEventType::Revival
        );
        assert_eq!(
            EvolutionEventType::for_transition(Mature, Declining),
            EvolutionEventType::Decline
        );
        assert_eq!(
            EvolutionEventType::for_transition(Growing, Emerging),
            EvolutionEventType::Decline
        );
        assert_eq!(
            EvolutionEventType::for_transition(Declining, Dormant),
            EvolutionEventType::Death
        );
    }

    #[test]
    fn test_severity_bands() {
        assert_eq!(EventSeverity::from_magnitude(0.1), EventSeverity::Minor);
        assert_eq!(EventSeverity::from_magnitude(0.2), EventSeverity::Minor);
        assert_eq!(EventSeverity::from_magnitude(0.3), EventSeverity::Moderate);
        assert_eq!(EventSeverity::from_magnitude(-0.5), EventSeverity::Major);
        assert_eq!(EventSeverity::from_magnitude(0.61), EventSeverity::Critical);
        assert!(EventSeverity::Critical > EventSeverity::Minor);
    }

    #[test]
    fn test_event_serialization() {
        let event = EvolutionEvent::new(
            "p1",
            EvolutionEventType::Decline,
            EventSeverity::Moderate,
            Utc::now(),
            Some(Mature),
            Declining,
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "decline");
        assert_eq!(json["severity"], "moderate");
        assert_eq!(json["from_stage"], "mature");
        assert!(event.description.contains("mature -> declining"));
    }
}
