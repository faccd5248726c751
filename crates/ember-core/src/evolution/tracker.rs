//! Pattern evolution tracking across clustering passes.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EvolutionConfig;
use crate::error::EmberResult;
use crate::grouping::ClusterOutcome;

use super::bus::EvolutionEventBus;
use super::events::{EventSeverity, EvolutionEvent, EvolutionEventType};
use super::lifecycle::{Lifecycle, LifecycleStage};
use super::prediction::{predict_next, Prediction};
use super::snapshot::{PatternUpdate, Snapshot};
use super::stability::{assess_stability, StabilityMetrics};
use super::trends::{compute_trend, Trends};

/// Everything known about one pattern's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternEvolution {
    pub pattern_id: String,
    pub lifecycle: Lifecycle,
    /// Oldest first, bounded by the configured history limit.
    pub history: Vec<Snapshot>,
    pub trends: Trends,
    pub stability: StabilityMetrics,
    /// Members at the latest update.
    pub last_members: Vec<String>,
}

impl PatternEvolution {
    fn new(update: &PatternUpdate) -> Self {
        Self {
            pattern_id: update.pattern_id.clone(),
            lifecycle: Lifecycle::new(update.timestamp),
            history: Vec::new(),
            trends: Trends::default(),
            stability: StabilityMetrics::default(),
            last_members: Vec::new(),
        }
    }

    pub fn stage(&self) -> LifecycleStage {
        self.lifecycle.stage
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.history.last()
    }

    /// Days from first sighting to the latest snapshot.
    pub fn age_days(&self) -> f64 {
        self.latest()
            .map(|s| self.lifecycle.age_days(s.timestamp))
            .unwrap_or(0.0)
    }

    fn record(&mut self, update: &PatternUpdate, config: &EvolutionConfig) {
        self.history.push(update.snapshot());
        if self.history.len() > config.history_limit {
            let excess = self.history.len() - config.history_limit;
            self.history.drain(..excess);
        }
        self.last_members = update.member_ids.clone();

        let coherence: Vec<f64> = self.history.iter().map(|s| s.coherence).collect();
        let sizes: Vec<f64> = self.history.iter().map(|s| s.member_count as f64).collect();
        self.trends = Trends {
            coherence: compute_trend(&coherence, config.trend_window),
            size: compute_trend(&sizes, config.trend_window),
        };
        self.stability =
            assess_stability(&self.history, &self.trends.coherence, config.trend_window);
    }

    /// Re-evaluate the stage against the latest snapshot.
    fn reclassify(&mut self, at: DateTime<Utc>) -> Option<LifecycleStage> {
        let (coherence, members) = self.latest().map(|s| (s.coherence, s.member_count))?;
        let target = LifecycleStage::classify(
            self.lifecycle.stage,
            members,
            coherence,
            &self.trends,
            self.age_days(),
        );
        self.lifecycle.transition(target, at)
    }

    /// Absolute coherence change across the trend window.
    fn coherence_change(&self, window: usize) -> f64 {
        let recent = &self.history[self.history.len().saturating_sub(window)..];
        match (recent.first(), recent.last()) {
            (Some(first), Some(last)) => (last.coherence - first.coherence).abs(),
            _ => 0.0,
        }
    }

    /// Relative member-count change across the trend window.
    fn size_change(&self, window: usize) -> f64 {
        let recent = &self.history[self.history.len().saturating_sub(window)..];
        match (recent.first(), recent.last()) {
            (Some(first), Some(last)) => {
                relative_change(first.member_count, last.member_count)
            }
            _ => 0.0,
        }
    }

    fn transition_severity(
        &self,
        event_type: EvolutionEventType,
        to: LifecycleStage,
        window: usize,
    ) -> EventSeverity {
        let coherence = self.coherence_change(window);
        let size = self.size_change(window);
        let change = match event_type {
            EvolutionEventType::Growth => coherence.max(size),
            EvolutionEventType::Decline if to == LifecycleStage::Emerging => coherence.max(size),
            EvolutionEventType::Decline
            | EvolutionEventType::Death
            | EvolutionEventType::Revival => coherence,
            EvolutionEventType::Birth
            | EvolutionEventType::Merge
            | EvolutionEventType::Split => size,
        };
        EventSeverity::from_magnitude(change)
    }
}

fn relative_change(from: usize, to: usize) -> f64 {
    (to as f64 - from as f64).abs() / from.max(1) as f64
}

fn overlap(a: &[String], b: &HashSet<&str>) -> usize {
    a.iter().filter(|id| b.contains(id.as_str())).count()
}

/// Tracks lifecycle, trends and stability of patterns over time.
#[derive(Default)]
pub struct EvolutionTracker {
    patterns: HashMap<String, PatternEvolution>,
    config: EvolutionConfig,
    bus: Option<EvolutionEventBus>,
}

impl EvolutionTracker {
    /// Create a tracker. Fails when `config` does not validate.
    pub fn new(config: EvolutionConfig) -> EmberResult<Self> {
        config.validate()?;
        Ok(Self {
            patterns: HashMap::new(),
            config,
            bus: None,
        })
    }

    /// Also broadcast events on `bus`.
    pub fn with_bus(mut self, bus: EvolutionEventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Evolution record of a pattern.
    pub fn evolution(&self, pattern_id: &str) -> Option<&PatternEvolution> {
        self.patterns.get(pattern_id)
    }

    /// Predicted next stage of a pattern.
    pub fn predict(&self, pattern_id: &str) -> Option<Prediction> {
        self.patterns
            .get(pattern_id)
            .map(|evolution| predict_next(evolution, self.config.prediction_saturation))
    }

    /// Feed a clustering pass; every pattern in it counts as current.
    pub fn observe(&mut self, outcome: &ClusterOutcome, at: DateTime<Utc>) -> Vec<EvolutionEvent> {
        let updates: Vec<PatternUpdate> = outcome
            .patterns
            .iter()
            .map(|p| PatternUpdate::from_pattern(p, at))
            .collect();
        let current: Vec<String> = outcome.patterns.iter().map(|p| p.id.clone()).collect();
        self.track_evolution(&updates, &current)
    }

    /// Apply pattern updates and return the resulting events.
    ///
    /// Tracked patterns absent from both `updates` and `current_patterns`
    /// go dormant.
    pub fn track_evolution(
        &mut self,
        updates: &[PatternUpdate],
        current_patterns: &[String],
    ) -> Vec<EvolutionEvent> {
        let window = self.config.trend_window;
        let previous: HashMap<String, Vec<String>> = self
            .patterns
            .iter()
            .filter(|(_, e)| !e.last_members.is_empty())
            .map(|(id, e)| (id.clone(), e.last_members.clone()))
            .collect();
        let mut events = Vec::new();

        for update in updates {
            let members: HashSet<&str> = update.member_ids.iter().map(String::as_str).collect();

            if let Some(evolution) = self.patterns.get_mut(&update.pattern_id) {
                evolution.record(update, &self.config);
                if let Some(from) = evolution.reclassify(update.timestamp) {
                    let to = evolution.stage();
                    let event_type = EvolutionEventType::for_transition(from, to);
                    let severity = evolution.transition_severity(event_type, to, window);
                    events.push(EvolutionEvent::new(
                        &update.pattern_id,
                        event_type,
                        severity,
                        update.timestamp,
                        Some(from),
                        to,
                    ));
                }
                continue;
            }

            let mut sources: Vec<&String> = previous
                .iter()
                .filter(|(id, last)| {
                    **id != update.pattern_id && overlap(last, &members) * 2 >= last.len()
                })
                .map(|(id, _)| id)
                .collect();
            sources.sort();

            let mut evolution = PatternEvolution::new(update);
            evolution.record(update, &self.config);
            evolution.reclassify(update.timestamp);

            let event = if sources.len() >= 2 {
                let largest = sources
                    .iter()
                    .filter_map(|id| previous.get(*id).map(Vec::len))
                    .max()
                    .unwrap_or(0);
                let severity =
                    EventSeverity::from_magnitude(relative_change(largest, members.len()));
                EvolutionEvent::new(
                    &update.pattern_id,
                    EvolutionEventType::Merge,
                    severity,
                    update.timestamp,
                    None,
                    evolution.stage(),
                )
                .with_related(sources.into_iter().cloned().collect())
            } else {
                EvolutionEvent::new(
                    &update.pattern_id,
                    EvolutionEventType::Birth,
                    evolution.transition_severity(
                        EvolutionEventType::Birth,
                        evolution.stage(),
                        window,
                    ),
                    update.timestamp,
                    None,
                    evolution.stage(),
                )
            };
            events.push(event);
            self.patterns.insert(update.pattern_id.clone(), evolution);
        }

        events.extend(self.detect_splits(&previous, updates));
        events.extend(self.retire_missing(updates, current_patterns));

        for event in &events {
            debug!(
                pattern_id = %event.pattern_id,
                event_type = %event.event_type,
                severity = %event.severity,
                "Pattern evolution event"
            );
            if let Some(bus) = &self.bus {
                bus.emit(event.clone());
            }
        }
        info!(
            updates = updates.len(),
            tracked = self.patterns.len(),
            events = events.len(),
            "Evolution tracked"
        );
        events
    }

    /// Tracked patterns whose previous members are now spread across two or
    /// more other patterns, each holding at least a third of them.
    fn detect_splits(
        &self,
        previous: &HashMap<String, Vec<String>>,
        updates: &[PatternUpdate],
    ) -> Vec<EvolutionEvent> {
        let mut ids: Vec<&String> = previous.keys().collect();
        ids.sort();

        let mut events = Vec::new();
        for id in ids {
            let last = &previous[id];
            let mut targets: Vec<String> = updates
                .iter()
                .filter(|u| &u.pattern_id != id)
                .filter(|u| {
                    let members: HashSet<&str> = u.member_ids.iter().map(String::as_str).collect();
                    overlap(last, &members) * 3 >= last.len()
                })
                .map(|u| u.pattern_id.clone())
                .collect();
            targets.sort();
            targets.dedup();
            if targets.len() < 2 {
                continue;
            }

            let Some(evolution) = self.patterns.get(id) else {
                continue;
            };
            let own: Option<&PatternUpdate> = updates.iter().rev().find(|u| &u.pattern_id == id);
            let retained = own.map_or(0, |u| {
                let members: HashSet<&str> = u.member_ids.iter().map(String::as_str).collect();
                overlap(last, &members)
            });
            let change = 1.0 - retained as f64 / last.len() as f64;
            let at = updates
                .iter()
                .map(|u| u.timestamp)
                .max()
                .unwrap_or_else(Utc::now);

            events.push(
                EvolutionEvent::new(
                    id,
                    EvolutionEventType::Split,
                    EventSeverity::from_magnitude(change),
                    at,
                    Some(evolution.stage()),
                    evolution.stage(),
                )
                .with_related(targets),
            );
        }
        events
    }

    /// Send tracked patterns that are no longer current to dormant.
    fn retire_missing(
        &mut self,
        updates: &[PatternUpdate],
        current_patterns: &[String],
    ) -> Vec<EvolutionEvent> {
        let current: HashSet<&str> = current_patterns
            .iter()
            .map(String::as_str)
            .chain(updates.iter().map(|u| u.pattern_id.as_str()))
            .collect();
        let at = updates
            .iter()
            .map(|u| u.timestamp)
            .max()
            .unwrap_or_else(Utc::now);

        let mut missing: Vec<&String> = self
            .patterns
            .keys()
            .filter(|id| !current.contains(id.as_str()))
            .collect();
        missing.sort();
        let missing: Vec<String> = missing.into_iter().cloned().collect();

        let mut events = Vec::new();
        for id in missing {
            let Some(evolution) = self.patterns.get_mut(&id) else {
                continue;
            };
            evolution.last_members.clear();
            if let Some(from) = evolution.lifecycle.transition(LifecycleStage::Dormant, at) {
                events.push(EvolutionEvent::new(
                    &id,
                    EvolutionEventType::Death,
                    EventSeverity::Critical,
                    at,
                    Some(from),
                    LifecycleStage::Dormant,
                ));
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn members(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn update(id: &str, day: i64, coherence: f64, ids: &[&str]) -> PatternUpdate {
        let base = Utc::now() - Duration::days(60);
        PatternUpdate::new(id, base + Duration::days(day), coherence, members(ids))
    }

    const FIVE: [&str; 5] = ["a", "b", "c", "d", "e"];

    #[test]
    fn test_first_update_is_birth() {
        let mut tracker = EvolutionTracker::default();
        let events = tracker.track_evolution(&[update("p", 0, 0.9, &FIVE)], &[]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EvolutionEventType::Birth);
        assert_eq!(events[0].from_stage, None);

        let evolution = tracker.evolution("p").unwrap();
        assert_eq!(evolution.stage(), LifecycleStage::Mature);
        assert_eq!(evolution.history.len(), 1);
        assert_eq!(evolution.lifecycle.transitions[0].from, LifecycleStage::Emerging);
    }

    #[test]
    fn test_small_pattern_stays_emerging() {
        let mut tracker = EvolutionTracker::default();
        tracker.track_evolution(&[update("p", 0, 0.9, &["a", "b"])], &[]);
        assert_eq!(tracker.evolution("p").unwrap().stage(), LifecycleStage::Emerging);
    }

    #[test]
    fn test_declining_coherence() {
        let mut tracker = EvolutionTracker::default();
        let mut events = Vec::new();
        for (day, coherence) in [0.9, 0.85, 0.6, 0.4].into_iter().enumerate() {
            events.extend(
                tracker.track_evolution(&[update("p", day as i64, coherence, &FIVE)], &[]),
            );
        }

        let evolution = tracker.evolution("p").unwrap();
        assert_eq!(evolution.stage(), LifecycleStage::Declining);
        assert!(evolution.trends.coherence.is_decreasing());

        let decline = events
            .iter()
            .find(|e| e.event_type == EvolutionEventType::Decline)
            .unwrap();
        assert!(matches!(
            decline.severity,
            EventSeverity::Moderate | EventSeverity::Major
        ));
        assert_eq!(decline.from_stage, Some(LifecycleStage::Mature));
    }

    #[test]
    fn test_history_is_bounded() {
        let mut tracker = EvolutionTracker::new(EvolutionConfig {
            history_limit: 5,
            ..Default::default()
        })
        .unwrap();
        for day in 0..12 {
            tracker.track_evolution(&[update("p", day, 0.8, &FIVE)], &[]);
        }
        let evolution = tracker.evolution("p").unwrap();
        assert_eq!(evolution.history.len(), 5);
        assert!((evolution.age_days() - 11.0).abs() < 1e-6);
    }

    #[test]
    fn test_history_limit_must_keep_snapshots() {
        let result = EvolutionTracker::new(EvolutionConfig {
            history_limit: 0,
            ..Default::default()
        });
        let err = result.err().unwrap();
        assert!(err.to_string().contains("evolution.history_limit"));
    }

    #[test]
    fn test_disappearance_emits_death_once() {
        let mut tracker = EvolutionTracker::default();
        tracker.track_evolution(&[update("p", 0, 0.9, &FIVE)], &["p".to_string()]);

        let events = tracker.track_evolution(&[], &[]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EvolutionEventType::Death);
        assert_eq!(events[0].severity, EventSeverity::Critical);
        assert_eq!(tracker.evolution("p").unwrap().stage(), LifecycleStage::Dormant);

        assert!(tracker.track_evolution(&[], &[]).is_empty());
    }

    #[test]
    fn test_revival_after_dormancy() {
        let mut tracker = EvolutionTracker::default();
        tracker.track_evolution(&[update("p", 0, 0.9, &FIVE)], &[]);
        tracker.track_evolution(&[], &[]);

        let events = tracker.track_evolution(&[update("p", 2, 0.9, &FIVE)], &[]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EvolutionEventType::Revival);
    }

    #[test]
    fn test_merge() {
        let mut tracker = EvolutionTracker::default();
        tracker.track_evolution(
            &[
                update("p1", 0, 0.9, &["a", "b", "c"]),
                update("p2", 0, 0.9, &["d", "e", "f"]),
            ],
            &[],
        );

        let events =
            tracker.track_evolution(&[update("p3", 1, 0.8, &["a", "b", "c", "d", "e", "f"])], &[]);
        let merge = events
            .iter()
            .find(|e| e.event_type == EvolutionEventType::Merge)
            .unwrap();
        assert_eq!(merge.pattern_id, "p3");
        assert_eq!(merge.related_patterns, vec!["p1", "p2"]);
        assert_eq!(
            events
                .iter()
                .filter(|e| e.event_type == EvolutionEventType::Death)
                .count(),
            2
        );
    }

    #[test]
    fn test_split() {
        let mut tracker = EvolutionTracker::default();
        tracker.track_evolution(&[update("p1", 0, 0.9, &["a", "b", "c", "d", "e", "f"])], &[]);

        let events = tracker.track_evolution(
            &[
                update("p2", 1, 0.9, &["a", "b", "c"]),
                update("p3", 1, 0.9, &["d", "e", "f"]),
            ],
            &[],
        );
        let split = events
            .iter()
            .find(|e| e.event_type == EvolutionEventType::Split)
            .unwrap();
        assert_eq!(split.pattern_id, "p1");
        assert_eq!(split.related_patterns, vec!["p2", "p3"]);
        assert_eq!(split.severity, EventSeverity::Critical);
        assert!(events
            .iter()
            .any(|e| e.pattern_id == "p2" && e.event_type == EvolutionEventType::Birth));
    }

    #[test]
    fn test_predict_declining_pattern() {
        let mut tracker = EvolutionTracker::default();
        for (day, coherence) in [0.9, 0.8, 0.7, 0.6].into_iter().enumerate() {
            tracker.track_evolution(&[update("p", day as i64, coherence, &FIVE)], &[]);
        }
        let prediction = tracker.predict("p").unwrap();
        assert_eq!(prediction.current_stage, LifecycleStage::Declining);
        assert_eq!(prediction.predicted_stage, LifecycleStage::Dormant);
        // 0.6 -> 0.3 at -0.1 per daily snapshot
        assert!((prediction.days_to_transition.unwrap() - 3.0).abs() < 1e-6);
        // Perfect fit, 4 of 20 snapshots
        assert!((prediction.confidence - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_mild_decline_predicts_declining_before_dormant() {
        let mut tracker = EvolutionTracker::default();
        for (day, coherence) in [0.9, 0.88, 0.86, 0.84].into_iter().enumerate() {
            tracker.track_evolution(&[update("p", day as i64, coherence, &FIVE)], &[]);
        }
        let prediction = tracker.predict("p").unwrap();
        assert_eq!(prediction.current_stage, LifecycleStage::Mature);
        assert_eq!(prediction.predicted_stage, LifecycleStage::Declining);
        // 0.84 -> 0.6 at -0.02 per daily snapshot
        assert!((prediction.days_to_transition.unwrap() - 12.0).abs() < 1e-3);
    }

    #[test]
    fn test_low_coherence_predicts_dormant() {
        let mut tracker = EvolutionTracker::default();
        for (day, coherence) in [0.9, 0.62, 0.45, 0.34].into_iter().enumerate() {
            tracker.track_evolution(&[update("p", day as i64, coherence, &FIVE)], &[]);
        }
        let evolution = tracker.evolution("p").unwrap();
        assert_eq!(evolution.stage(), LifecycleStage::Declining);
        let prediction = tracker.predict("p").unwrap();
        assert_eq!(prediction.predicted_stage, LifecycleStage::Dormant);
    }

    #[test]
    fn test_unknown_pattern() {
        let tracker = EvolutionTracker::default();
        assert!(tracker.evolution("nope").is_none());
        assert!(tracker.predict("nope").is_none());
    }

    #[tokio::test]
    async fn test_events_are_broadcast() {
        let bus = EvolutionEventBus::new();
        let mut subscriber = bus.subscribe();
        let mut tracker = EvolutionTracker::default().with_bus(bus);
        tracker.track_evolution(&[update("p", 0, 0.9, &FIVE)], &[]);
        let event = subscriber.recv().await.unwrap();
        assert_eq!(event.event_type, EvolutionEventType::Birth);
    }
}
