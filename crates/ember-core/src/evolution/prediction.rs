//! Short-term trajectory prediction from current trends.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::lifecycle::{
    LifecycleStage, DORMANT_COHERENCE, EMERGING_MAX_MEMBERS, MATURE_COHERENCE,
    STABLE_COHERENCE, STABLE_MIN_AGE_DAYS, TREND_MAGNITUDE_THRESHOLD,
};
use super::snapshot::Snapshot;
use super::tracker::PatternEvolution;
use super::trends::TrendData;

/// Coherence this close to the dormant floor counts as about to go dormant.
const DORMANT_MARGIN: f64 = 0.05;

/// Which trend a prediction follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PredictionDriver {
    Coherence,
    Size,
}

/// Expected next stage of a pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub pattern_id: String,
    pub current_stage: LifecycleStage,
    pub predicted_stage: LifecycleStage,
    /// Estimated days until the transition; `None` when no change is
    /// expected.
    pub days_to_transition: Option<f64>,
    pub confidence: f64,
    pub driver: PredictionDriver,
}

/// Project the next stage of `evolution`.
///
/// `saturation` is the history length at which confidence stops growing.
pub fn predict_next(evolution: &PatternEvolution, saturation: usize) -> Prediction {
    let stage = evolution.lifecycle.stage;
    let coherence_trend = &evolution.trends.coherence;
    let size_trend = &evolution.trends.size;
    let (coherence, members) = evolution
        .latest()
        .map(|s| (s.coherence, s.member_count))
        .unwrap_or((0.0, 0));
    let interval = mean_interval_days(&evolution.history);
    let age = evolution.age_days();

    let (predicted, snapshots, driver): (LifecycleStage, Option<f64>, PredictionDriver) =
        if stage == LifecycleStage::Emerging
            && size_trend.is_increasing()
            && members < EMERGING_MAX_MEMBERS
        {
            (
                LifecycleStage::Growing,
                steps_to(members as f64, EMERGING_MAX_MEMBERS as f64, size_trend),
                PredictionDriver::Size,
            )
        } else if coherence_trend.is_decreasing()
            && stage != LifecycleStage::Dormant
            && (stage == LifecycleStage::Declining
                || coherence <= DORMANT_COHERENCE + DORMANT_MARGIN)
        {
            (
                LifecycleStage::Dormant,
                steps_to(coherence, DORMANT_COHERENCE, coherence_trend),
                PredictionDriver::Coherence,
            )
        } else if coherence_trend.is_decreasing()
            && matches!(
                stage,
                LifecycleStage::Growing | LifecycleStage::Mature | LifecycleStage::Stable
            )
        {
            // A steep enough slope flips the stage on the next update; a
            // milder one is measured by when coherence leaves the mature band.
            let snapshots = if coherence_trend.magnitude > TREND_MAGNITUDE_THRESHOLD {
                Some(1.0)
            } else {
                steps_to(coherence, MATURE_COHERENCE, coherence_trend)
            };
            (
                LifecycleStage::Declining,
                snapshots,
                PredictionDriver::Coherence,
            )
        } else if coherence_trend.is_increasing() && coherence <= MATURE_COHERENCE {
            (
                LifecycleStage::Mature,
                steps_to(coherence, MATURE_COHERENCE, coherence_trend),
                PredictionDriver::Coherence,
            )
        } else if (coherence_trend.is_increasing() || coherence > STABLE_COHERENCE)
            && stage != LifecycleStage::Stable
            && stage != LifecycleStage::Emerging
        {
            let to_coherence = if coherence > STABLE_COHERENCE {
                Some(0.0)
            } else {
                steps_to(coherence, STABLE_COHERENCE, coherence_trend)
            };
            // Stability also needs age; waiting for it is measured in days
            let age_wait = (STABLE_MIN_AGE_DAYS - age).max(0.0) / interval;
            (
                LifecycleStage::Stable,
                to_coherence.map(|s| s.max(age_wait)),
                PredictionDriver::Coherence,
            )
        } else {
            (stage, None, PredictionDriver::Coherence)
        };

    let trend: &TrendData = match driver {
        PredictionDriver::Coherence => coherence_trend,
        PredictionDriver::Size => size_trend,
    };
    let history_factor = (evolution.history.len() as f64 / saturation.max(1) as f64).min(1.0);

    Prediction {
        pattern_id: evolution.pattern_id.clone(),
        current_stage: stage,
        predicted_stage: predicted,
        days_to_transition: if predicted == stage {
            None
        } else {
            snapshots.map(|s| s * interval)
        },
        confidence: trend.confidence * history_factor,
        driver,
    }
}

/// Snapshots until `current` reaches `target` at the trend's velocity.
fn steps_to(current: f64, target: f64, trend: &TrendData) -> Option<f64> {
    let gap = target - current;
    if gap == 0.0 {
        return Some(0.0);
    }
    if trend.velocity == 0.0 || gap.signum() != trend.velocity.signum() {
        return None;
    }
    Some(gap / trend.velocity)
}

/// Mean days between consecutive snapshots; 1 day with fewer than two.
fn mean_interval_days(history: &[Snapshot]) -> f64 {
    if history.len() < 2 {
        return 1.0;
    }
    let (Some(first), Some(last)) = (history.first(), history.last()) else {
        return 1.0;
    };
    let span: Duration = last.timestamp - first.timestamp;
    let days = span.num_seconds() as f64 / 86_400.0 / (history.len() - 1) as f64;
    if days > 0.0 {
        days
    } else {
        1.0
    }
}
