//! Stability assessment of a pattern's recent history.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::snapshot::Snapshot;
use super::trends::TrendData;

/// Score used for components that lack enough history.
pub const NEUTRAL_STABILITY: f64 = 0.5;
/// Temporal regularity is not measured yet and scores neutral.
pub const TEMPORAL_STABILITY: f64 = 0.5;

const LOW_OVERALL: f64 = 0.4;
const LOW_COMPONENT: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RiskFactor {
    LowOverallStability,
    WeakCohesion,
    MembershipChurn,
    ThematicDrift,
    DecliningCoherence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Recommendation {
    ReviewPatternDefinition,
    StrengthenCohesion,
    MonitorMembershipChurn,
    RefreshThemeTags,
}

impl Recommendation {
    pub fn description(&self) -> &'static str {
        match self {
            Self::ReviewPatternDefinition => "review pattern definition",
            Self::StrengthenCohesion => "strengthen cohesion",
            Self::MonitorMembershipChurn => "monitor membership churn",
            Self::RefreshThemeTags => "refresh theme tags",
        }
    }
}

/// Composite stability with its components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityMetrics {
    pub overall: f64,
    pub coherence_stability: f64,
    pub membership_stability: f64,
    pub temporal_stability: f64,
    pub thematic_stability: f64,
    pub risk_factors: Vec<RiskFactor>,
    pub recommendations: Vec<Recommendation>,
}

impl Default for StabilityMetrics {
    fn default() -> Self {
        Self {
            overall: NEUTRAL_STABILITY,
            coherence_stability: NEUTRAL_STABILITY,
            membership_stability: NEUTRAL_STABILITY,
            temporal_stability: TEMPORAL_STABILITY,
            thematic_stability: 1.0,
            risk_factors: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

/// Assess the last `window` snapshots of `history`.
pub fn assess_stability(
    history: &[Snapshot],
    coherence_trend: &TrendData,
    window: usize,
) -> StabilityMetrics {
    let recent = &history[history.len().saturating_sub(window)..];

    let (coherence_stability, membership_stability) = if recent.len() < 2 {
        (NEUTRAL_STABILITY, NEUTRAL_STABILITY)
    } else {
        let coherence: Vec<f64> = recent.iter().map(|s| s.coherence).collect();
        let churn = recent
            .windows(2)
            .map(|w| (w[1].member_count as f64 - w[0].member_count as f64).abs())
            .sum::<f64>()
            / (recent.len() - 1) as f64;
        (1.0 / (1.0 + 10.0 * std_dev(&coherence)), 1.0 / (1.0 + churn))
    };

    let thematic_stability = match (history.first(), history.last()) {
        (Some(first), Some(last)) => jaccard(&first.theme_tags, &last.theme_tags),
        _ => 1.0,
    };

    let overall =
        (coherence_stability + membership_stability + TEMPORAL_STABILITY + thematic_stability)
            / 4.0;

    let mut risk_factors = Vec::new();
    let mut recommendations = Vec::new();
    if overall < LOW_OVERALL {
        risk_factors.push(RiskFactor::LowOverallStability);
        recommendations.push(Recommendation::ReviewPatternDefinition);
    }
    if coherence_stability < LOW_COMPONENT {
        risk_factors.push(RiskFactor::WeakCohesion);
        recommendations.push(Recommendation::StrengthenCohesion);
    }
    if membership_stability < LOW_COMPONENT {
        risk_factors.push(RiskFactor::MembershipChurn);
        recommendations.push(Recommendation::MonitorMembershipChurn);
    }
    if thematic_stability < LOW_COMPONENT {
        risk_factors.push(RiskFactor::ThematicDrift);
        recommendations.push(Recommendation::RefreshThemeTags);
    }
    if coherence_trend.is_decreasing() {
        risk_factors.push(RiskFactor::DecliningCoherence);
    }

    StabilityMetrics {
        overall,
        coherence_stability,
        membership_stability,
        temporal_stability: TEMPORAL_STABILITY,
        thematic_stability,
        risk_factors,
        recommendations,
    }
}

fn std_dev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

/// Jaccard similarity of two tag sets; 1 when both are empty.
fn jaccard(a: &[String], b: &[String]) -> f64 {
    let a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let b: HashSet<&str> = b.iter().map(String::as_str).collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 1.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}
