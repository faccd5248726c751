//! Least-squares trend estimation over recent history.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Slopes smaller than this are treated as flat.
pub const SLOPE_DEAD_BAND: f64 = 0.01;

/// Fewer points than this give a flat trend with no confidence.
pub const MIN_TREND_POINTS: usize = 3;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

/// Direction and strength of change in one metric.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrendData {
    pub direction: TrendDirection,
    /// `min(|slope| * 10, 1)`.
    pub magnitude: f64,
    /// Slope per snapshot.
    pub velocity: f64,
    /// Goodness of fit, `max(0, R²)`.
    pub confidence: f64,
}

impl TrendData {
    pub fn is_increasing(&self) -> bool {
        self.direction == TrendDirection::Increasing
    }

    pub fn is_decreasing(&self) -> bool {
        self.direction == TrendDirection::Decreasing
    }
}

/// Trends of the tracked pattern metrics.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Trends {
    pub coherence: TrendData,
    pub size: TrendData,
}

/// Ordinary least squares over the last `window` values.
pub fn compute_trend(values: &[f64], window: usize) -> TrendData {
    let recent = &values[values.len().saturating_sub(window)..];
    if recent.len() < MIN_TREND_POINTS {
        return TrendData::default();
    }

    let n = recent.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = recent.iter().sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, y) in recent.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxy += dx * (y - mean_y);
        sxx += dx * dx;
    }
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (i, y) in recent.iter().enumerate() {
        let predicted = intercept + slope * i as f64;
        ss_res += (y - predicted).powi(2);
        ss_tot += (y - mean_y).powi(2);
    }
    let r_squared = if ss_tot <= f64::EPSILON {
        1.0
    } else {
        1.0 - ss_res / ss_tot
    };

    let direction = if slope.abs() < SLOPE_DEAD_BAND {
        TrendDirection::Stable
    } else if slope > 0.0 {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    };

    TrendData {
        direction,
        magnitude: (slope.abs() * 10.0).min(1.0),
        velocity: slope,
        confidence: r_squared.clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_history_is_flat() {
        let trend = compute_trend(&[0.9, 0.1], 10);
        assert_eq!(trend.direction, TrendDirection::Stable);
        assert_eq!(trend.confidence, 0.0);
    }

    #[test]
    fn test_constant_series() {
        let trend = compute_trend(&[0.5; 6], 10);
        assert_eq!(trend.direction, TrendDirection::Stable);
        assert_eq!(trend.velocity, 0.0);
        assert_eq!(trend.confidence, 1.0);
    }

    #[test]
    fn test_linear_series_has_full_confidence() {
        let values: Vec<f64> = (0..8).map(|i| 0.2 + 0.05 * i as f64).collect();
        let trend = compute_trend(&values, 10);
        assert_eq!(trend.direction, TrendDirection::Increasing);
        assert!((trend.velocity - 0.05).abs() < 1e-9);
        assert!((trend.magnitude - 0.5).abs() < 1e-9);
        assert!((trend.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_dead_band() {
        let trend = compute_trend(&[0.5, 0.505, 0.51, 0.515], 10);
        assert_eq!(trend.direction, TrendDirection::Stable);
    }

    #[test]
    fn test_declining_coherence() {
        let trend = compute_trend(&[0.9, 0.85, 0.6, 0.4], 10);
        assert_eq!(trend.direction, TrendDirection::Decreasing);
        assert!((trend.velocity + 0.175).abs() < 1e-9);
        assert_eq!(trend.magnitude, 1.0);
    }

    #[test]
    fn test_window_uses_latest_values() {
        let mut values = vec![0.0, 1.0, 0.0, 1.0];
        values.extend([0.5; 3]);
        let trend = compute_trend(&values, 3);
        assert_eq!(trend.direction, TrendDirection::Stable);
        assert_eq!(trend.confidence, 1.0);
    }
}
