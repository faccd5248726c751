//! Pattern evolution: lifecycle stages, trends, stability and prediction.

mod bus;
mod events;
mod lifecycle;
mod prediction;
mod snapshot;
mod stability;
mod tracker;
mod trends;

pub use bus::{EvolutionEventBus, EvolutionSubscriber};
pub use events::{EventSeverity, EvolutionEvent, EvolutionEventType};
pub use lifecycle::{Lifecycle, LifecycleStage, StageTransition};
pub use prediction::{Prediction, PredictionDriver};
pub use snapshot::{PatternUpdate, Snapshot};
pub use stability::{assess_stability, RiskFactor, Recommendation, StabilityMetrics};
pub use tracker::{EvolutionTracker, PatternEvolution};
pub use trends::{compute_trend, TrendData, TrendDirection, Trends};
