//! Record filtering: hard dimension gating and soft structured filters.

mod dimension;
mod structured;

pub use dimension::DimensionFilter;
pub use structured::FilterEvaluator;
