//! Core types for ember.

mod embedding;
mod experience;
mod query;

pub use embedding::EmbeddingVector;
pub use experience::{Experience, HasExperience, Qualities, QualityDimension, QualityValue};
pub use query::*;
