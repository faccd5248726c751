//! Relevance scoring and search.

mod engine;
mod scorer;
mod text;

pub use engine::{ExperienceEngine, SearchHit, SearchRequest, SearchResponse, SearchStats};
pub use scorer::{RelevanceScorer, ScoreBreakdown, ScoringWeights};
pub use text::{text_match, tokenize};
