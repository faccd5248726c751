//! ember-core - Core library for ember.
//!
//! This crate provides the types, traits and engine for an experiential
//! memory: dimension-aware retrieval with unified relevance scoring,
//! grouping and similarity clustering, and pattern evolution tracking.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ember_core::{EmbeddingService, EngineConfig, ExperienceEngine, MemoryStore, SearchRequest};
//!
//! let config = EngineConfig::load_default()?;
//! let store = Arc::new(MemoryStore::new());
//! let embeddings = Arc::new(EmbeddingService::noop(&config.embedding));
//! let engine = ExperienceEngine::new(store, embeddings, config)?;
//!
//! // Experiences with a closed mood and sensing body
//! let response = engine
//!     .search(&SearchRequest::new(vec!["mood.closed", "embodied.sensing"]))
//!     .await?;
//! ```

pub mod config;
pub mod embedding;
pub mod error;
pub mod evolution;
pub mod filter;
pub mod grouping;
pub mod retrieval;
pub mod storage;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{
    EmbedderProviderConfig, EmbeddingSettings, EngineConfig, EvolutionConfig, ScoringConfig,
};
pub use embedding::{cosine_similarity, EmbeddingService, NoopEmbedder, VectorStore};
pub use error::{EmberError, EmberResult, ErrorCode};
pub use evolution::{
    EvolutionEvent, EvolutionEventBus, EvolutionEventType, EvolutionTracker, LifecycleStage,
    PatternUpdate, Prediction,
};
pub use filter::DimensionFilter;
pub use grouping::{ClusterConfig, ClusterOutcome, ExperienceGroup, HardClusterer, Pattern};
pub use retrieval::{
    ExperienceEngine, ScoreBreakdown, ScoringWeights, SearchHit, SearchRequest, SearchResponse,
};
pub use storage::MemoryStore;
pub use traits::{Embedder, EmbedderConfig, EmbedderProvider, ExperienceStore, TemporalParser};
pub use types::{
    DimensionPredicate, DimensionQuery, EmbeddingVector, Experience, GroupBy, QualityDimension,
    QualityValue, QueryInput, SearchFilters, SortOrder, TimeFilter,
};
