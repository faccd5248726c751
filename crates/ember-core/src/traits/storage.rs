//! Storage collaborator.

use async_trait::async_trait;

use crate::error::EmberResult;
use crate::types::{EmbeddingVector, Experience};

/// Flat persistence of experiences and their embeddings.
///
/// The engine recomputes everything from a full listing on each query, so
/// this is all it needs.
#[async_trait]
pub trait ExperienceStore: Send + Sync {
    /// Every stored experience.
    async fn list_all_records(&self) -> EmberResult<Vec<Experience>>;

    /// Every stored embedding.
    async fn list_all_embeddings(&self) -> EmberResult<Vec<EmbeddingVector>>;

    /// Replace the stored embeddings with `vectors`.
    async fn save_embeddings(&self, vectors: &[EmbeddingVector]) -> EmberResult<()>;
}
