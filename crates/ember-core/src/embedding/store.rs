//! In-memory vector store with linear similarity scan.

use std::collections::HashMap;

use ordered_float::OrderedFloat;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::EmberResult;
use crate::traits::ExperienceStore;
use crate::types::EmbeddingVector;

use super::similarity::cosine_similarity;

/// Vectors keyed by source id, one per experience.
#[derive(Debug)]
pub struct VectorStore {
    vectors: RwLock<HashMap<String, EmbeddingVector>>,
    dimension: usize,
}

impl VectorStore {
    /// Create an empty store scanning vectors of `dimension`.
    pub fn new(dimension: usize) -> Self {
        Self {
            vectors: RwLock::new(HashMap::new()),
            dimension,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Insert or replace the vector for its source id.
    pub async fn upsert(&self, vector: EmbeddingVector) {
        self.vectors
            .write()
            .await
            .insert(vector.source_id.clone(), vector);
    }

    pub async fn remove(&self, source_id: &str) -> Option<EmbeddingVector> {
        self.vectors.write().await.remove(source_id)
    }

    pub async fn get(&self, source_id: &str) -> Option<EmbeddingVector> {
        self.vectors.read().await.get(source_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.vectors.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.vectors.read().await.is_empty()
    }

    /// Usable vectors for the given ids. Missing or unusable ids are absent
    /// from the result.
    pub async fn usable_vectors<'a, I>(&self, ids: I) -> HashMap<String, Vec<f32>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let vectors = self.vectors.read().await;
        ids.into_iter()
            .filter_map(|id| vectors.get(id))
            .filter(|v| v.is_usable(self.dimension))
            .map(|v| (v.source_id.clone(), v.vector.clone()))
            .collect()
    }

    /// Replace contents with everything the store lists.
    pub async fn load(&self, store: &dyn ExperienceStore) -> EmberResult<usize> {
        let loaded = store.list_all_embeddings().await?;
        let mut vectors = self.vectors.write().await;
        vectors.clear();
        for vector in loaded {
            vectors.insert(vector.source_id.clone(), vector);
        }
        info!(count = vectors.len(), "Loaded embeddings");
        Ok(vectors.len())
    }

    /// Write every vector back to the store.
    pub async fn persist(&self, store: &dyn ExperienceStore) -> EmberResult<usize> {
        let mut snapshot: Vec<EmbeddingVector> =
            self.vectors.read().await.values().cloned().collect();
        snapshot.sort_by(|a, b| a.source_id.cmp(&b.source_id));
        store.save_embeddings(&snapshot).await?;
        info!(count = snapshot.len(), "Persisted embeddings");
        Ok(snapshot.len())
    }

    /// Source ids most similar to `query`, best first.
    ///
    /// Full scan; vectors that are empty, non-finite or of another
    /// dimensionality are skipped.
    pub async fn similar_to(
        &self,
        query: &[f32],
        limit: usize,
        threshold: f64,
    ) -> Vec<(String, f64)> {
        if query.len() != self.dimension || query.iter().any(|v| !v.is_finite()) {
            debug!(
                query_dim = query.len(),
                store_dim = self.dimension,
                "Query vector unusable for scan"
            );
            return Vec::new();
        }

        let vectors = self.vectors.read().await;
        let mut skipped = 0usize;
        let mut results: Vec<(String, f64)> = Vec::new();
        for vector in vectors.values() {
            if !vector.is_usable(self.dimension) {
                skipped += 1;
                continue;
            }
            let similarity = cosine_similarity(query, &vector.vector);
            if similarity >= threshold {
                results.push((vector.source_id.clone(), similarity));
            }
        }
        if skipped > 0 {
            debug!(skipped, "Skipped unusable vectors during scan");
        }

        results.sort_by(|a, b| {
            OrderedFloat(b.1)
                .cmp(&OrderedFloat(a.1))
                .then_with(|| a.0.cmp(&b.0))
        });
        results.truncate(limit);
        results
    }
}
