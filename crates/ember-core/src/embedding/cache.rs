//! Exact-text embedding cache.

use std::collections::HashMap;

use tokio::sync::RwLock;

/// Unbounded text → vector cache for the lifetime of a service.
///
/// Reads take a shared lock; inserts and clears are serialized.
#[derive(Debug, Default)]
pub struct EmbeddingCache {
    entries: RwLock<HashMap<String, Vec<f32>>>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, text: &str) -> Option<Vec<f32>> {
        self.entries.read().await.get(text).cloned()
    }

    pub async fn insert(&self, text: impl Into<String>, vector: Vec<f32>) {
        self.entries.write().await.insert(text.into(), vector);
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
