//! In-memory experience store for embedding in tests and small tools.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::EmberResult;
use crate::traits::ExperienceStore;
use crate::types::{EmbeddingVector, Experience};

/// Experiences and embeddings held in memory, listed in id order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<String, Experience>>,
    embeddings: RwLock<BTreeMap<String, EmbeddingVector>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `records`.
    pub fn with_records(records: Vec<Experience>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().map(|r| (r.id.clone(), r)).collect()),
            embeddings: RwLock::new(BTreeMap::new()),
        }
    }

    /// Insert or replace an experience.
    pub async fn insert(&self, experience: Experience) {
        self.records
            .write()
            .await
            .insert(experience.id.clone(), experience);
    }

    /// Remove an experience and its embedding.
    pub async fn remove(&self, id: &str) -> Option<Experience> {
        self.embeddings.write().await.remove(id);
        self.records.write().await.remove(id)
    }

    pub async fn get(&self, id: &str) -> Option<Experience> {
        self.records.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ExperienceStore for MemoryStore {
    async fn list_all_records(&self) -> EmberResult<Vec<Experience>> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn list_all_embeddings(&self) -> EmberResult<Vec<EmbeddingVector>> {
        Ok(self.embeddings.read().await.values().cloned().collect())
    }

    async fn save_embeddings(&self, vectors: &[EmbeddingVector]) -> EmberResult<()> {
        let mut embeddings = self.embeddings.write().await;
        embeddings.clear();
        for vector in vectors {
            embeddings.insert(vector.source_id.clone(), vector.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_round_trip() {
        let store = MemoryStore::new();
        store.insert(Experience::new("b", "second")).await;
        store.insert(Experience::new("a", "first")).await;

        let listed = store.list_all_records().await.unwrap();
        let ids: Vec<_> = listed.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        assert!(store.remove("a").await.is_some());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_save_embeddings_replaces() {
        let store = MemoryStore::new();
        store
            .save_embeddings(&[EmbeddingVector::new("a", vec![1.0])])
            .await
            .unwrap();
        store
            .save_embeddings(&[EmbeddingVector::new("b", vec![2.0])])
            .await
            .unwrap();
        let listed = store.list_all_embeddings().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].source_id, "b");
    }
}
