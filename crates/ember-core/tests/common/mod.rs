//! Shared fixtures for the ember-core integration tests.

#![allow(dead_code)]

use std::collections::HashMap;

use async_trait::async_trait;
use mockall::mock;

use ember_core::{
    EmberError, EmberResult, Embedder, EmbeddingVector, Experience, ExperienceStore,
};

mock! {
    pub Store {}

    #[async_trait]
    impl ExperienceStore for Store {
        async fn list_all_records(&self) -> EmberResult<Vec<Experience>>;
        async fn list_all_embeddings(&self) -> EmberResult<Vec<EmbeddingVector>>;
        async fn save_embeddings(&self, vectors: &[EmbeddingVector]) -> EmberResult<()>;
    }
}

/// A store mock that always lists `records`.
pub fn store_with(records: Vec<Experience>) -> MockStore {
    let mut store = MockStore::new();
    store
        .expect_list_all_records()
        .returning(move || Ok(records.clone()));
    store
}

/// Embedder answering from a fixed table of texts.
pub struct TableEmbedder {
    dimension: usize,
    table: HashMap<String, Vec<f32>>,
}

impl TableEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            table: HashMap::new(),
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.table.insert(text.to_string(), vector);
        self
    }
}

#[async_trait]
impl Embedder for TableEmbedder {
    async fn embed(&self, text: &str) -> EmberResult<Vec<f32>> {
        self.table
            .get(text)
            .cloned()
            .ok_or_else(|| EmberError::embedding(format!("no vector for '{}'", text)))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "table"
    }
}

/// Unit vector along `axis`.
pub fn axis(dimension: usize, axis: usize) -> Vec<f32> {
    let mut v = vec![0.0; dimension];
    v[axis] = 1.0;
    v
}

/// Vector whose cosine with any other `spoke(.., c, j)` for `j != i` is `c`.
///
/// Shares `sqrt(c)` on axis 0 and puts the rest on its own axis `i + 1`.
pub fn spoke(dimension: usize, c: f64, i: usize) -> Vec<f32> {
    let mut v = vec![0.0; dimension];
    v[0] = c.sqrt() as f32;
    v[i + 1] = (1.0 - c).sqrt() as f32;
    v
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("ember_core=debug")
        .with_test_writer()
        .try_init();
}
