//! Deterministic provider used when no real embedder is configured or the
//! configured one cannot start.

use async_trait::async_trait;

use crate::error::EmberResult;
use crate::traits::Embedder;

/// Returns a single zero-valued scalar for every text.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEmbedder;

impl NoopEmbedder {
    /// The canonical fallback vector.
    pub fn fallback_vector() -> Vec<f32> {
        vec![0.0]
    }
}

#[async_trait]
impl Embedder for NoopEmbedder {
    async fn embed(&self, _text: &str) -> EmberResult<Vec<f32>> {
        Ok(Self::fallback_vector())
    }

    fn dimension(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        "none"
    }
}
