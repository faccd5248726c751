//! Stored embedding vectors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Embedding of one experience. At most one exists per source id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingVector {
    /// Id of the experience this vector was generated from.
    pub source_id: String,
    pub vector: Vec<f32>,
    pub generated: DateTime<Utc>,
}

impl EmbeddingVector {
    /// Create a vector generated now.
    pub fn new(source_id: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            source_id: source_id.into(),
            vector,
            generated: Utc::now(),
        }
    }

    /// Whether this vector can take part in a similarity scan of the given
    /// dimensionality.
    pub fn is_usable(&self, dimension: usize) -> bool {
        !self.vector.is_empty()
            && self.vector.len() == dimension
            && self.vector.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usability() {
        assert!(EmbeddingVector::new("a", vec![0.1, 0.2]).is_usable(2));
        assert!(!EmbeddingVector::new("a", vec![0.1, 0.2]).is_usable(3));
        assert!(!EmbeddingVector::new("a", vec![]).is_usable(0));
        assert!(!EmbeddingVector::new("a", vec![f32::NAN, 0.2]).is_usable(2));
    }
}
