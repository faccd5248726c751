//! Embedder trait and related types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::EmberResult;

/// Core Embedder trait - all embedding providers implement this.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Prepare the provider (probe the endpoint, resolve dimensionality).
    async fn initialize(&self) -> EmberResult<()> {
        Ok(())
    }

    /// Generate embedding for a single text.
    async fn embed(&self, text: &str) -> EmberResult<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch).
    async fn embed_batch(&self, texts: &[String]) -> EmberResult<Vec<Vec<f32>>> {
        // Default implementation: sequential embedding
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Get the dimension of the embeddings.
    fn dimension(&self) -> usize;

    /// Provider name, for logs and stats.
    fn name(&self) -> &str;

    /// Whether the provider is ready to serve requests.
    fn is_available(&self) -> bool {
        true
    }
}

/// Embedder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    /// Model name/identifier.
    pub model: String,
    /// Embedding dimensions.
    #[serde(default = "default_embedding_dims")]
    pub embedding_dims: usize,
    /// API key (if not using environment variable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL for API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_embedding_dims() -> usize {
    1536
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            embedding_dims: default_embedding_dims(),
            api_key: None,
            base_url: None,
        }
    }
}

/// Embedder provider type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EmbedderProvider {
    /// Deterministic no-op provider; disables semantic scoring.
    #[default]
    #[strum(to_string = "none", serialize = "noop")]
    None,
    OpenAI,
    Ollama,
    Voyage,
}

impl EmbedderProvider {
    /// Default model and dimensionality for the provider.
    pub fn default_model(&self) -> (&'static str, usize) {
        match self {
            Self::None => ("none", 1),
            Self::OpenAI => ("text-embedding-3-small", 1536),
            Self::Ollama => ("nomic-embed-text", 768),
            Self::Voyage => ("voyage-3-lite", 512),
        }
    }
}
