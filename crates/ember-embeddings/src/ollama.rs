//! Ollama embedding provider implementation.

use async_trait::async_trait;

use ember_core::error::{EmberError, EmberResult};
use ember_core::traits::{Embedder, EmbedderConfig};

#[cfg(feature = "ollama")]
use ollama_rs::{generation::embeddings::request::GenerateEmbeddingsRequest, Ollama};

use crate::probe::ProbeState;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Ollama embedding provider.
pub struct OllamaEmbedder {
    #[cfg(feature = "ollama")]
    client: Ollama,
    config: EmbedderConfig,
    state: ProbeState,
}

impl OllamaEmbedder {
    /// Create a new Ollama embedder.
    pub fn new(config: EmbedderConfig) -> EmberResult<Self> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        let url = url::Url::parse(&base_url)
            .map_err(|e| EmberError::Configuration(format!("Invalid Ollama URL: {}", e)))?;

        #[cfg(feature = "ollama")]
        let client = {
            let host = url.host_str().unwrap_or("localhost");
            let port = url.port().unwrap_or(11434);
            Ollama::new(format!("{}://{}", url.scheme(), host), port)
        };
        #[cfg(not(feature = "ollama"))]
        let _ = url;

        let state = ProbeState::new(config.embedding_dims);
        Ok(Self {
            #[cfg(feature = "ollama")]
            client,
            config,
            state,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn initialize(&self) -> EmberResult<()> {
        let probe = self.embed(ProbeState::text()).await;
        self.state.record(self.name(), probe)
    }

    #[cfg(feature = "ollama")]
    async fn embed(&self, text: &str) -> EmberResult<Vec<f32>> {
        let request = GenerateEmbeddingsRequest::new(self.config.model.clone(), text.into());

        let response = self
            .client
            .generate_embeddings(request)
            .await
            .map_err(|e| EmberError::embedding(format!("Ollama embedding error: {}", e)))?;

        response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmberError::embedding("No embedding returned"))
    }

    #[cfg(not(feature = "ollama"))]
    async fn embed(&self, _text: &str) -> EmberResult<Vec<f32>> {
        Err(EmberError::Configuration(
            "Ollama feature not enabled. Enable the 'ollama' feature.".to_string(),
        ))
    }

    fn dimension(&self) -> usize {
        self.state.dimension()
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn is_available(&self) -> bool {
        self.state.is_available()
    }
}
