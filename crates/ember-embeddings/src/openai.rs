//! OpenAI embedding provider implementation.

use async_trait::async_trait;

use ember_core::error::{EmberError, EmberResult};
use ember_core::traits::{Embedder, EmbedderConfig};

#[cfg(feature = "openai")]
use async_openai::{
    config::OpenAIConfig,
    types::{CreateEmbeddingRequest, EmbeddingInput},
    Client,
};

use crate::probe::ProbeState;

/// OpenAI embedding provider.
pub struct OpenAIEmbedder {
    #[cfg(feature = "openai")]
    client: Client<OpenAIConfig>,
    config: EmbedderConfig,
    state: ProbeState,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder.
    pub fn new(config: EmbedderConfig) -> EmberResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                EmberError::Configuration(
                    "OpenAI API key not found. Set OPENAI_API_KEY or provide api_key in config."
                        .to_string(),
                )
            })?;

        #[cfg(feature = "openai")]
        let openai_config = if let Some(ref base_url) = config.base_url {
            OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base(base_url)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };
        #[cfg(not(feature = "openai"))]
        let _ = api_key;

        #[cfg(feature = "openai")]
        let client = Client::with_config(openai_config);

        let state = ProbeState::new(config.embedding_dims);
        Ok(Self {
            #[cfg(feature = "openai")]
            client,
            config,
            state,
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn initialize(&self) -> EmberResult<()> {
        let probe = self.embed(ProbeState::text()).await;
        self.state.record(self.name(), probe)
    }

    #[cfg(feature = "openai")]
    async fn embed(&self, text: &str) -> EmberResult<Vec<f32>> {
        let request = CreateEmbeddingRequest {
            model: self.config.model.clone(),
            input: EmbeddingInput::String(text.to_string()),
            ..Default::default()
        };

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| EmberError::embedding(format!("OpenAI embedding error: {}", e)))?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| EmberError::embedding("No embedding returned"))?;

        Ok(embedding.embedding)
    }

    #[cfg(not(feature = "openai"))]
    async fn embed(&self, _text: &str) -> EmberResult<Vec<f32>> {
        Err(EmberError::Configuration(
            "OpenAI feature not enabled. Enable the 'openai' feature.".to_string(),
        ))
    }

    #[cfg(feature = "openai")]
    async fn embed_batch(&self, texts: &[String]) -> EmberResult<Vec<Vec<f32>>> {
        let request = CreateEmbeddingRequest {
            model: self.config.model.clone(),
            input: EmbeddingInput::StringArray(texts.to_vec()),
            ..Default::default()
        };

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| EmberError::embedding(format!("OpenAI embedding error: {}", e)))?;

        let mut data = response.data;
        data.sort_by_key(|e| e.index);
        Ok(data.into_iter().map(|e| e.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.state.dimension()
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn is_available(&self) -> bool {
        self.state.is_available()
    }
}
