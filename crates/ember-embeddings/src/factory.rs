//! Factory for creating embedding providers.

use std::sync::Arc;

use tracing::warn;

use ember_core::config::EngineConfig;
use ember_core::embedding::{EmbeddingService, NoopEmbedder};
use ember_core::error::EmberResult;
use ember_core::traits::{Embedder, EmbedderConfig, EmbedderProvider};

use crate::ollama::OllamaEmbedder;
use crate::openai::OpenAIEmbedder;
use crate::voyage::VoyageEmbedder;

/// Factory for creating embedding providers.
pub struct EmbedderFactory;

impl EmbedderFactory {
    /// Create an embedder from the given configuration.
    pub fn create(
        provider: EmbedderProvider,
        config: EmbedderConfig,
    ) -> EmberResult<Arc<dyn Embedder>> {
        match provider {
            EmbedderProvider::None => Ok(Arc::new(NoopEmbedder)),
            EmbedderProvider::OpenAI => Ok(Arc::new(OpenAIEmbedder::new(config)?)),
            EmbedderProvider::Ollama => Ok(Arc::new(OllamaEmbedder::new(config)?)),
            EmbedderProvider::Voyage => Ok(Arc::new(VoyageEmbedder::new(config)?)),
        }
    }

    /// Build and initialise the embedding service for an engine.
    ///
    /// A provider that cannot be constructed (missing key, bad URL) degrades
    /// to the no-op service, the same way a failed initialisation does.
    pub async fn service(config: &EngineConfig) -> EmbeddingService {
        let embedder = &config.embedder;
        match Self::create(embedder.provider, embedder.config.clone()) {
            Ok(provider) => EmbeddingService::initialize(provider, &config.embedding).await,
            Err(e) => {
                warn!(
                    provider = %embedder.provider,
                    error = %e,
                    "Embedding provider could not be created, falling back to none"
                );
                EmbeddingService::noop(&config.embedding)
            }
        }
    }

    /// Create an OpenAI embedder with default configuration.
    pub fn openai() -> EmberResult<Arc<dyn Embedder>> {
        Self::with_model(
            EmbedderProvider::OpenAI,
            EmbedderProvider::OpenAI.default_model().0,
        )
    }

    /// Create an Ollama embedder with default configuration.
    pub fn ollama() -> EmberResult<Arc<dyn Embedder>> {
        Self::with_model(
            EmbedderProvider::Ollama,
            EmbedderProvider::Ollama.default_model().0,
        )
    }

    /// Create an embedder for `provider` with a specific model.
    pub fn with_model(
        provider: EmbedderProvider,
        model: impl Into<String>,
    ) -> EmberResult<Arc<dyn Embedder>> {
        let config = EmbedderConfig {
            model: model.into(),
            embedding_dims: provider.default_model().1,
            ..Default::default()
        };
        Self::create(provider, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::config::EmbedderProviderConfig;

    #[test]
    fn test_create_none() {
        let embedder =
            EmbedderFactory::create(EmbedderProvider::None, EmbedderConfig::default()).unwrap();
        assert_eq!(embedder.name(), "none");
    }

    #[test]
    fn test_create_voyage_with_key() {
        let embedder = EmbedderFactory::create(
            EmbedderProvider::Voyage,
            EmbedderConfig {
                api_key: Some("pa-test".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(embedder.name(), "voyage");
    }

    #[tokio::test]
    async fn test_service_defaults_to_noop() {
        let service = EmbedderFactory::service(&EngineConfig::default()).await;
        assert!(service.is_fallback());
        assert_eq!(service.provider_name(), "none");
    }

    #[tokio::test]
    async fn test_unreachable_provider_degrades() {
        let mut config = EngineConfig::default();
        let mut embedder = EmbedderProviderConfig::for_provider(EmbedderProvider::Ollama);
        embedder.config.base_url = Some("http://127.0.0.1:9".to_string());
        config.embedder = embedder;

        let service = EmbedderFactory::service(&config).await;
        assert!(service.is_fallback());
        assert!(service.try_embed("anything").await.is_none());
        assert_eq!(service.embed("anything").await, vec![0.0]);
    }
}
