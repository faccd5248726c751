//! Embedding service: provider selection, caching, rate limiting and
//! graceful degradation.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::EmbeddingSettings;
use crate::traits::Embedder;

use super::cache::EmbeddingCache;
use super::noop::NoopEmbedder;
use super::rate_limit::RateLimiter;

/// Text embedding front end used by search and indexing.
///
/// Never fails: a provider error or timeout yields no semantic signal
/// (`try_embed` returns `None`, `embed` returns the fallback vector).
pub struct EmbeddingService {
    provider: Arc<dyn Embedder>,
    cache: EmbeddingCache,
    limiter: RateLimiter,
    call_timeout: Duration,
    fallback: bool,
}

impl EmbeddingService {
    /// Initialize `provider`, falling back to the no-op provider when it
    /// cannot start or reports itself unavailable.
    pub async fn initialize(provider: Arc<dyn Embedder>, settings: &EmbeddingSettings) -> Self {
        let name = provider.name().to_string();
        let provider: Arc<dyn Embedder> = match provider.initialize().await {
            Ok(()) if provider.is_available() => {
                debug!(
                    provider = %name,
                    dimension = provider.dimension(),
                    "Embedding provider ready"
                );
                provider
            }
            Ok(()) => {
                warn!(provider = %name, "Embedding provider unavailable, falling back to none");
                Arc::new(NoopEmbedder)
            }
            Err(e) => {
                warn!(
                    provider = %name,
                    error = %e,
                    "Embedding provider failed to initialize, falling back to none"
                );
                Arc::new(NoopEmbedder)
            }
        };
        Self::with_provider(provider, settings)
    }

    /// Service backed by the no-op provider.
    pub fn noop(settings: &EmbeddingSettings) -> Self {
        Self::with_provider(Arc::new(NoopEmbedder), settings)
    }

    fn with_provider(provider: Arc<dyn Embedder>, settings: &EmbeddingSettings) -> Self {
        let fallback = provider.name() == NoopEmbedder.name();
        Self {
            provider,
            cache: EmbeddingCache::new(),
            limiter: RateLimiter::new(Duration::from_millis(settings.rate_limit_ms)),
            call_timeout: Duration::from_millis(settings.timeout_ms),
            fallback,
        }
    }

    /// Embed `text`, or `None` when no semantic signal is available.
    pub async fn try_embed(&self, text: &str) -> Option<Vec<f32>> {
        if self.fallback {
            return None;
        }
        if let Some(hit) = self.cache.get(text).await {
            return Some(hit);
        }

        self.limiter.acquire().await;
        match timeout(self.call_timeout, self.provider.embed(text)).await {
            Ok(Ok(vector)) if !vector.is_empty() && vector.iter().all(|v| v.is_finite()) => {
                self.cache.insert(text, vector.clone()).await;
                Some(vector)
            }
            Ok(Ok(_)) => {
                warn!(provider = %self.provider.name(), "Provider returned an unusable vector");
                None
            }
            Ok(Err(e)) => {
                warn!(provider = %self.provider.name(), error = %e, "Embedding call failed");
                None
            }
            Err(_) => {
                warn!(
                    provider = %self.provider.name(),
                    timeout_ms = self.call_timeout.as_millis() as u64,
                    "Embedding call timed out"
                );
                None
            }
        }
    }

    /// Embed several texts with one provider call for the cache misses.
    ///
    /// Positions line up with `texts`; a failed or mis-sized batch leaves
    /// every miss as `None`.
    pub async fn try_embed_batch(&self, texts: &[String]) -> Vec<Option<Vec<f32>>> {
        let mut results: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        if self.fallback {
            return results;
        }

        let mut misses: Vec<usize> = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            match self.cache.get(text).await {
                Some(hit) => results[i] = Some(hit),
                None => misses.push(i),
            }
        }
        if misses.is_empty() {
            return results;
        }

        let batch: Vec<String> = misses.iter().map(|&i| texts[i].clone()).collect();
        self.limiter.acquire().await;
        let vectors = match timeout(self.call_timeout, self.provider.embed_batch(&batch)).await {
            Ok(Ok(vectors)) if vectors.len() == batch.len() => vectors,
            Ok(Ok(vectors)) => {
                warn!(
                    provider = %self.provider.name(),
                    expected = batch.len(),
                    returned = vectors.len(),
                    "Batch embedding returned the wrong number of vectors"
                );
                return results;
            }
            Ok(Err(e)) => {
                warn!(provider = %self.provider.name(), error = %e, "Batch embedding failed");
                return results;
            }
            Err(_) => {
                warn!(
                    provider = %self.provider.name(),
                    timeout_ms = self.call_timeout.as_millis() as u64,
                    "Batch embedding timed out"
                );
                return results;
            }
        };

        for (i, vector) in misses.into_iter().zip(vectors) {
            if !vector.is_empty() && vector.iter().all(|v| v.is_finite()) {
                self.cache.insert(texts[i].clone(), vector.clone()).await;
                results[i] = Some(vector);
            }
        }
        results
    }

    /// Embed `text`, returning the fallback vector on failure.
    pub async fn embed(&self, text: &str) -> Vec<f32> {
        match self.try_embed(text).await {
            Some(vector) => vector,
            None => NoopEmbedder::fallback_vector(),
        }
    }

    /// Dimensionality of the active provider.
    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Whether the no-op provider is active, disabling semantic scoring.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    pub async fn cache_len(&self) -> usize {
        self.cache.len().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EmberError, EmberResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Scriptable embedder for tests
    #[derive(Default)]
    struct TestEmbedder {
        calls: AtomicUsize,
        fail_init: bool,
        unavailable: bool,
        fail_embed: bool,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl Embedder for TestEmbedder {
        async fn initialize(&self) -> EmberResult<()> {
            if self.fail_init {
                return Err(EmberError::provider_unavailable("no endpoint"));
            }
            Ok(())
        }

        async fn embed(&self, _text: &str) -> EmberResult<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_embed {
                return Err(EmberError::embedding("boom"));
            }
            Ok(vec![0.1, 0.2, 0.3])
        }

        fn dimension(&self) -> usize {
            3
        }

        fn name(&self) -> &str {
            "test"
        }

        fn is_available(&self) -> bool {
            !self.unavailable
        }
    }

    fn fast_settings() -> EmbeddingSettings {
        EmbeddingSettings {
            rate_limit_ms: 0,
            timeout_ms: 200,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_cache_hit_skips_provider() {
        let provider = Arc::new(TestEmbedder::default());
        let service = EmbeddingService::initialize(provider.clone(), &fast_settings()).await;
        assert!(!service.is_fallback());
        assert_eq!(service.dimension(), 3);
        assert_eq!(service.provider_name(), "test");

        let first = service.embed("hello").await;
        let second = service.embed("hello").await;
        assert_eq!(first, second);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.cache_len().await, 1);

        service.clear_cache().await;
        assert_eq!(service.cache_len().await, 0);
        service.embed("hello").await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_batch_embeds_only_misses() {
        let provider = Arc::new(TestEmbedder::default());
        let service = EmbeddingService::initialize(provider.clone(), &fast_settings()).await;
        service.embed("cached").await;

        let texts = vec!["cached".to_string(), "a".to_string(), "b".to_string()];
        let results = service.try_embed_batch(&texts).await;
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(Option::is_some));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert_eq!(service.cache_len().await, 3);
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_misses_empty() {
        let provider = Arc::new(TestEmbedder {
            fail_embed: true,
            ..Default::default()
        });
        let service = EmbeddingService::initialize(provider, &fast_settings()).await;
        let results = service.try_embed_batch(&["x".to_string()]).await;
        assert_eq!(results, vec![None]);

        let noop = EmbeddingService::noop(&fast_settings());
        assert_eq!(noop.try_embed_batch(&["x".to_string()]).await, vec![None]);
    }

    #[tokio::test]
    async fn test_failed_call_degrades() {
        let provider = Arc::new(TestEmbedder {
            fail_embed: true,
            ..Default::default()
        });
        let service = EmbeddingService::initialize(provider, &fast_settings()).await;
        assert!(service.try_embed("x").await.is_none());
        assert_eq!(service.embed("x").await, vec![0.0]);
        assert_eq!(service.cache_len().await, 0);
    }

    #[tokio::test]
    async fn test_init_failure_falls_back_to_noop() {
        let provider = Arc::new(TestEmbedder {
            fail_init: true,
            ..Default::default()
        });
        let service = EmbeddingService::initialize(provider.clone(), &fast_settings()).await;
        assert!(service.is_fallback());
        assert_eq!(service.provider_name(), "none");
        assert_eq!(service.dimension(), 1);
        assert!(service.try_embed("x").await.is_none());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unavailable_provider_falls_back() {
        let provider = Arc::new(TestEmbedder {
            unavailable: true,
            ..Default::default()
        });
        let service = EmbeddingService::initialize(provider, &fast_settings()).await;
        assert!(service.is_fallback());
    }

    #[tokio::test]
    async fn test_timeout_gives_no_signal() {
        let provider = Arc::new(TestEmbedder {
            delay: Some(Duration::from_secs(5)),
            ..Default::default()
        });
        let settings = EmbeddingSettings {
            rate_limit_ms: 0,
            timeout_ms: 20,
            ..Default::default()
        };
        let service = EmbeddingService::initialize(provider, &settings).await;
        assert!(service.try_embed("x").await.is_none());
    }
}
