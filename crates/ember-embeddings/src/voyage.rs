//! Voyage AI embedding provider implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use ember_core::error::{EmberError, EmberResult};
use ember_core::traits::{Embedder, EmbedderConfig};

use crate::probe::ProbeState;

const DEFAULT_VOYAGE_URL: &str = "https://api.voyageai.com/v1";

/// Voyage AI embedding provider.
pub struct VoyageEmbedder {
    client: Client,
    api_key: String,
    endpoint: String,
    config: EmbedderConfig,
    state: ProbeState,
}

#[derive(Debug, Serialize)]
struct VoyageEmbedRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct VoyageEmbedResponse {
    data: Vec<VoyageEmbedding>,
}

#[derive(Debug, Deserialize)]
struct VoyageEmbedding {
    embedding: Vec<f32>,
    index: usize,
}

impl VoyageEmbedder {
    /// Create a new Voyage embedder.
    pub fn new(config: EmbedderConfig) -> EmberResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("VOYAGE_API_KEY").ok())
            .ok_or_else(|| {
                EmberError::Configuration(
                    "Voyage API key required. Set VOYAGE_API_KEY or provide api_key.".to_string(),
                )
            })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_VOYAGE_URL.to_string());
        url::Url::parse(&base_url)
            .map_err(|e| EmberError::Configuration(format!("Invalid Voyage URL: {}", e)))?;
        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));

        let state = ProbeState::new(config.embedding_dims);
        Ok(Self {
            client: Client::new(),
            api_key,
            endpoint,
            config,
            state,
        })
    }

    async fn request(&self, texts: &[String]) -> EmberResult<Vec<Vec<f32>>> {
        let request = VoyageEmbedRequest {
            input: texts,
            model: &self.config.model,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| EmberError::api(format!("Failed to call Voyage API: {}", e)))?;

        if !response.status().is_success() {
            let error = response.text().await.unwrap_or_default();
            return Err(EmberError::embedding(format!("Voyage API error: {}", error)));
        }

        let mut result: VoyageEmbedResponse = response
            .json()
            .await
            .map_err(|e| EmberError::embedding(format!("Failed to parse response: {}", e)))?;

        result.data.sort_by_key(|e| e.index);
        Ok(result.data.into_iter().map(|e| e.embedding).collect())
    }
}

#[async_trait]
impl Embedder for VoyageEmbedder {
    async fn initialize(&self) -> EmberResult<()> {
        let probe = self.embed(ProbeState::text()).await;
        self.state.record(self.name(), probe)
    }

    async fn embed(&self, text: &str) -> EmberResult<Vec<f32>> {
        self.request(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmberError::embedding("No embedding returned"))
    }

    async fn embed_batch(&self, texts: &[String]) -> EmberResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        self.request(texts).await
    }

    fn dimension(&self) -> usize {
        self.state.dimension()
    }

    fn name(&self) -> &str {
        "voyage"
    }

    fn is_available(&self) -> bool {
        self.state.is_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmbedderConfig {
        EmbedderConfig {
            model: "voyage-3-lite".to_string(),
            embedding_dims: 512,
            api_key: Some("pa-test".to_string()),
            base_url: None,
        }
    }

    #[test]
    fn test_endpoint_from_base_url() {
        let embedder = VoyageEmbedder::new(config()).unwrap();
        assert_eq!(embedder.endpoint, "https://api.voyageai.com/v1/embeddings");

        let embedder = VoyageEmbedder::new(EmbedderConfig {
            base_url: Some("http://localhost:9000/v1/".to_string()),
            ..config()
        })
        .unwrap();
        assert_eq!(embedder.endpoint, "http://localhost:9000/v1/embeddings");
    }

    #[test]
    fn test_request_serialization() {
        let input = vec!["a walk".to_string()];
        let body = serde_json::to_value(VoyageEmbedRequest {
            input: &input,
            model: "voyage-3-lite",
        })
        .unwrap();
        assert_eq!(body["input"][0], "a walk");
        assert_eq!(body["model"], "voyage-3-lite");
    }

    #[test]
    fn test_response_parsing() {
        let response: VoyageEmbedResponse = serde_json::from_value(serde_json::json!({
            "object": "list",
            "data": [{"object": "embedding", "embedding": [0.5, 0.25], "index": 0}],
            "model": "voyage-3-lite"
        }))
        .unwrap();
        assert_eq!(response.data[0].embedding, vec![0.5, 0.25]);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_initialize() {
        let embedder = VoyageEmbedder::new(EmbedderConfig {
            base_url: Some("http://127.0.0.1:9/v1".to_string()),
            ..config()
        })
        .unwrap();
        assert!(embedder.initialize().await.is_err());
        assert!(!embedder.is_available());
    }
}
