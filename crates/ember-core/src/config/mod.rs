//! Configuration system for ember.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EmberError, EmberResult};
use crate::grouping::ClusterConfig;
use crate::retrieval::ScoringWeights;
use crate::traits::{EmbedderConfig, EmbedderProvider};

/// Embedder provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderProviderConfig {
    /// Provider type.
    pub provider: EmbedderProvider,
    /// Provider-specific configuration.
    #[serde(flatten)]
    pub config: EmbedderConfig,
}

impl EmbedderProviderConfig {
    /// Configuration for a provider using its default model.
    pub fn for_provider(provider: EmbedderProvider) -> Self {
        let (model, dims) = provider.default_model();
        Self {
            provider,
            config: EmbedderConfig {
                model: model.to_string(),
                embedding_dims: dims,
                ..Default::default()
            },
        }
    }
}

impl Default for EmbedderProviderConfig {
    fn default() -> Self {
        Self::for_provider(EmbedderProvider::None)
    }
}

/// Embedding service and vector scan settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Minimum delay between provider calls on cache misses.
    pub rate_limit_ms: u64,
    /// Per-call provider timeout.
    pub timeout_ms: u64,
    /// Default `limit` for similarity scans.
    pub scan_limit: usize,
    /// Default `threshold` for similarity scans.
    pub scan_threshold: f64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            rate_limit_ms: 100,
            timeout_ms: 10_000,
            scan_limit: 50,
            scan_threshold: 0.0,
        }
    }
}

/// Relevance scoring settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    /// Half-life of the recency signal, in days.
    pub recency_half_life_days: f64,
    /// Semantic similarity at or below this does not count toward inclusion.
    pub semantic_threshold: f64,
    /// Page size when a request gives no limit.
    pub default_limit: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            recency_half_life_days: 30.0,
            semantic_threshold: 0.3,
            default_limit: 20,
        }
    }
}

impl ScoringConfig {
    /// Check weights, half-life, threshold and page size.
    pub fn validate(&self) -> EmberResult<()> {
        self.weights
            .validate()
            .map_err(|msg| EmberError::validation("scoring.weights", msg))?;
        let half_life = self.recency_half_life_days;
        if !half_life.is_finite() || half_life <= 0.0 {
            return Err(EmberError::out_of_range(
                "scoring.recency_half_life_days",
                "must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.semantic_threshold) {
            return Err(EmberError::out_of_range(
                "scoring.semantic_threshold",
                "must be between 0.0 and 1.0",
            ));
        }
        if self.default_limit == 0 {
            return Err(EmberError::out_of_range(
                "scoring.default_limit",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Pattern evolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Snapshots retained per pattern.
    pub history_limit: usize,
    /// Values considered by trend regression.
    pub trend_window: usize,
    /// Snapshot count at which prediction confidence stops growing.
    pub prediction_saturation: usize,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            history_limit: 50,
            trend_window: 10,
            prediction_saturation: 20,
        }
    }
}

impl EvolutionConfig {
    /// History must hold at least two snapshots and trends need three points.
    pub fn validate(&self) -> EmberResult<()> {
        if self.history_limit < 2 {
            return Err(EmberError::out_of_range(
                "evolution.history_limit",
                "must be at least 2",
            ));
        }
        if self.trend_window < 3 {
            return Err(EmberError::out_of_range(
                "evolution.trend_window",
                "must be at least 3",
            ));
        }
        Ok(())
    }
}

/// Main engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub embedder: EmbedderProviderConfig,
    pub embedding: EmbeddingSettings,
    pub scoring: ScoringConfig,
    pub clustering: ClusterConfig,
    pub evolution: EvolutionConfig,
}

impl EngineConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> EmberResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| EmberError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| EmberError::Configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| EmberError::Configuration(e.to_string()))?,
            _ => {
                return Err(EmberError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `EMBER_*` environment variables.
    pub fn from_env() -> EmberResult<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from a variable lookup.
    fn from_vars(get: impl Fn(&str) -> Option<String>) -> EmberResult<Self> {
        let mut config = Self::default();

        if let Some(provider) = get("EMBER_EMBEDDING_PROVIDER") {
            let provider = EmbedderProvider::from_str(provider.trim()).map_err(|_| {
                EmberError::UnsupportedProvider {
                    provider: provider.clone(),
                }
            })?;
            config.embedder = EmbedderProviderConfig::for_provider(provider);
        }
        if let Some(model) = get("EMBER_EMBEDDING_MODEL") {
            config.embedder.config.model = model;
        }
        if let Some(dims) = get("EMBER_EMBEDDING_DIMS") {
            config.embedder.config.embedding_dims = parse_var("EMBER_EMBEDDING_DIMS", &dims)?;
        }
        if let Some(url) = get("EMBER_EMBEDDING_BASE_URL") {
            config.embedder.config.base_url = Some(url);
        }

        let key_var = match config.embedder.provider {
            EmbedderProvider::OpenAI => Some("OPENAI_API_KEY"),
            EmbedderProvider::Voyage => Some("VOYAGE_API_KEY"),
            _ => None,
        };
        if let Some(api_key) = get("EMBER_EMBEDDING_API_KEY").or_else(|| key_var.and_then(&get))
        {
            config.embedder.config.api_key = Some(api_key);
        }

        if let Some(ms) = get("EMBER_RATE_LIMIT_MS") {
            config.embedding.rate_limit_ms = parse_var("EMBER_RATE_LIMIT_MS", &ms)?;
        }
        if let Some(ms) = get("EMBER_EMBEDDING_TIMEOUT_MS") {
            config.embedding.timeout_ms = parse_var("EMBER_EMBEDDING_TIMEOUT_MS", &ms)?;
        }
        if let Some(t) = get("EMBER_CLUSTER_THRESHOLD") {
            config.clustering.similarity_threshold = parse_var("EMBER_CLUSTER_THRESHOLD", &t)?;
        }
        if let Some(n) = get("EMBER_MIN_CLUSTER_SIZE") {
            config.clustering.min_cluster_size = parse_var("EMBER_MIN_CLUSTER_SIZE", &n)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from `EMBER_CONFIG`, else `<config dir>/ember/config.toml`, else
    /// the environment.
    pub fn load_default() -> EmberResult<Self> {
        if let Ok(path) = std::env::var("EMBER_CONFIG") {
            debug!(path = %path, "Loading config from EMBER_CONFIG");
            return Self::from_file(path);
        }
        if let Some(path) = Self::default_path().filter(|p| p.exists()) {
            debug!(path = %path.display(), "Loading config from default location");
            return Self::from_file(path);
        }
        Self::from_env()
    }

    /// Default config file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ember").join("config.toml"))
    }

    /// Check ranges and weight sanity.
    pub fn validate(&self) -> EmberResult<()> {
        self.scoring.validate()?;
        if !(-1.0..=1.0).contains(&self.embedding.scan_threshold) {
            return Err(EmberError::out_of_range(
                "embedding.scan_threshold",
                "must be between -1.0 and 1.0",
            ));
        }
        if self.embedding.timeout_ms == 0 {
            return Err(EmberError::out_of_range(
                "embedding.timeout_ms",
                "must be at least 1",
            ));
        }
        self.clustering
            .validate()
            .map_err(|msg| EmberError::validation("clustering", msg))?;
        self.evolution.validate()
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> EmberResult<T> {
    value.trim().parse().map_err(|_| {
        EmberError::validation_with_suggestion(
            name,
            format!("cannot parse '{}'", value),
            "Check the environment variable value",
        )
    })
}

/// Builder for EngineConfig.
#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Set embedder configuration.
    pub fn embedder(mut self, config: EmbedderProviderConfig) -> Self {
        self.config.embedder = config;
        self
    }

    /// Set embedding service settings.
    pub fn embedding(mut self, settings: EmbeddingSettings) -> Self {
        self.config.embedding = settings;
        self
    }

    /// Set scoring weights.
    pub fn weights(mut self, weights: ScoringWeights) -> Self {
        self.config.scoring.weights = weights;
        self
    }

    pub fn scoring(mut self, scoring: ScoringConfig) -> Self {
        self.config.scoring = scoring;
        self
    }

    pub fn clustering(mut self, clustering: ClusterConfig) -> Self {
        self.config.clustering = clustering;
        self
    }

    pub fn evolution(mut self, evolution: EvolutionConfig) -> Self {
        self.config.evolution = evolution;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> EmberResult<EngineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.embedder.provider, EmbedderProvider::None);
        assert_eq!(config.embedding.rate_limit_ms, 100);
        assert_eq!(config.embedding.scan_limit, 50);
        assert_eq!(config.clustering.min_cluster_size, 3);
        assert_eq!(config.evolution.history_limit, 50);
    }

    #[test]
    fn test_from_vars_selects_provider() {
        let config = EngineConfig::from_vars(vars(&[
            ("EMBER_EMBEDDING_PROVIDER", "Ollama"),
            ("EMBER_RATE_LIMIT_MS", "250"),
        ]))
        .unwrap();
        assert_eq!(config.embedder.provider, EmbedderProvider::Ollama);
        assert_eq!(config.embedder.config.model, "nomic-embed-text");
        assert_eq!(config.embedding.rate_limit_ms, 250);
    }

    #[test]
    fn test_unknown_provider_fails_fast() {
        let err = EngineConfig::from_vars(vars(&[("EMBER_EMBEDDING_PROVIDER", "word2vec")]))
            .unwrap_err();
        assert!(matches!(err, EmberError::UnsupportedProvider { .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_provider_api_key_fallback() {
        let config = EngineConfig::from_vars(vars(&[
            ("EMBER_EMBEDDING_PROVIDER", "voyage"),
            ("VOYAGE_API_KEY", "vk"),
        ]))
        .unwrap();
        assert_eq!(config.embedder.config.api_key.as_deref(), Some("vk"));
    }

    #[test]
    fn test_bad_number_names_variable() {
        let err =
            EngineConfig::from_vars(vars(&[("EMBER_MIN_CLUSTER_SIZE", "three")])).unwrap_err();
        assert!(err.to_string().contains("EMBER_MIN_CLUSTER_SIZE"));
    }

    #[test]
    fn test_toml_partial_config() {
        let config: EngineConfig = toml::from_str(
            r#"
            [embedder]
            provider = "openai"
            model = "text-embedding-3-large"
            embedding_dims = 3072

            [clustering]
            similarity_threshold = 0.8
            "#,
        )
        .unwrap();
        assert_eq!(config.embedder.provider, EmbedderProvider::OpenAI);
        assert_eq!(config.embedder.config.embedding_dims, 3072);
        assert_eq!(config.clustering.similarity_threshold, 0.8);
        assert_eq!(config.clustering.min_cluster_size, 3);
        assert_eq!(config.scoring.recency_half_life_days, 30.0);
    }

    #[test]
    fn test_builder_rejects_bad_weights() {
        let weights = ScoringWeights {
            text: 0.9,
            semantic: 0.9,
            ..Default::default()
        };
        let err = EngineConfig::builder().weights(weights).build().unwrap_err();
        assert!(err.to_string().contains("scoring.weights"));
    }

    #[test]
    fn test_unsupported_extension() {
        let path = std::env::temp_dir().join("ember-config-test.ini");
        std::fs::write(&path, "x=1").unwrap();
        let err = EngineConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, EmberError::Configuration(_)));
        let _ = std::fs::remove_file(path);
    }
}
