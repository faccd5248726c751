//! ember-embeddings - Embedding provider implementations for ember.
//!
//! # Supported Providers
//!
//! - **OpenAI** (feature: `openai`) - text-embedding-3-small, text-embedding-3-large, etc.
//! - **Ollama** (feature: `ollama`) - Local embedding models via Ollama
//! - **Voyage** - voyage-3 family over plain HTTP
//!
//! Any provider that fails to construct or initialise degrades to the no-op
//! embedder, which disables semantic scoring without failing searches.
//!
//! # Example
//!
//! ```ignore
//! use ember_core::EngineConfig;
//! use ember_embeddings::EmbedderFactory;
//!
//! let config = EngineConfig::from_env()?;
//! let service = EmbedderFactory::service(&config).await;
//! println!("embedding with {}", service.provider_name());
//! ```

mod factory;
mod ollama;
mod openai;
mod probe;
mod voyage;

pub use factory::EmbedderFactory;
pub use ollama::OllamaEmbedder;
pub use openai::OpenAIEmbedder;
pub use voyage::VoyageEmbedder;

// Re-export core types for convenience
pub use ember_core::traits::{Embedder, EmbedderConfig, EmbedderProvider};
