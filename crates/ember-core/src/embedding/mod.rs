//! Embedding subsystem: provider front end, cache, rate limiting and the
//! in-memory vector store.

mod cache;
mod noop;
mod rate_limit;
mod service;
mod similarity;
mod store;

pub use cache::EmbeddingCache;
pub use noop::NoopEmbedder;
pub use rate_limit::RateLimiter;
pub use service::EmbeddingService;
pub use similarity::{cosine_similarity, mean_pairwise_similarity, mean_vector};
pub use store::VectorStore;
