//! Embedding generation and similarity scoring

pub mod provider;
pub mod similarity;

pub use provider::{from_env, EmbeddingProvider, GeminiEmbedder, NullEmbedder};
pub use similarity::{cosine_similarity, weighted_combine};
