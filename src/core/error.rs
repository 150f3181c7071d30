//! Engine error taxonomy
//!
//! Heuristic failures (missing embeddings, scoring edge cases) never surface
//! here; they degrade silently inside the tag engine. This type covers the
//! failures a caller must act on: store I/O, bad input, unknown category.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store record malformed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("memory '{0}' not found")]
    MemoryNotFound(String),

    #[error("memory '{0}' has expired")]
    MemoryExpired(String),

    /// Category filters are exact-match; an unknown name is a usage mistake
    /// the caller should correct, so the full listing rides along.
    #[error("category '{category}' not found. Available categories: {}", available.join(", "))]
    UnknownCategory {
        category: String,
        available: Vec<String>,
    },

    #[error("embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("{0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
