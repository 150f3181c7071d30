//! Remote embedding provider
//!
//! Wraps the Google Generative Language embedding endpoint. The contract is
//! deliberately lossy: `embed` returns `None` on any failure (missing key,
//! network error, malformed response) and never panics or errors, because
//! every consumer in the tag engine has a non-embedding fallback path.

use std::sync::Arc;

/// Default embedding model
pub const DEFAULT_MODEL: &str = "gemini-embedding-001";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Embedding source abstraction
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text. `None` means "no embedding available"; the
    /// caller decides whether that matters (in this engine it never blocks).
    fn embed(&self, text: &str) -> Option<Vec<f32>>;

    /// True only when the provider is configured and expected to work.
    fn available(&self) -> bool;

    /// Model identifier, recorded as provenance on stored tag embeddings.
    fn model(&self) -> &str;
}

/// Google Generative Language embedder
pub struct GeminiEmbedder {
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl GeminiEmbedder {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Build from `GOOGLE_API_KEY`, or `None` when unset.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var(API_KEY_ENV).ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        Some(Self::new(&api_key, DEFAULT_MODEL))
    }

    fn request(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let url = format!(
            "{}/models/{}:embedContent?key={}",
            API_BASE, self.model, self.api_key
        );

        let body = serde_json::json!({
            "content": { "parts": [{ "text": text }] },
        });

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            anyhow::bail!("embedding endpoint returned status {}: {}", status, body);
        }

        let json: serde_json::Value = response.json()?;

        let values = json
            .get("embedding")
            .and_then(|e| e.get("values"))
            .and_then(|v| v.as_array())
            .ok_or_else(|| anyhow::anyhow!("missing embedding values in response"))?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        Ok(values)
    }

    // reqwest's blocking client refuses to run on an async worker thread;
    // when called from inside the MCP runtime the request must be moved to a
    // blocking-allowed section.
    fn request_anywhere(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        #[cfg(feature = "mcp")]
        if tokio::runtime::Handle::try_current().is_ok() {
            return tokio::task::block_in_place(|| self.request(text));
        }
        self.request(text)
    }
}

impl EmbeddingProvider for GeminiEmbedder {
    fn embed(&self, text: &str) -> Option<Vec<f32>> {
        match self.request_anywhere(text) {
            Ok(values) => Some(values),
            Err(e) => {
                tracing::debug!("embedding request failed: {}", e);
                None
            }
        }
    }

    fn available(&self) -> bool {
        true
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Stand-in provider for deployments without an API key. Everything that
/// consumes embeddings degrades to its lexical/usage-based fallback.
pub struct NullEmbedder;

impl EmbeddingProvider for NullEmbedder {
    fn embed(&self, _text: &str) -> Option<Vec<f32>> {
        None
    }

    fn available(&self) -> bool {
        false
    }

    fn model(&self) -> &str {
        "none"
    }
}

/// Create the provider from the environment.
pub fn from_env() -> Arc<dyn EmbeddingProvider> {
    match GeminiEmbedder::from_env() {
        Some(embedder) => Arc::new(embedder),
        None => {
            tracing::debug!(
                "{} not set; running with lexical tag matching only",
                API_KEY_ENV
            );
            Arc::new(NullEmbedder)
        }
    }
}
