//! Shared test fixtures

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use mnemo_mcp::embedding::provider::EmbeddingProvider;

/// Deterministic embedder with canned vectors per text. Can be switched off
/// mid-test to simulate a provider outage.
pub struct StubEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    enabled: AtomicBool,
}

impl StubEmbedder {
    pub fn new(vectors: &[(&str, [f32; 3])]) -> Self {
        Self {
            vectors: vectors
                .iter()
                .map(|(text, v)| (text.to_string(), v.to_vec()))
                .collect(),
            enabled: AtomicBool::new(true),
        }
    }

    pub fn go_offline(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }
}

impl EmbeddingProvider for StubEmbedder {
    fn embed(&self, text: &str) -> Option<Vec<f32>> {
        if !self.enabled.load(Ordering::SeqCst) {
            return None;
        }
        self.vectors.get(text).cloned()
    }

    fn available(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn model(&self) -> &str {
        "stub"
    }
}
