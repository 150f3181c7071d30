//! Similar-tag lookup
//!
//! Scores the query against every stored tag, preferring embedding cosine
//! similarity and degrading to lexical substring matching when embeddings are
//! out of play. Used standalone for tag suggestions and internally by the
//! mapper and search expansion.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::embedding::provider::EmbeddingProvider;
use crate::embedding::similarity::cosine_similarity;
use crate::tags::store::{normalize_tag, TagStore};

/// A tag scored against a query
#[derive(Debug, Clone, Serialize)]
pub struct SimilarTag {
    pub tag: String,
    pub similarity: f32,
    pub usage_count: u64,
    pub last_used: DateTime<Utc>,
}

pub struct SimilarTagFinder<'a> {
    store: &'a TagStore,
    provider: &'a dyn EmbeddingProvider,
}

impl<'a> SimilarTagFinder<'a> {
    pub fn new(store: &'a TagStore, provider: &'a dyn EmbeddingProvider) -> Self {
        Self { store, provider }
    }

    /// Ranked tags similar to `query`, most similar first, ties broken by
    /// usage count. An empty store yields an empty result.
    ///
    /// Embedding similarity is tried first; when it produces zero candidates
    /// (provider down, no stored embeddings, or nothing cleared the
    /// threshold) lexical scoring takes over so the engine keeps working
    /// without a network.
    pub fn find_similar(&self, query: &str, limit: usize, min_similarity: f32) -> Vec<SimilarTag> {
        self.find_similar_with_total(query, limit, min_similarity).0
    }

    /// Same as [`find_similar`](Self::find_similar), additionally reporting
    /// how many tags cleared the threshold before the limit was applied.
    pub fn find_similar_with_total(
        &self,
        query: &str,
        limit: usize,
        min_similarity: f32,
    ) -> (Vec<SimilarTag>, usize) {
        let query = normalize_tag(query);
        if query.is_empty() || self.store.is_empty() {
            return (Vec::new(), 0);
        }

        let mut candidates = self.embedding_candidates(&query, min_similarity);
        if candidates.is_empty() {
            candidates = self.lexical_candidates(&query, min_similarity);
        }

        candidates.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.usage_count.cmp(&a.usage_count))
        });
        let total = candidates.len();
        candidates.truncate(limit);
        (candidates, total)
    }

    fn embedding_candidates(&self, query: &str, min_similarity: f32) -> Vec<SimilarTag> {
        let Some(query_emb) = self.provider.embed(query) else {
            return Vec::new();
        };

        self.store
            .all()
            .iter()
            .filter(|record| record.embedding.len() == query_emb.len() && !record.embedding.is_empty())
            .filter_map(|record| {
                let similarity = cosine_similarity(&query_emb, &record.embedding);
                if similarity >= min_similarity && record.tag != query {
                    Some(SimilarTag {
                        tag: record.tag.clone(),
                        similarity,
                        usage_count: record.usage_count,
                        last_used: record.last_used_at,
                    })
                } else {
                    None
                }
            })
            .collect()
    }

    fn lexical_candidates(&self, query: &str, min_similarity: f32) -> Vec<SimilarTag> {
        self.store
            .all()
            .iter()
            .filter_map(|record| {
                let score = lexical_score(query, &record.tag)?;
                if score >= min_similarity && record.tag != query {
                    Some(SimilarTag {
                        tag: record.tag.clone(),
                        similarity: score,
                        usage_count: record.usage_count,
                        last_used: record.last_used_at,
                    })
                } else {
                    None
                }
            })
            .collect()
    }
}

/// Fixed-tier lexical similarity. `None` means no lexical relationship.
fn lexical_score(query: &str, tag: &str) -> Option<f32> {
    if tag.contains(query) {
        Some(0.8)
    } else if tag.split_whitespace().any(|word| query.contains(word)) {
        Some(0.6)
    } else if query.split_whitespace().any(|word| tag.contains(word)) {
        Some(0.4)
    } else {
        None
    }
}
