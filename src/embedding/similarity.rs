//! Vector similarity scoring
//!
//! Pure math over embedding vectors. Malformed input (empty vectors, length
//! mismatch, zero norm) yields "no match" rather than an error: for tag
//! purposes, "unrelated" and "unscorable" are the same outcome.

use serde::Serialize;

use crate::core::{EngineError, Result};
use crate::embedding::provider::EmbeddingProvider;

/// Cosine similarity clamped to [0, 1].
///
/// Negative cosine (semantically opposite vectors) floors to 0; the domain
/// treats "opposite" and "unrelated" as equally non-matching.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a > 0.0 && norm_b > 0.0 {
        (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Weighted sum of two vectors, re-normalized to unit length.
///
/// Only the ratio of the weights matters: (0.7, 0.3) and (7, 3) produce the
/// same direction. Returns `None` on length mismatch, empty input, or when
/// the combination cancels to zero norm.
pub fn weighted_combine(
    primary: &[f32],
    context: &[f32],
    primary_weight: f32,
    context_weight: f32,
) -> Option<Vec<f32>> {
    if primary.is_empty() || context.is_empty() || primary.len() != context.len() {
        return None;
    }

    let combined: Vec<f32> = primary
        .iter()
        .zip(context.iter())
        .map(|(p, c)| p * primary_weight + c * context_weight)
        .collect();

    let norm: f32 = combined.iter().map(|x| x * x).sum::<f32>().sqrt();
    if !(norm > 0.0 && norm.is_finite()) {
        return None;
    }

    Some(combined.iter().map(|x| x / norm).collect())
}

/// Similarity of a query against a text, optionally blended with context.
#[derive(Debug, Serialize)]
pub struct TextSimilarity {
    pub similarity: f32,
    pub model: String,
    pub context_used: bool,
}

/// Compute semantic similarity between `query` and `text`.
///
/// When `context` is non-empty, the text and context embeddings are combined
/// as a weighted sum (then re-normalized) before comparison, so the text is
/// evaluated in light of its surroundings while still dominating the score.
pub fn compute_text_similarity(
    provider: &dyn EmbeddingProvider,
    query: &str,
    text: &str,
    context: Option<&str>,
    text_weight: f32,
    context_weight: f32,
) -> Result<TextSimilarity> {
    if !provider.available() {
        return Err(EngineError::EmbeddingUnavailable(format!(
            "set {} to enable semantic similarity",
            crate::embedding::provider::API_KEY_ENV
        )));
    }

    let query_emb = provider
        .embed(query)
        .ok_or_else(|| EngineError::EmbeddingUnavailable("failed to embed query".to_string()))?;
    let text_emb = provider
        .embed(text)
        .ok_or_else(|| EngineError::EmbeddingUnavailable("failed to embed text".to_string()))?;

    let context = context.map(str::trim).filter(|c| !c.is_empty());

    let target_emb = match context {
        Some(ctx) => {
            let context_emb = provider.embed(ctx).ok_or_else(|| {
                EngineError::EmbeddingUnavailable("failed to embed context".to_string())
            })?;
            weighted_combine(&text_emb, &context_emb, text_weight, context_weight).ok_or_else(
                || {
                    EngineError::EmbeddingUnavailable(
                        "failed to combine text and context embeddings".to_string(),
                    )
                },
            )?
        }
        None => text_emb,
    };

    Ok(TextSimilarity {
        similarity: cosine_similarity(&query_emb, &target_emb),
        model: provider.model().to_string(),
        context_used: context.is_some(),
    })
}

#[derive(Debug, Serialize)]
pub struct RankedText {
    pub index: usize,
    pub text: String,
    pub similarity: f32,
}

#[derive(Debug, Serialize)]
pub struct RankOutcome {
    pub ranked: Vec<RankedText>,
    /// Indexes of candidates that could not be embedded
    pub failed: Vec<usize>,
    pub model: String,
}

/// Rank candidate texts by semantic similarity to a query, best first.
pub fn rank_texts_by_similarity(
    provider: &dyn EmbeddingProvider,
    query: &str,
    candidates: &[String],
) -> Result<RankOutcome> {
    if !provider.available() {
        return Err(EngineError::EmbeddingUnavailable(format!(
            "set {} to enable semantic ranking",
            crate::embedding::provider::API_KEY_ENV
        )));
    }
    if candidates.is_empty() {
        return Err(EngineError::InvalidInput(
            "no candidate texts provided".to_string(),
        ));
    }

    let query_emb = provider
        .embed(query)
        .ok_or_else(|| EngineError::EmbeddingUnavailable("failed to embed query".to_string()))?;

    let mut ranked = Vec::new();
    let mut failed = Vec::new();

    for (index, candidate) in candidates.iter().enumerate() {
        match provider.embed(candidate) {
            Some(emb) => ranked.push(RankedText {
                index,
                text: candidate.clone(),
                similarity: cosine_similarity(&query_emb, &emb),
            }),
            None => failed.push(index),
        }
    }

    ranked.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(RankOutcome {
        ranked,
        failed,
        model: provider.model().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_similarity_is_one() {
        let v = vec![0.3, -0.5, 0.8, 0.1];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_vectors_score_zero() {
        let v = vec![1.0, 2.0];
        assert_eq!(cosine_similarity(&[], &v), 0.0);
        assert_eq!(cosine_similarity(&v, &[]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_dimension_mismatch_scores_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_opposite_vectors_floor_to_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_zero_norm_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_range_never_exceeds_one() {
        let a = vec![3.0, 4.0];
        let b = vec![6.0, 8.0];
        let s = cosine_similarity(&a, &b);
        assert!((0.0..=1.0).contains(&s));
        assert!((s - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_weighted_combine_zero_context_weight_keeps_direction() {
        let p = vec![2.0, 0.0, 0.0];
        let c = vec![0.0, 5.0, 0.0];
        let combined = weighted_combine(&p, &c, 0.7, 0.0).unwrap();
        assert!((cosine_similarity(&combined, &p) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_weighted_combine_ratio_invariance() {
        let p = vec![1.0, 2.0, 3.0];
        let c = vec![-1.0, 0.5, 2.0];
        let a = weighted_combine(&p, &c, 0.7, 0.3).unwrap();
        let b = weighted_combine(&p, &c, 7.0, 3.0).unwrap();
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_weighted_combine_result_is_unit_length() {
        let p = vec![1.0, 2.0];
        let c = vec![3.0, -1.0];
        let combined = weighted_combine(&p, &c, 0.6, 0.4).unwrap();
        let norm: f32 = combined.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_weighted_combine_cancellation_is_none() {
        let p = vec![1.0, 0.0];
        let c = vec![-1.0, 0.0];
        assert!(weighted_combine(&p, &c, 1.0, 1.0).is_none());
    }

    #[test]
    fn test_weighted_combine_mismatch_is_none() {
        assert!(weighted_combine(&[1.0], &[1.0, 2.0], 1.0, 1.0).is_none());
        assert!(weighted_combine(&[], &[], 1.0, 1.0).is_none());
    }

    #[test]
    fn test_rank_texts_survives_non_finite_similarity() {
        // Overflowing norms push the cosine to NaN; ranking must not panic
        // on the incomparable scores.
        struct HugeEmbedder;
        impl EmbeddingProvider for HugeEmbedder {
            fn embed(&self, _text: &str) -> Option<Vec<f32>> {
                Some(vec![f32::MAX, f32::MAX])
            }
            fn available(&self) -> bool {
                true
            }
            fn model(&self) -> &str {
                "huge"
            }
        }

        let candidates = vec!["a".to_string(), "b".to_string()];
        let result = rank_texts_by_similarity(&HugeEmbedder, "query", &candidates).unwrap();
        assert_eq!(result.ranked.len(), 2);
        assert!(result.failed.is_empty());
    }
}
