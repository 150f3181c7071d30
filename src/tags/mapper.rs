//! Smart tag mapping
//!
//! Steers a memory's raw tags toward the existing vocabulary so the tag set
//! stays consolidated: near-duplicates are replaced outright, looser matches
//! compete in a candidate pool ranked against the memory's content, and the
//! result is capped to a small fixed count. Mapping is best-effort: any
//! failure falls back to the caller's original tags so it can never block a
//! store operation.

use std::path::Path;

use serde::Serialize;

use crate::core::config::MapperConfig;
use crate::core::Result;
use crate::embedding::provider::EmbeddingProvider;
use crate::embedding::similarity::cosine_similarity;
use crate::tags::finder::SimilarTagFinder;
use crate::tags::store::{normalize_tag, TagStore};

/// Result of one mapping run, including the transparency trail
#[derive(Debug, Clone, Serialize)]
pub struct MappingOutcome {
    pub final_tags: Vec<String>,
    pub mapping_applied: bool,
    pub transparency_info: String,
    pub mapping_log: Vec<String>,
    pub auto_replacements: usize,
    pub original_tags: Vec<String>,
    pub candidates_considered: usize,
}

/// A pooled candidate awaiting content-weighted ranking
struct PoolEntry {
    tag: String,
    tag_similarity: f32,
    usage_count: u64,
    source: String,
    embedding: Vec<f32>,
    /// Filled in during ranking, reported when the entry wins a slot
    score_desc: String,
}

pub struct SmartTagMapper<'a> {
    config: &'a MapperConfig,
    provider: &'a dyn EmbeddingProvider,
}

impl<'a> SmartTagMapper<'a> {
    pub fn new(config: &'a MapperConfig, provider: &'a dyn EmbeddingProvider) -> Self {
        Self { config, provider }
    }

    /// Map raw tags to a bounded final set, consulting the tag store at
    /// `tags_path`. Never fails: any error inside the procedure degrades to
    /// the original tags with the failure noted in the log.
    pub fn map_tags(&self, tags_path: &Path, raw_tags: &[String], content: &str) -> MappingOutcome {
        let original_tags: Vec<String> = dedupe_normalized(raw_tags);

        match self.try_map(tags_path, &original_tags, content) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("tag mapping failed, using original tags: {}", e);
                let mut final_tags = original_tags.clone();
                final_tags.truncate(self.config.max_tags);
                MappingOutcome {
                    final_tags,
                    mapping_applied: false,
                    transparency_info: "Tag mapping unavailable; original tags kept".to_string(),
                    mapping_log: vec![format!("Tag mapping failed: {}", e)],
                    auto_replacements: 0,
                    original_tags,
                    candidates_considered: 0,
                }
            }
        }
    }

    fn try_map(
        &self,
        tags_path: &Path,
        original_tags: &[String],
        content: &str,
    ) -> Result<MappingOutcome> {
        if original_tags.is_empty() {
            return Ok(MappingOutcome {
                final_tags: Vec::new(),
                mapping_applied: false,
                transparency_info: "No tags provided".to_string(),
                mapping_log: Vec::new(),
                auto_replacements: 0,
                original_tags: Vec::new(),
                candidates_considered: 0,
            });
        }

        let store = TagStore::open(tags_path)?;
        let finder = SimilarTagFinder::new(&store, self.provider);

        let mut final_tags: Vec<String> = Vec::new();
        let mut log: Vec<String> = Vec::new();
        let mut auto_replacements = 0;
        let mut pool: Vec<PoolEntry> = Vec::new();

        for tag in original_tags {
            let similar = finder.find_similar(
                tag,
                self.config.finder_limit,
                self.config.finder_min_similarity,
            );

            // Hard substitution above the auto-replace threshold; content
            // plays no part in this decision.
            if let Some(best) = similar
                .iter()
                .find(|c| c.similarity > self.config.auto_replace_threshold)
            {
                auto_replacements += 1;
                log.push(format!(
                    "Auto-replaced '{}' → '{}' (similarity: {:.2})",
                    tag, best.tag, best.similarity
                ));
                if !final_tags.contains(&best.tag) {
                    final_tags.push(best.tag.clone());
                }
                continue;
            }

            for candidate in &similar {
                if candidate.similarity > self.config.pool_threshold {
                    pool.push(PoolEntry {
                        tag: candidate.tag.clone(),
                        tag_similarity: candidate.similarity,
                        usage_count: candidate.usage_count,
                        source: format!("similar to '{}'", tag),
                        embedding: store
                            .get(&candidate.tag)
                            .map(|r| r.embedding.clone())
                            .unwrap_or_default(),
                        score_desc: String::new(),
                    });
                }
            }

            // The unreplaced input stays eligible at a fixed moderate score
            // so genuinely novel tags can still win a slot.
            pool.push(PoolEntry {
                tag: tag.clone(),
                tag_similarity: self.config.original_tag_score,
                usage_count: store.get(tag).map(|r| r.usage_count).unwrap_or(0),
                source: "original".to_string(),
                embedding: store.get(tag).map(|r| r.embedding.clone()).unwrap_or_default(),
                score_desc: String::new(),
            });
        }

        let candidates_considered = pool.len();

        if final_tags.len() < self.config.max_tags {
            let open_slots = self.config.max_tags - final_tags.len();
            self.rank_pool(&mut pool, content);

            let mut selected = 0;
            for entry in &pool {
                if selected == open_slots {
                    break;
                }
                if final_tags.contains(&entry.tag) {
                    continue;
                }
                log.push(format!(
                    "Selected '{}' ({}, {})",
                    entry.tag, entry.score_desc, entry.source
                ));
                final_tags.push(entry.tag.clone());
                selected += 1;
            }
        }

        final_tags.truncate(self.config.max_tags);

        let mapping_applied = final_tags != original_tags;
        let transparency_info = if mapping_applied {
            format!(
                "Smart tag mapping applied: {} auto-replacement(s), {} candidate(s) considered",
                auto_replacements, candidates_considered
            )
        } else {
            "Tags kept as provided".to_string()
        };

        Ok(MappingOutcome {
            final_tags,
            mapping_applied,
            transparency_info,
            mapping_log: log,
            auto_replacements,
            original_tags: original_tags.to_vec(),
            candidates_considered,
        })
    }

    /// Order the pool best-first. With a content embedding in hand the score
    /// blends tag similarity, content similarity, and a capped usage bonus;
    /// without one, ranking degrades to tag similarity then usage count.
    ///
    /// Novel tags have no stored embedding, so their content similarity is
    /// computed against a freshly embedded tag text. An entry that cannot be
    /// embedded at all scores its bare tag similarity rather than a blend
    /// with a zero content term.
    fn rank_pool(&self, pool: &mut Vec<PoolEntry>, content: &str) {
        let content_emb = if content.trim().is_empty() {
            None
        } else {
            self.provider.embed(content)
        };

        match content_emb {
            Some(content_emb) => {
                let mut scored: Vec<(f32, PoolEntry)> = pool
                    .drain(..)
                    .map(|mut entry| {
                        let tag_emb = if entry.embedding.is_empty() {
                            self.provider.embed(&entry.tag)
                        } else {
                            Some(std::mem::take(&mut entry.embedding))
                        };
                        let combined = match tag_emb {
                            Some(tag_emb) => {
                                let content_sim = cosine_similarity(&content_emb, &tag_emb);
                                let usage_bonus = (entry.usage_count as f32
                                    * self.config.usage_bonus_step)
                                    .min(self.config.usage_bonus_cap);
                                entry.score_desc = format!("content sim: {:.2}", content_sim);
                                self.config.tag_weight * entry.tag_similarity
                                    + self.config.content_weight * content_sim
                                    + usage_bonus
                            }
                            None => {
                                entry.score_desc =
                                    format!("tag sim: {:.2}", entry.tag_similarity);
                                entry.tag_similarity
                            }
                        };
                        (combined, entry)
                    })
                    .collect();
                scored.sort_by(|a, b| {
                    b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal)
                });

                *pool = scored.into_iter().map(|(_, entry)| entry).collect();
            }
            None => {
                pool.sort_by(|a, b| {
                    b.tag_similarity
                        .partial_cmp(&a.tag_similarity)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then(b.usage_count.cmp(&a.usage_count))
                });
                for entry in pool.iter_mut() {
                    entry.score_desc = format!("tag sim: {:.2}", entry.tag_similarity);
                }
            }
        }
    }
}

/// Lowercase, trim, drop empties, dedupe preserving order.
fn dedupe_normalized(tags: &[String]) -> Vec<String> {
    let mut seen = Vec::new();
    for tag in tags {
        let normalized = normalize_tag(tag);
        if !normalized.is_empty() && !seen.contains(&normalized) {
            seen.push(normalized);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::NullEmbedder;
    use crate::tags::store::TagStore;

    fn seeded(dir: &tempfile::TempDir, tags: &[&str]) -> std::path::PathBuf {
        let path = dir.path().join("tags.json");
        let mut store = TagStore::open(&path).unwrap();
        for tag in tags {
            store.upsert(tag, &NullEmbedder).unwrap();
        }
        store.commit().unwrap();
        path
    }

    fn strings(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_empty_input_yields_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded(&dir, &[]);
        let config = MapperConfig::default();
        let mapper = SmartTagMapper::new(&config, &NullEmbedder);

        let outcome = mapper.map_tags(&path, &[], "some content");
        assert!(outcome.final_tags.is_empty());
        assert!(!outcome.mapping_applied);
    }

    #[test]
    fn test_output_never_exceeds_max_tags() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded(&dir, &[]);
        let config = MapperConfig::default();
        let mapper = SmartTagMapper::new(&config, &NullEmbedder);

        let raw = strings(&["a", "b", "c", "d", "e", "f"]);
        let outcome = mapper.map_tags(&path, &raw, "");
        assert!(outcome.final_tags.len() <= config.max_tags);
    }

    #[test]
    fn test_provider_outage_still_returns_tags() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded(&dir, &["python"]);
        let config = MapperConfig::default();
        let mapper = SmartTagMapper::new(&config, &NullEmbedder);

        let outcome = mapper.map_tags(&path, &strings(&["rust", "tokio"]), "async runtime notes");
        assert!(!outcome.final_tags.is_empty());
        assert_eq!(outcome.original_tags, strings(&["rust", "tokio"]));
    }

    #[test]
    fn test_duplicate_inputs_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded(&dir, &[]);
        let config = MapperConfig::default();
        let mapper = SmartTagMapper::new(&config, &NullEmbedder);

        let outcome = mapper.map_tags(&path, &strings(&["Rust", "rust", " rust "]), "");
        assert_eq!(outcome.final_tags, strings(&["rust"]));
    }

    #[test]
    fn test_novel_tags_survive_with_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded(&dir, &[]);
        let config = MapperConfig::default();
        let mapper = SmartTagMapper::new(&config, &NullEmbedder);

        let outcome = mapper.map_tags(&path, &strings(&["quantum", "entanglement"]), "");
        assert_eq!(
            outcome.final_tags,
            strings(&["quantum", "entanglement"])
        );
        assert!(!outcome.mapping_applied);
    }
}
