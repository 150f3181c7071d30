//! Memory engine
//!
//! Owns the three JSON tables (memories, tags, categories) and implements the
//! memory operations end to end: storing runs tags through the smart mapper
//! before insert, searching runs filter tags through semantic expansion, and
//! expired records are excluded everywhere except raw stats.
//!
//! Each operation opens its tables, mutates, and commits before returning;
//! see the `store` module for the durability contract.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::core::config::DataPaths;
use crate::core::{Config, EngineError, Result};
use crate::embedding::provider::EmbeddingProvider;
use crate::memory::records::{MemoryRecord, SuggestedCategory, SUGGESTED_CATEGORIES};
use crate::store::JsonTable;
use crate::tags::{
    normalize_tag, CategoryRecord, CategoryStore, MappingOutcome, SimilarTag, SimilarTagFinder,
    SmartTagMapper, TagRecord, TagSort, TagStats, TagStore,
};

/// One tag's registration outcome during memorize/update
#[derive(Debug, Serialize)]
pub struct RegisteredTag {
    pub tag: String,
    pub outcome: String,
}

#[derive(Debug, Serialize)]
pub struct MemorizeResult {
    pub memory: MemoryRecord,
    pub tag_mapping: MappingOutcome,
    pub tag_registration: Vec<RegisteredTag>,
}

#[derive(Debug, Serialize)]
pub struct ListResult {
    pub memories: Vec<MemoryRecord>,
    pub total_active: usize,
    pub returned_count: usize,
}

/// How the tag filter was expanded for a search
#[derive(Debug, Serialize)]
pub struct ExpansionInfo {
    pub original_tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expanded_tags: Option<Vec<String>>,
    pub expansion_occurred: bool,
}

#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub memories: Vec<MemoryRecord>,
    pub total_found: usize,
    pub returned_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expansion: Option<ExpansionInfo>,
}

#[derive(Debug, Default)]
pub struct UpdateRequest {
    pub content: Option<String>,
    pub tags: Option<String>,
    pub category: Option<String>,
    pub importance: Option<u8>,
    pub expires_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateResult {
    pub memory: MemoryRecord,
    pub updated_fields: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MemoryStatistics {
    pub total_memories: usize,
    pub active_memories: usize,
    pub expired_memories: usize,
    pub importance_distribution: BTreeMap<u8, usize>,
    pub category_distribution: BTreeMap<String, usize>,
    pub total_tags: usize,
    pub total_categories: usize,
}

#[derive(Debug, Serialize)]
pub struct SimilarTagsResult {
    pub similar_tags: Vec<SimilarTag>,
    /// Matches above the threshold, counted before the limit was applied
    pub total_found: usize,
}

#[derive(Debug, Serialize)]
pub struct CategoriesResult {
    pub existing_categories: Vec<CategoryRecord>,
    pub suggested_categories: Vec<SuggestedCategory>,
    pub total_categories: usize,
}

pub struct MemoryEngine {
    paths: DataPaths,
    config: Config,
    provider: Arc<dyn EmbeddingProvider>,
}

impl MemoryEngine {
    pub fn new(paths: DataPaths, config: Config, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            paths,
            config,
            provider,
        }
    }

    /// Engine rooted at the configured data directory, with config loaded
    /// from disk and the embedding provider taken from the environment.
    pub fn open() -> Self {
        let data_dir = crate::core::config::get_data_dir();
        let config = Config::load(&data_dir);
        let provider = crate::embedding::provider::from_env();
        Self::new(DataPaths::from_root(data_dir), config, provider)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Store a memory. Tags run through smart mapping first; mapping failure
    /// degrades to the raw tags and never blocks the insert. Tag and
    /// category registration after the insert is best-effort.
    pub fn memorize(
        &self,
        content: &str,
        tags: &str,
        category: Option<&str>,
        importance: u8,
        expires_at: Option<&str>,
    ) -> Result<MemorizeResult> {
        let content = content.trim();
        if content.is_empty() {
            return Err(EngineError::InvalidInput(
                "content must not be empty".to_string(),
            ));
        }
        validate_importance(importance)?;

        let expires_at = parse_expiry(expires_at)?;
        let category = category.map(str::trim).filter(|c| !c.is_empty());

        let raw_tags = parse_tag_list(tags);
        let mapper = SmartTagMapper::new(&self.config.mapper, self.provider.as_ref());
        let mapping = mapper.map_tags(&self.paths.tags, &raw_tags, content);

        let now = Utc::now();
        let memory = MemoryRecord {
            id: Uuid::new_v4().to_string(),
            content: content.to_string(),
            created_at: now,
            last_modified: now,
            tags: mapping.final_tags.clone(),
            category: category.map(str::to_string),
            importance,
            expires_at,
            metadata: serde_json::Map::new(),
        };

        let mut memories: JsonTable<MemoryRecord> = JsonTable::open(&self.paths.memories)?;
        memories.insert(memory.clone());
        memories.commit()?;

        let tag_registration = self.register_tags(&memory.tags);
        if let Some(cat) = &memory.category {
            self.bump_category(cat);
        }

        Ok(MemorizeResult {
            memory,
            tag_mapping: mapping,
            tag_registration,
        })
    }

    /// Fetch one memory by id. Expired memories are reported as expired, not
    /// as missing.
    pub fn recall(&self, memory_id: &str) -> Result<MemoryRecord> {
        let memories: JsonTable<MemoryRecord> = JsonTable::open(&self.paths.memories)?;
        let memory = memories
            .find(|m| m.id == memory_id)
            .ok_or_else(|| EngineError::MemoryNotFound(memory_id.to_string()))?;

        if memory.is_expired(Utc::now()) {
            return Err(EngineError::MemoryExpired(memory_id.to_string()));
        }
        Ok(memory.clone())
    }

    /// Active memories, most important first, then most recent.
    pub fn list(&self, limit: usize) -> Result<ListResult> {
        let memories: JsonTable<MemoryRecord> = JsonTable::open(&self.paths.memories)?;
        let now = Utc::now();

        let mut active: Vec<MemoryRecord> = memories
            .records()
            .iter()
            .filter(|m| !m.is_expired(now))
            .cloned()
            .collect();
        sort_by_relevance(&mut active);

        let total_active = active.len();
        active.truncate(limit);

        Ok(ListResult {
            returned_count: active.len(),
            memories: active,
            total_active,
        })
    }

    /// Search active memories. Content query words must all appear in the
    /// content; the tag filter matches if any stored tag intersects the
    /// (optionally expanded) filter set; category is exact match and
    /// validated up front.
    pub fn search(
        &self,
        query: &str,
        tags: &str,
        category: &str,
        limit: usize,
        semantic: bool,
    ) -> Result<SearchResult> {
        let category = category.trim();
        if !category.is_empty() {
            self.check_category(category)?;
        }

        let filter_tags = parse_tag_list(tags);
        let expansion = if semantic && !filter_tags.is_empty() {
            Some(self.expand_tags(&filter_tags)?)
        } else {
            None
        };

        let memories: JsonTable<MemoryRecord> = JsonTable::open(&self.paths.memories)?;
        let now = Utc::now();

        let query_words: Vec<String> = query
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect();

        let effective_tags: Option<Vec<String>> = if filter_tags.is_empty() {
            None
        } else {
            Some(match &expansion {
                Some(info) => info
                    .expanded_tags
                    .clone()
                    .unwrap_or_else(|| info.original_tags.clone()),
                None => filter_tags.clone(),
            })
        };

        let mut matched: Vec<MemoryRecord> = memories
            .records()
            .iter()
            .filter(|m| !m.is_expired(now))
            .filter(|m| {
                let content = m.content.to_lowercase();
                query_words.iter().all(|w| content.contains(w))
            })
            .filter(|m| match &effective_tags {
                Some(filter) => m.tags.iter().any(|t| filter.contains(t)),
                None => true,
            })
            .filter(|m| {
                category.is_empty()
                    || m.category
                        .as_deref()
                        .is_some_and(|c| c.eq_ignore_ascii_case(category))
            })
            .cloned()
            .collect();
        sort_by_relevance(&mut matched);

        let total_found = matched.len();
        matched.truncate(limit);

        Ok(SearchResult {
            returned_count: matched.len(),
            memories: matched,
            total_found,
            expansion,
        })
    }

    /// Update fields of an existing memory. Unset fields are left alone; an
    /// update with nothing to change is an input error. New tags are
    /// registered but not re-mapped.
    pub fn update(&self, memory_id: &str, request: UpdateRequest) -> Result<UpdateResult> {
        let mut memories: JsonTable<MemoryRecord> = JsonTable::open(&self.paths.memories)?;
        if memories.find(|m| m.id == memory_id).is_none() {
            return Err(EngineError::MemoryNotFound(memory_id.to_string()));
        }

        let mut updated_fields = Vec::new();

        let content = request
            .content
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        if content.is_some() {
            updated_fields.push("content".to_string());
        }

        let tags = request
            .tags
            .as_deref()
            .map(parse_tag_list)
            .filter(|t| !t.is_empty());
        if tags.is_some() {
            updated_fields.push("tags".to_string());
        }

        let category = request
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        if category.is_some() {
            updated_fields.push("category".to_string());
        }

        if let Some(importance) = request.importance {
            validate_importance(importance)?;
            updated_fields.push("importance".to_string());
        }

        let expires_at = parse_expiry(request.expires_at.as_deref())?;
        if expires_at.is_some() {
            updated_fields.push("expires_at".to_string());
        }

        if updated_fields.is_empty() {
            return Err(EngineError::InvalidInput(
                "no valid updates provided".to_string(),
            ));
        }

        let now = Utc::now();
        memories.update_where(
            |m| m.id == memory_id,
            |m| {
                if let Some(content) = &content {
                    m.content = content.clone();
                }
                if let Some(tags) = &tags {
                    m.tags = tags.clone();
                }
                if let Some(category) = &category {
                    m.category = Some(category.clone());
                }
                if let Some(importance) = request.importance {
                    m.importance = importance;
                }
                if let Some(expiry) = expires_at {
                    m.expires_at = Some(expiry);
                }
                m.last_modified = now;
            },
        );
        memories.commit()?;

        if let Some(tags) = &tags {
            self.register_tags(tags);
        }
        if let Some(category) = &category {
            self.bump_category(category);
        }

        let memory = memories
            .find(|m| m.id == memory_id)
            .cloned()
            .ok_or_else(|| EngineError::MemoryNotFound(memory_id.to_string()))?;

        Ok(UpdateResult {
            memory,
            updated_fields,
        })
    }

    /// Delete a memory, returning the removed record.
    pub fn delete(&self, memory_id: &str) -> Result<MemoryRecord> {
        let mut memories: JsonTable<MemoryRecord> = JsonTable::open(&self.paths.memories)?;
        let mut removed = memories.remove_where(|m| m.id == memory_id);
        match removed.pop() {
            Some(memory) => {
                memories.commit()?;
                Ok(memory)
            }
            None => Err(EngineError::MemoryNotFound(memory_id.to_string())),
        }
    }

    pub fn stats(&self) -> Result<MemoryStatistics> {
        let memories: JsonTable<MemoryRecord> = JsonTable::open(&self.paths.memories)?;
        let tags = TagStore::open(&self.paths.tags)?;
        let categories = CategoryStore::open(&self.paths.categories)?;

        let now = Utc::now();
        let mut active = 0;
        let mut expired = 0;
        let mut importance_distribution: BTreeMap<u8, usize> =
            (1u8..=5).map(|i| (i, 0)).collect();
        let mut category_distribution: BTreeMap<String, usize> = BTreeMap::new();

        for memory in memories.records() {
            if memory.is_expired(now) {
                expired += 1;
            } else {
                active += 1;
            }
            if let Some(count) = importance_distribution.get_mut(&memory.importance) {
                *count += 1;
            }
            if let Some(category) = &memory.category {
                *category_distribution.entry(category.clone()).or_insert(0) += 1;
            }
        }

        Ok(MemoryStatistics {
            total_memories: memories.len(),
            active_memories: active,
            expired_memories: expired,
            importance_distribution,
            category_distribution,
            total_tags: tags.len(),
            total_categories: categories.all().len(),
        })
    }

    /// Stored categories (most used first) plus the fixed suggestions.
    pub fn categories(&self) -> Result<CategoriesResult> {
        let store = CategoryStore::open(&self.paths.categories)?;
        let mut existing = store.all().to_vec();
        existing.sort_by(|a, b| b.usage_count.cmp(&a.usage_count));

        Ok(CategoriesResult {
            total_categories: existing.len(),
            existing_categories: existing,
            suggested_categories: SUGGESTED_CATEGORIES.to_vec(),
        })
    }

    /// Similar stored tags for a query. Empty store yields an empty list.
    pub fn find_similar_tags(
        &self,
        query: &str,
        limit: usize,
        min_similarity: f32,
    ) -> Result<SimilarTagsResult> {
        let store = TagStore::open(&self.paths.tags)?;
        let finder = SimilarTagFinder::new(&store, self.provider.as_ref());
        let (similar_tags, total_found) =
            finder.find_similar_with_total(query, limit, min_similarity);
        Ok(SimilarTagsResult {
            similar_tags,
            total_found,
        })
    }

    pub fn list_tags(&self, sort: TagSort, limit: usize) -> Result<Vec<TagRecord>> {
        let store = TagStore::open(&self.paths.tags)?;
        let mut tags = store.sorted(sort);
        tags.truncate(limit);
        Ok(tags)
    }

    pub fn tag_stats(&self) -> Result<TagStats> {
        Ok(TagStore::open(&self.paths.tags)?.stats())
    }

    pub fn provider(&self) -> &dyn EmbeddingProvider {
        self.provider.as_ref()
    }

    /// Expand filter tags through the similar-tag finder and union with the
    /// originals.
    fn expand_tags(&self, filter_tags: &[String]) -> Result<ExpansionInfo> {
        let store = TagStore::open(&self.paths.tags)?;
        let finder = SimilarTagFinder::new(&store, self.provider.as_ref());

        let mut expanded: Vec<String> = filter_tags.to_vec();
        for tag in filter_tags {
            for similar in finder.find_similar(
                tag,
                self.config.expansion.limit,
                self.config.expansion.min_similarity,
            ) {
                if !expanded.contains(&similar.tag) {
                    expanded.push(similar.tag);
                }
            }
        }

        let expansion_occurred = expanded.len() > filter_tags.len();
        Ok(ExpansionInfo {
            original_tags: filter_tags.to_vec(),
            expanded_tags: if expansion_occurred {
                Some(expanded)
            } else {
                None
            },
            expansion_occurred,
        })
    }

    /// Fail fast on a category that doesn't exist, listing what does.
    fn check_category(&self, category: &str) -> Result<()> {
        let store = CategoryStore::open(&self.paths.categories)?;
        if store.contains(category) {
            Ok(())
        } else {
            Err(EngineError::UnknownCategory {
                category: category.to_string(),
                available: store.names(),
            })
        }
    }

    /// Register final tags after a store operation. Failures are logged and
    /// swallowed; tag bookkeeping never undoes a stored memory.
    fn register_tags(&self, tags: &[String]) -> Vec<RegisteredTag> {
        let mut registered = Vec::new();
        match TagStore::open(&self.paths.tags) {
            Ok(mut store) => {
                for tag in tags {
                    match store.upsert(tag, self.provider.as_ref()) {
                        Ok(outcome) => registered.push(RegisteredTag {
                            tag: tag.clone(),
                            outcome: outcome.as_str().to_string(),
                        }),
                        Err(e) => tracing::warn!(tag = %tag, "tag registration failed: {}", e),
                    }
                }
                if let Err(e) = store.commit() {
                    tracing::warn!("tag store commit failed: {}", e);
                }
            }
            Err(e) => tracing::warn!("tag store open failed: {}", e),
        }
        registered
    }

    fn bump_category(&self, category: &str) {
        let bump = || -> Result<()> {
            let mut store = CategoryStore::open(&self.paths.categories)?;
            store.upsert(category)?;
            store.commit()
        };
        if let Err(e) = bump() {
            tracing::warn!(category = %category, "category usage update failed: {}", e);
        }
    }
}

/// Importance is a 1-5 scale.
fn validate_importance(importance: u8) -> Result<()> {
    if (1..=5).contains(&importance) {
        Ok(())
    } else {
        Err(EngineError::InvalidInput(format!(
            "importance must be between 1 and 5, got {}",
            importance
        )))
    }
}

/// Split a comma-separated tag string into normalized, deduplicated tags.
pub fn parse_tag_list(tags: &str) -> Vec<String> {
    let mut parsed = Vec::new();
    for tag in tags.split(',') {
        let normalized = normalize_tag(tag);
        if !normalized.is_empty() && !parsed.contains(&normalized) {
            parsed.push(normalized);
        }
    }
    parsed
}

fn parse_expiry(expires_at: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = expires_at.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| Some(dt.with_timezone(&Utc)))
        .map_err(|_| {
            EngineError::InvalidInput(format!(
                "invalid expiration date format: {}. Use ISO 8601 (RFC 3339)",
                raw
            ))
        })
}

/// Importance descending, then creation time descending.
fn sort_by_relevance(memories: &mut [MemoryRecord]) {
    memories.sort_by(|a, b| {
        b.importance
            .cmp(&a.importance)
            .then(b.created_at.cmp(&a.created_at))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::NullEmbedder;

    fn engine(dir: &tempfile::TempDir) -> MemoryEngine {
        MemoryEngine::new(
            DataPaths::from_root(dir.path().to_path_buf()),
            Config::default(),
            Arc::new(NullEmbedder),
        )
    }

    #[test]
    fn test_parse_tag_list() {
        assert_eq!(
            parse_tag_list("Python, web-dev , python,,"),
            vec!["python".to_string(), "web-dev".to_string()]
        );
        assert!(parse_tag_list("").is_empty());
    }

    #[test]
    fn test_memorize_and_recall() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);

        let result = engine
            .memorize("likes espresso", "coffee, preferences", Some("preferences"), 4, None)
            .unwrap();
        assert_eq!(result.memory.importance, 4);
        assert_eq!(result.memory.tags, vec!["coffee", "preferences"]);

        let recalled = engine.recall(&result.memory.id).unwrap();
        assert_eq!(recalled.content, "likes espresso");
    }

    #[test]
    fn test_recall_missing_and_expired() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);

        assert!(matches!(
            engine.recall("nope"),
            Err(EngineError::MemoryNotFound(_))
        ));

        let stored = engine
            .memorize("ephemeral", "", None, 3, Some("2020-01-01T00:00:00Z"))
            .unwrap();
        assert!(matches!(
            engine.recall(&stored.memory.id),
            Err(EngineError::MemoryExpired(_))
        ));
    }

    #[test]
    fn test_memorize_rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);

        assert!(engine.memorize("", "", None, 3, None).is_err());
        assert!(engine.memorize("x", "", None, 0, None).is_err());
        assert!(engine.memorize("x", "", None, 6, None).is_err());
        assert!(engine.memorize("x", "", None, 3, Some("not-a-date")).is_err());
    }

    #[test]
    fn test_search_query_requires_all_words() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);

        engine.memorize("rust async runtime", "", None, 3, None).unwrap();
        engine.memorize("rust borrow checker", "", None, 3, None).unwrap();

        let result = engine.search("rust async", "", "", 10, true).unwrap();
        assert_eq!(result.total_found, 1);
        assert_eq!(result.memories[0].content, "rust async runtime");
    }

    #[test]
    fn test_search_unknown_category_lists_available() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);

        engine
            .memorize("note", "", Some("projects"), 3, None)
            .unwrap();

        let err = engine.search("", "", "nonexistent", 10, true).unwrap_err();
        match err {
            EngineError::UnknownCategory {
                category,
                available,
            } => {
                assert_eq!(category, "nonexistent");
                assert_eq!(available, vec!["projects".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_search_orders_by_importance_then_recency() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);

        engine.memorize("minor note", "", None, 1, None).unwrap();
        engine.memorize("major note", "", None, 5, None).unwrap();

        let result = engine.search("note", "", "", 10, false).unwrap();
        assert_eq!(result.memories[0].content, "major note");
    }

    #[test]
    fn test_list_excludes_expired() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);

        engine.memorize("keep", "", None, 3, None).unwrap();
        engine
            .memorize("gone", "", None, 3, Some("2020-01-01T00:00:00Z"))
            .unwrap();

        let result = engine.list(10).unwrap();
        assert_eq!(result.total_active, 1);
        assert_eq!(result.memories[0].content, "keep");
    }

    #[test]
    fn test_update_fields_and_reject_empty_update() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);

        let stored = engine.memorize("draft", "", None, 2, None).unwrap();

        let result = engine
            .update(
                &stored.memory.id,
                UpdateRequest {
                    content: Some("final".to_string()),
                    importance: Some(5),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(result.memory.content, "final");
        assert_eq!(result.memory.importance, 5);
        assert!(result.updated_fields.contains(&"content".to_string()));
        assert!(result.memory.last_modified >= result.memory.created_at);

        assert!(matches!(
            engine.update(&stored.memory.id, UpdateRequest::default()),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_delete_returns_record() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);

        let stored = engine.memorize("to remove", "", None, 3, None).unwrap();
        let removed = engine.delete(&stored.memory.id).unwrap();
        assert_eq!(removed.content, "to remove");

        assert!(engine.delete(&stored.memory.id).is_err());
        assert!(engine.recall(&stored.memory.id).is_err());
    }

    #[test]
    fn test_stats_counts() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);

        engine
            .memorize("a", "alpha", Some("facts"), 5, None)
            .unwrap();
        engine
            .memorize("b", "beta", Some("facts"), 3, Some("2020-01-01T00:00:00Z"))
            .unwrap();

        let stats = engine.stats().unwrap();
        assert_eq!(stats.total_memories, 2);
        assert_eq!(stats.active_memories, 1);
        assert_eq!(stats.expired_memories, 1);
        assert_eq!(stats.importance_distribution[&5], 1);
        assert_eq!(stats.category_distribution["facts"], 2);
        assert_eq!(stats.total_tags, 2);
        assert_eq!(stats.total_categories, 1);
    }

    #[test]
    fn test_categories_include_suggestions() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);

        let result = engine.categories().unwrap();
        assert_eq!(result.total_categories, 0);
        assert_eq!(result.suggested_categories.len(), 8);
        assert_eq!(result.suggested_categories[0].name, "user_context");
    }
}
