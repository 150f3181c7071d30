//! Memory operations end to end: memorize with tag consolidation, search
//! with semantic expansion, category validation, and lifecycle updates.

mod common;

use std::sync::Arc;

use common::StubEmbedder;
use mnemo_mcp::core::config::DataPaths;
use mnemo_mcp::core::{Config, EngineError};
use mnemo_mcp::embedding::NullEmbedder;
use mnemo_mcp::memory::{MemoryEngine, UpdateRequest};

fn engine_with(dir: &tempfile::TempDir, provider: Arc<dyn mnemo_mcp::embedding::EmbeddingProvider>) -> MemoryEngine {
    MemoryEngine::new(
        DataPaths::from_root(dir.path().to_path_buf()),
        Config::default(),
        provider,
    )
}

#[test]
fn memorize_consolidates_tags_against_vocabulary() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(StubEmbedder::new(&[
        ("python", [1.0, 0.0, 0.0]),
        ("py", [0.98, 0.199, 0.0]),
    ]));
    let engine = engine_with(&dir, embedder);

    // first memory establishes the vocabulary
    engine
        .memorize("python list comprehensions", "python", None, 3, None)
        .unwrap();

    // second memory arrives with the abbreviation
    let result = engine
        .memorize("generator expressions", "py", None, 3, None)
        .unwrap();

    assert_eq!(result.memory.tags, vec!["python".to_string()]);
    assert_eq!(result.tag_mapping.auto_replacements, 1);
    assert!(result.tag_mapping.mapping_applied);

    // the python tag was reused, not duplicated
    let tags = engine
        .list_tags(mnemo_mcp::tags::TagSort::Usage, 50)
        .unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].tag, "python");
    assert_eq!(tags[0].usage_count, 2);
}

#[test]
fn search_expands_tag_filter_to_similar_tags() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(&dir, Arc::new(NullEmbedder));

    engine
        .memorize("ownership and borrowing notes", "rustlang", None, 3, None)
        .unwrap();

    // "rust" is not a stored tag, but the lexical fallback finds "rustlang"
    let result = engine.search("", "rust", "", 10, true).unwrap();
    assert_eq!(result.total_found, 1);

    let expansion = result.expansion.unwrap();
    assert!(expansion.expansion_occurred);
    assert!(expansion
        .expanded_tags
        .unwrap()
        .contains(&"rustlang".to_string()));

    // without expansion the same query misses
    let strict = engine.search("", "rust", "", 10, false).unwrap();
    assert_eq!(strict.total_found, 0);
}

#[test]
fn search_tag_filter_uses_or_semantics() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(&dir, Arc::new(NullEmbedder));

    engine.memorize("first", "alpha", None, 3, None).unwrap();
    engine.memorize("second", "beta", None, 3, None).unwrap();
    engine.memorize("third", "gamma", None, 3, None).unwrap();

    let result = engine.search("", "alpha, beta", "", 10, false).unwrap();
    assert_eq!(result.total_found, 2);
}

#[test]
fn invalid_category_fails_with_available_listing() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(&dir, Arc::new(NullEmbedder));

    engine
        .memorize("note a", "", Some("projects"), 3, None)
        .unwrap();
    engine
        .memorize("note b", "", Some("facts"), 3, None)
        .unwrap();

    let err = engine.search("", "", "project", 10, true).unwrap_err();
    match err {
        EngineError::UnknownCategory {
            category,
            available,
        } => {
            assert_eq!(category, "project");
            assert!(available.contains(&"projects".to_string()));
            assert!(available.contains(&"facts".to_string()));
        }
        other => panic!("unexpected error: {:?}", other),
    }

    // exact match is case-insensitive
    let result = engine.search("", "", "PROJECTS", 10, true).unwrap();
    assert_eq!(result.total_found, 1);
}

#[test]
fn category_usage_counts_accumulate() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(&dir, Arc::new(NullEmbedder));

    engine.memorize("a", "", Some("facts"), 3, None).unwrap();
    engine.memorize("b", "", Some("facts"), 3, None).unwrap();

    let categories = engine.categories().unwrap();
    assert_eq!(categories.total_categories, 1);
    assert_eq!(categories.existing_categories[0].category, "facts");
    assert_eq!(categories.existing_categories[0].usage_count, 2);
}

#[test]
fn full_memory_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(&dir, Arc::new(NullEmbedder));

    let stored = engine
        .memorize("draft note", "drafting", None, 2, None)
        .unwrap();
    let id = stored.memory.id.clone();

    let updated = engine
        .update(
            &id,
            UpdateRequest {
                content: Some("final note".to_string()),
                importance: Some(5),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.memory.content, "final note");
    assert_eq!(
        updated.updated_fields,
        vec!["content".to_string(), "importance".to_string()]
    );
    // untouched fields survive
    assert_eq!(updated.memory.tags, vec!["drafting".to_string()]);

    let recalled = engine.recall(&id).unwrap();
    assert_eq!(recalled.importance, 5);

    let deleted = engine.delete(&id).unwrap();
    assert_eq!(deleted.id, id);
    assert!(matches!(
        engine.recall(&id),
        Err(EngineError::MemoryNotFound(_))
    ));
}

#[test]
fn expired_memories_hidden_from_search_but_counted_in_stats() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(&dir, Arc::new(NullEmbedder));

    engine.memorize("current fact", "", None, 3, None).unwrap();
    engine
        .memorize("old fact", "", None, 3, Some("2020-06-01T12:00:00Z"))
        .unwrap();

    let search = engine.search("fact", "", "", 10, true).unwrap();
    assert_eq!(search.total_found, 1);

    let stats = engine.stats().unwrap();
    assert_eq!(stats.total_memories, 2);
    assert_eq!(stats.active_memories, 1);
    assert_eq!(stats.expired_memories, 1);
}

#[test]
fn mapping_failure_never_blocks_memorize() {
    let dir = tempfile::tempdir().unwrap();

    // Point the tag table at a path that cannot be a file so the mapper's
    // store open fails; the memory must still be stored with raw tags.
    let mut paths = DataPaths::from_root(dir.path().to_path_buf());
    std::fs::create_dir_all(dir.path().join("tags.json")).unwrap();
    paths.tags = dir.path().join("tags.json");

    let engine = MemoryEngine::new(paths, Config::default(), Arc::new(NullEmbedder));
    let result = engine
        .memorize("resilient note", "alpha, beta", None, 3, None)
        .unwrap();

    assert!(!result.tag_mapping.mapping_applied);
    assert_eq!(
        result.memory.tags,
        vec!["alpha".to_string(), "beta".to_string()]
    );
    assert!(result
        .tag_mapping
        .mapping_log
        .iter()
        .any(|line| line.contains("Tag mapping failed")));
}
