//! Memory storage and retrieval

pub mod engine;
pub mod records;

pub use engine::{
    parse_tag_list, CategoriesResult, ExpansionInfo, ListResult, MemorizeResult, MemoryEngine,
    MemoryStatistics, RegisteredTag, SearchResult, SimilarTagsResult, UpdateRequest, UpdateResult,
};
pub use records::{MemoryRecord, SuggestedCategory, SUGGESTED_CATEGORIES};
