//! Tag engine
//!
//! Keeps the tag vocabulary consolidated: every stored tag carries usage
//! counters and (when a provider is configured) an embedding, and incoming
//! tags are steered toward existing ones instead of growing the vocabulary
//! unchecked.
//!
//! # Components
//!
//! - `store`: tag and category stores with upsert lifecycle
//! - `finder`: similarity lookup with lexical fallback
//! - `mapper`: smart tag mapping for memorize operations

pub mod finder;
pub mod mapper;
pub mod store;

pub use finder::{SimilarTag, SimilarTagFinder};
pub use mapper::{MappingOutcome, SmartTagMapper};
pub use store::{
    normalize_tag, CategoryRecord, CategoryStore, TagRecord, TagSort, TagStats, TagStore,
    UpsertOutcome,
};
