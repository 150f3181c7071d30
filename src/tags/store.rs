//! Tag and category stores
//!
//! Both follow the same upsert lifecycle: first registration creates the
//! record, every later registration bumps `usage_count` and refreshes
//! `last_used_at`. Tags additionally carry an embedding attached at creation
//! time when the provider is up; categories never do, since category matching
//! is always exact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::{EngineError, Result};
use crate::embedding::provider::EmbeddingProvider;
use crate::store::JsonTable;

/// A stored tag with usage statistics and optional embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagRecord {
    pub tag: String,
    pub usage_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    /// Empty when generation failed at creation time
    #[serde(default)]
    pub embedding: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_generated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
}

/// A stored category with usage statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub category: String,
    pub usage_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

impl UpsertOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertOutcome::Created => "created",
            UpsertOutcome::Updated => "updated",
        }
    }
}

/// Sort order for tag listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagSort {
    #[default]
    Usage,
    Alphabetical,
    Recent,
}

impl TagSort {
    pub const NAMES: [&'static str; 3] = ["usage", "alphabetical", "recent"];

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "usage" => Some(TagSort::Usage),
            "alphabetical" => Some(TagSort::Alphabetical),
            "recent" => Some(TagSort::Recent),
            _ => None,
        }
    }
}

/// Aggregate statistics over the tag vocabulary
#[derive(Debug, Serialize)]
pub struct TagStats {
    pub total_tags: usize,
    pub total_usage: u64,
    pub most_used_tag: Option<String>,
    pub most_used_count: u64,
    pub average_usage: f64,
}

/// Normalize a tag name: trimmed, lowercase. The store holds at most one
/// record per normalized name.
pub fn normalize_tag(name: &str) -> String {
    name.trim().to_lowercase()
}

pub struct TagStore {
    table: JsonTable<TagRecord>,
}

impl TagStore {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            table: JsonTable::open(path)?,
        })
    }

    /// Register a tag. Existing records get their usage bumped; new records
    /// get an embedding attached when the provider cooperates, and an empty
    /// one when it doesn't; embedding failure never fails registration.
    pub fn upsert(&mut self, name: &str, provider: &dyn EmbeddingProvider) -> Result<UpsertOutcome> {
        let tag = normalize_tag(name);
        if tag.is_empty() {
            return Err(EngineError::InvalidInput(
                "tag name must not be empty".to_string(),
            ));
        }

        let now = Utc::now();
        let updated = self.table.update_where(
            |r| r.tag == tag,
            |r| {
                r.usage_count += 1;
                r.last_used_at = now;
            },
        );
        if updated > 0 {
            return Ok(UpsertOutcome::Updated);
        }

        let embedding = provider.embed(&tag);
        if embedding.is_none() && provider.available() {
            tracing::debug!(tag = %tag, "embedding generation failed, storing tag without one");
        }

        let record = match embedding {
            Some(values) => TagRecord {
                tag,
                usage_count: 1,
                created_at: now,
                last_used_at: now,
                embedding: values,
                embedding_generated_at: Some(now),
                embedding_model: Some(provider.model().to_string()),
            },
            None => TagRecord {
                tag,
                usage_count: 1,
                created_at: now,
                last_used_at: now,
                embedding: Vec::new(),
                embedding_generated_at: None,
                embedding_model: None,
            },
        };

        self.table.insert(record);
        Ok(UpsertOutcome::Created)
    }

    pub fn get(&self, name: &str) -> Option<&TagRecord> {
        let tag = normalize_tag(name);
        self.table.find(|r| r.tag == tag)
    }

    pub fn all(&self) -> &[TagRecord] {
        self.table.records()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// All tags in the requested order.
    pub fn sorted(&self, sort: TagSort) -> Vec<TagRecord> {
        let mut tags = self.table.records().to_vec();
        match sort {
            TagSort::Usage => tags.sort_by(|a, b| b.usage_count.cmp(&a.usage_count)),
            TagSort::Alphabetical => tags.sort_by(|a, b| a.tag.cmp(&b.tag)),
            TagSort::Recent => tags.sort_by(|a, b| b.last_used_at.cmp(&a.last_used_at)),
        }
        tags
    }

    pub fn stats(&self) -> TagStats {
        let tags = self.table.records();
        let total_usage: u64 = tags.iter().map(|t| t.usage_count).sum();
        let most_used = tags.iter().max_by_key(|t| t.usage_count);

        TagStats {
            total_tags: tags.len(),
            total_usage,
            most_used_tag: most_used.map(|t| t.tag.clone()),
            most_used_count: most_used.map(|t| t.usage_count).unwrap_or(0),
            average_usage: if tags.is_empty() {
                0.0
            } else {
                total_usage as f64 / tags.len() as f64
            },
        }
    }

    pub fn commit(&mut self) -> Result<()> {
        self.table.commit()
    }
}

pub struct CategoryStore {
    table: JsonTable<CategoryRecord>,
}

impl CategoryStore {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            table: JsonTable::open(path)?,
        })
    }

    pub fn upsert(&mut self, name: &str) -> Result<UpsertOutcome> {
        let category = name.trim().to_string();
        if category.is_empty() {
            return Err(EngineError::InvalidInput(
                "category name must not be empty".to_string(),
            ));
        }

        let now = Utc::now();
        let lowered = category.to_lowercase();
        let updated = self.table.update_where(
            |r| r.category.to_lowercase() == lowered,
            |r| {
                r.usage_count += 1;
                r.last_used_at = now;
            },
        );
        if updated > 0 {
            return Ok(UpsertOutcome::Updated);
        }

        self.table.insert(CategoryRecord {
            category,
            usage_count: 1,
            created_at: now,
            last_used_at: now,
        });
        Ok(UpsertOutcome::Created)
    }

    pub fn all(&self) -> &[CategoryRecord] {
        self.table.records()
    }

    pub fn names(&self) -> Vec<String> {
        self.table
            .records()
            .iter()
            .map(|r| r.category.clone())
            .collect()
    }

    /// Case-insensitive existence check.
    pub fn contains(&self, name: &str) -> bool {
        let lowered = name.trim().to_lowercase();
        self.table
            .records()
            .iter()
            .any(|r| r.category.to_lowercase() == lowered)
    }

    pub fn commit(&mut self) -> Result<()> {
        self.table.commit()
    }
}
