//! mnemo configuration module
//!
//! Config is loaded from `mnemo.json` in the data directory; every field has
//! a default so a missing or partial file behaves sensibly. The mapper and
//! expansion thresholds are deliberately configurable: the shipped values
//! are the tuned defaults, not invariants.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file name inside the data directory
pub const CONFIG_FILE: &str = "mnemo.json";
/// Environment variable for data directory configuration
pub const DATA_PATH_ENV: &str = "MNEMO_DATA_PATH";
pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub mapper: MapperConfig,

    #[serde(default)]
    pub expansion: ExpansionConfig,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

/// Smart tag mapper tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapperConfig {
    /// Hard cap on tags attached to a single memory
    #[serde(default = "default_max_tags")]
    pub max_tags: usize,

    /// Similarity floor when querying the finder for each input tag
    #[serde(default = "default_finder_min_similarity")]
    pub finder_min_similarity: f32,

    /// How many finder candidates to consider per input tag
    #[serde(default = "default_finder_limit")]
    pub finder_limit: usize,

    /// Above this, an input tag is silently substituted with the existing one
    #[serde(default = "default_auto_replace_threshold")]
    pub auto_replace_threshold: f32,

    /// Above this, an existing tag joins the candidate pool
    #[serde(default = "default_pool_threshold")]
    pub pool_threshold: f32,

    /// Fixed score assigned to the unreplaced original tag in the pool
    #[serde(default = "default_original_tag_score")]
    pub original_tag_score: f32,

    /// Combined score: weight of finder similarity
    #[serde(default = "default_tag_weight")]
    pub tag_weight: f32,

    /// Combined score: weight of content-to-tag similarity
    #[serde(default = "default_content_weight")]
    pub content_weight: f32,

    /// Usage bonus per prior use of a tag
    #[serde(default = "default_usage_bonus_step")]
    pub usage_bonus_step: f32,

    /// Usage bonus ceiling
    #[serde(default = "default_usage_bonus_cap")]
    pub usage_bonus_cap: f32,
}

fn default_max_tags() -> usize {
    3
}

fn default_finder_min_similarity() -> f32 {
    0.7
}

fn default_finder_limit() -> usize {
    5
}

fn default_auto_replace_threshold() -> f32 {
    0.9
}

fn default_pool_threshold() -> f32 {
    0.75
}

fn default_original_tag_score() -> f32 {
    0.5
}

fn default_tag_weight() -> f32 {
    0.4
}

fn default_content_weight() -> f32 {
    0.5
}

fn default_usage_bonus_step() -> f32 {
    0.01
}

fn default_usage_bonus_cap() -> f32 {
    0.1
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            max_tags: default_max_tags(),
            finder_min_similarity: default_finder_min_similarity(),
            finder_limit: default_finder_limit(),
            auto_replace_threshold: default_auto_replace_threshold(),
            pool_threshold: default_pool_threshold(),
            original_tag_score: default_original_tag_score(),
            tag_weight: default_tag_weight(),
            content_weight: default_content_weight(),
            usage_bonus_step: default_usage_bonus_step(),
            usage_bonus_cap: default_usage_bonus_cap(),
        }
    }
}

/// Search-time semantic tag expansion tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpansionConfig {
    /// Similarity floor for pulling neighbours into the filter set
    #[serde(default = "default_expansion_min_similarity")]
    pub min_similarity: f32,

    /// Neighbours considered per filter tag
    #[serde(default = "default_expansion_limit")]
    pub limit: usize,
}

fn default_expansion_min_similarity() -> f32 {
    0.4
}

fn default_expansion_limit() -> usize {
    3
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            min_similarity: default_expansion_min_similarity(),
            limit: default_expansion_limit(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            mapper: MapperConfig::default(),
            expansion: ExpansionConfig::default(),
        }
    }
}

impl Config {
    pub fn load(data_dir: &Path) -> Self {
        let config_path = data_dir.join(CONFIG_FILE);

        if config_path.exists() {
            match Self::load_from_file(&config_path) {
                Ok(config) => {
                    if config.version > CONFIG_VERSION {
                        tracing::warn!(
                            "Config version {} is newer than supported version {}",
                            config.version,
                            CONFIG_VERSION
                        );
                    }
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load {}: {}. Using defaults.", CONFIG_FILE, e);
                }
            }
        }

        Self::default()
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        fs::create_dir_all(data_dir)?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(data_dir.join(CONFIG_FILE), content)?;
        Ok(())
    }
}

/// Resolved file locations for the three JSON tables
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub root: PathBuf,
    pub memories: PathBuf,
    pub tags: PathBuf,
    pub categories: PathBuf,
}

impl DataPaths {
    pub fn from_root(root: PathBuf) -> Self {
        Self {
            memories: root.join("memories.json"),
            tags: root.join("tags.json"),
            categories: root.join("categories.json"),
            root,
        }
    }
}

/// Get data directory from environment variable or current directory.
/// Priority: MNEMO_DATA_PATH env var > current directory
pub fn get_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(DATA_PATH_ENV) {
        return PathBuf::from(path);
    }
    std::env::current_dir().expect("Failed to get current directory")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, 1);
        assert_eq!(config.mapper.max_tags, 3);
        assert!((config.mapper.auto_replace_threshold - 0.9).abs() < f32::EPSILON);
        assert!((config.expansion.min_similarity - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_partial_config() {
        let json = r#"{"mapper": {"max_tags": 5}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.mapper.max_tags, 5);
        // untouched fields keep their defaults
        assert!((config.mapper.pool_threshold - 0.75).abs() < f32::EPSILON);
        assert_eq!(config.expansion.limit, 3);
    }

    #[test]
    fn test_data_paths() {
        let paths = DataPaths::from_root(PathBuf::from("/tmp/mnemo"));
        assert!(paths.memories.ends_with("memories.json"));
        assert!(paths.tags.ends_with("tags.json"));
        assert!(paths.categories.ends_with("categories.json"));
    }
}
