//! Memory MCP server implementation

use anyhow::Result;
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerInfo},
    tool, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::path::PathBuf;

use crate::core::{Config, EngineError};
use crate::embedding::similarity::{compute_text_similarity, rank_texts_by_similarity};
use crate::memory::{MemoryEngine, UpdateRequest};
use crate::tags::TagSort;

/// Parameters for the memorize tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct MemorizeParams {
    /// The information to memorize
    #[schemars(description = "The information to memorize")]
    pub content: String,
    /// Comma-separated tags (consolidated through smart tag mapping)
    #[schemars(description = "Comma-separated tags, e.g. 'rust, async, tokio'")]
    #[serde(default)]
    pub tags: String,
    /// Memory category (user_context, preferences, projects, ...)
    #[schemars(description = "Memory category (e.g. user_context, preferences, projects)")]
    #[serde(default)]
    pub category: Option<String>,
    /// Importance level 1-5, 5 most critical
    #[schemars(description = "Importance level 1-5 (default: 3)")]
    #[serde(default = "default_importance")]
    pub importance: u8,
    /// Optional expiration date in ISO 8601 format
    #[schemars(description = "Optional expiration date (ISO 8601, e.g. 2027-01-01T00:00:00Z)")]
    #[serde(default)]
    pub expires_at: Option<String>,
}

fn default_importance() -> u8 {
    3
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RecallParams {
    #[schemars(description = "ID of the memory to retrieve")]
    pub memory_id: String,
}

/// Parameters for search_memories
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchMemoriesParams {
    /// Words that must all appear in the memory content
    #[schemars(description = "Text to search for in memory content (all words must match)")]
    #[serde(default)]
    pub query: String,
    /// Comma-separated tag filter, expanded to similar tags when semantic search is on
    #[schemars(description = "Comma-separated tags to filter by (semantically expanded)")]
    #[serde(default)]
    pub tags: String,
    /// Category filter, exact match; invalid names fail with the valid list
    #[schemars(description = "Category to filter by (exact match)")]
    #[serde(default)]
    pub category: String,
    /// Maximum number of results (default: 10)
    #[schemars(description = "Maximum number of results (default: 10)")]
    #[serde(default = "default_search_limit")]
    pub limit: usize,
    /// Expand tag filters to semantically similar tags (default: true)
    #[schemars(description = "Enable semantic tag expansion (default: true)")]
    #[serde(default = "default_true")]
    pub semantic_search: bool,
}

fn default_search_limit() -> usize {
    10
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListMemoriesParams {
    /// Maximum number of memories to return (default: 20)
    #[schemars(description = "Maximum number of memories (default: 20)")]
    #[serde(default = "default_list_limit")]
    pub limit: usize,
}

fn default_list_limit() -> usize {
    20
}

/// Parameters for update_memory; unset fields are left unchanged
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateMemoryParams {
    #[schemars(description = "ID of the memory to update")]
    pub memory_id: String,
    #[schemars(description = "New content (omit to keep current)")]
    #[serde(default)]
    pub content: Option<String>,
    #[schemars(description = "New comma-separated tags (omit to keep current)")]
    #[serde(default)]
    pub tags: Option<String>,
    #[schemars(description = "New category (omit to keep current)")]
    #[serde(default)]
    pub category: Option<String>,
    #[schemars(description = "New importance 1-5 (omit to keep current)")]
    #[serde(default)]
    pub importance: Option<u8>,
    #[schemars(description = "New expiration date, ISO 8601 (omit to keep current)")]
    #[serde(default)]
    pub expires_at: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteMemoryParams {
    #[schemars(description = "ID of the memory to delete")]
    pub memory_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FindSimilarTagsParams {
    #[schemars(description = "Tag or phrase to find similar existing tags for")]
    pub query: String,
    #[schemars(description = "Maximum number of similar tags (default: 5)")]
    #[serde(default = "default_similar_limit")]
    pub limit: usize,
    #[schemars(description = "Minimum similarity score 0.0-1.0 (default: 0.4)")]
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,
}

fn default_similar_limit() -> usize {
    5
}

fn default_min_similarity() -> f32 {
    0.4
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListTagsParams {
    /// Sort order: usage, alphabetical, recent
    #[schemars(description = "Sort order: usage, alphabetical, recent (default: usage)")]
    #[serde(default = "default_tag_sort")]
    pub sort_by: String,
    #[schemars(description = "Maximum number of tags (default: 50)")]
    #[serde(default = "default_tags_limit")]
    pub limit: usize,
}

fn default_tag_sort() -> String {
    "usage".to_string()
}

fn default_tags_limit() -> usize {
    50
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ComputeSimilarityParams {
    #[schemars(description = "Query text")]
    pub query: String,
    #[schemars(description = "Text to compare the query against")]
    pub text: String,
    #[schemars(description = "Optional surrounding context blended into the text embedding")]
    #[serde(default)]
    pub context: Option<String>,
    #[schemars(description = "Weight of the text embedding when context is given (default: 0.7)")]
    #[serde(default = "default_text_weight")]
    pub text_weight: f32,
    #[schemars(description = "Weight of the context embedding (default: 0.3)")]
    #[serde(default = "default_context_weight")]
    pub context_weight: f32,
}

fn default_text_weight() -> f32 {
    0.7
}

fn default_context_weight() -> f32 {
    0.3
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RankTextsParams {
    #[schemars(description = "Query text to rank candidates against")]
    pub query: String,
    #[schemars(description = "Candidate texts to rank")]
    pub texts: Vec<String>,
}

/// Memory MCP service
#[derive(Clone)]
pub struct MemoryService {
    data_dir: PathBuf,
    tool_router: ToolRouter<Self>,
}

impl MemoryService {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            tool_router: Self::tool_router(),
        }
    }

    fn get_engine(&self) -> MemoryEngine {
        let config = Config::load(&self.data_dir);
        let provider = crate::embedding::provider::from_env();
        MemoryEngine::new(
            crate::core::config::DataPaths::from_root(self.data_dir.clone()),
            config,
            provider,
        )
    }
}

/// Serialize a payload and wrap it in a success result.
fn json_result(value: &serde_json::Value) -> Result<CallToolResult, McpError> {
    let output = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("JSON serialization failed: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(output)]))
}

fn to_value<T: serde::Serialize>(payload: &T) -> Result<serde_json::Value, McpError> {
    serde_json::to_value(payload)
        .map_err(|e| McpError::internal_error(format!("JSON serialization failed: {}", e), None))
}

/// Map an engine error onto the tool boundary: user-correctable mistakes
/// become `success: false` payloads the caller can act on, integrity
/// failures become protocol errors.
fn engine_error(e: EngineError) -> Result<CallToolResult, McpError> {
    match e {
        EngineError::Io(_) | EngineError::Json(_) => {
            Err(McpError::internal_error(e.to_string(), None))
        }
        EngineError::UnknownCategory {
            category,
            available,
        } => json_result(&serde_json::json!({
            "success": false,
            "error": format!("Category '{}' does not exist", category),
            "available_categories": available,
        })),
        other => json_result(&serde_json::json!({
            "success": false,
            "error": other.to_string(),
        })),
    }
}

#[tool_router]
impl MemoryService {
    /// Store a memory with smart tag consolidation
    #[tool(
        description = "Store information in persistent memory. Tags are consolidated against the existing vocabulary via smart tag mapping; the result reports what was mapped and why."
    )]
    async fn memorize(
        &self,
        params: Parameters<MemorizeParams>,
    ) -> Result<CallToolResult, McpError> {
        let engine = self.get_engine();
        match engine.memorize(
            &params.0.content,
            &params.0.tags,
            params.0.category.as_deref(),
            params.0.importance,
            params.0.expires_at.as_deref(),
        ) {
            Ok(result) => {
                let mut value = to_value(&result)?;
                value["success"] = serde_json::json!(true);
                value["message"] = serde_json::json!("Information memorized successfully");
                json_result(&value)
            }
            Err(e) => engine_error(e),
        }
    }

    /// Retrieve one memory by id
    #[tool(description = "Retrieve a specific memorized item by its ID.")]
    async fn recall_memory(
        &self,
        params: Parameters<RecallParams>,
    ) -> Result<CallToolResult, McpError> {
        let engine = self.get_engine();
        match engine.recall(&params.0.memory_id) {
            Ok(memory) => json_result(&serde_json::json!({
                "success": true,
                "memory": to_value(&memory)?,
            })),
            Err(e) => engine_error(e),
        }
    }

    /// Search memories with semantic tag expansion
    #[tool(
        description = "Search memorized information. Tag filters are expanded to semantically similar existing tags; categories are exact-match and an invalid category returns the list of valid ones."
    )]
    async fn search_memories(
        &self,
        params: Parameters<SearchMemoriesParams>,
    ) -> Result<CallToolResult, McpError> {
        let engine = self.get_engine();
        let limit = params.0.limit.clamp(1, 100);

        match engine.search(
            &params.0.query,
            &params.0.tags,
            &params.0.category,
            limit,
            params.0.semantic_search,
        ) {
            Ok(result) => {
                let mut value = to_value(&result)?;
                value["success"] = serde_json::json!(true);
                json_result(&value)
            }
            Err(e) => engine_error(e),
        }
    }

    /// List memories, most important first
    #[tool(description = "List all active memories, most important first.")]
    async fn list_memories(
        &self,
        params: Parameters<ListMemoriesParams>,
    ) -> Result<CallToolResult, McpError> {
        let engine = self.get_engine();
        let limit = params.0.limit.clamp(1, 500);

        match engine.list(limit) {
            Ok(result) => {
                let mut value = to_value(&result)?;
                value["success"] = serde_json::json!(true);
                json_result(&value)
            }
            Err(e) => engine_error(e),
        }
    }

    /// Update fields of an existing memory
    #[tool(
        description = "Update an existing memory. Only the provided fields change; omitted fields keep their current value."
    )]
    async fn update_memory(
        &self,
        params: Parameters<UpdateMemoryParams>,
    ) -> Result<CallToolResult, McpError> {
        let engine = self.get_engine();
        let request = UpdateRequest {
            content: params.0.content,
            tags: params.0.tags,
            category: params.0.category,
            importance: params.0.importance,
            expires_at: params.0.expires_at,
        };

        match engine.update(&params.0.memory_id, request) {
            Ok(result) => {
                let mut value = to_value(&result)?;
                value["success"] = serde_json::json!(true);
                json_result(&value)
            }
            Err(e) => engine_error(e),
        }
    }

    /// Delete a memory by id
    #[tool(description = "Delete a memorized item by its ID. Returns the deleted record.")]
    async fn delete_memory(
        &self,
        params: Parameters<DeleteMemoryParams>,
    ) -> Result<CallToolResult, McpError> {
        let engine = self.get_engine();
        match engine.delete(&params.0.memory_id) {
            Ok(memory) => json_result(&serde_json::json!({
                "success": true,
                "memory_id": memory.id,
                "deleted_memory": to_value(&memory)?,
                "message": "Memory deleted successfully",
            })),
            Err(e) => engine_error(e),
        }
    }

    /// Memory store statistics
    #[tool(
        description = "Get statistics about memorized information: active/expired counts, importance and category distributions, tag vocabulary size."
    )]
    async fn memory_stats(&self) -> Result<CallToolResult, McpError> {
        let engine = self.get_engine();
        match engine.stats() {
            Ok(stats) => {
                let mut value = to_value(&stats)?;
                value["success"] = serde_json::json!(true);
                json_result(&value)
            }
            Err(e) => engine_error(e),
        }
    }

    /// Find stored tags similar to a query
    #[tool(
        description = "Find existing tags similar to a query, using embedding similarity with a lexical fallback. Useful for discovering the established vocabulary before tagging."
    )]
    async fn find_similar_tags(
        &self,
        params: Parameters<FindSimilarTagsParams>,
    ) -> Result<CallToolResult, McpError> {
        let engine = self.get_engine();
        let limit = params.0.limit.clamp(1, 50);

        match engine.find_similar_tags(&params.0.query, limit, params.0.min_similarity) {
            Ok(result) => json_result(&serde_json::json!({
                "success": true,
                "query": params.0.query,
                "similar_tags": to_value(&result.similar_tags)?,
                "returned_count": result.similar_tags.len(),
                "total_found": result.total_found,
            })),
            Err(e) => engine_error(e),
        }
    }

    /// List the tag vocabulary
    #[tool(description = "List stored tags with usage statistics. Sort by usage, alphabetical, or recent.")]
    async fn list_tags(
        &self,
        params: Parameters<ListTagsParams>,
    ) -> Result<CallToolResult, McpError> {
        let Some(sort) = TagSort::parse(&params.0.sort_by) else {
            return json_result(&serde_json::json!({
                "success": false,
                "error": format!("Unknown sort order: {}", params.0.sort_by),
                "valid_sort_orders": TagSort::NAMES,
            }));
        };

        let engine = self.get_engine();
        let limit = params.0.limit.clamp(1, 500);

        match engine.list_tags(sort, limit).and_then(|tags| {
            let stats = engine.tag_stats()?;
            Ok((tags, stats))
        }) {
            Ok((tags, stats)) => json_result(&serde_json::json!({
                "success": true,
                "tags": to_value(&tags)?,
                "returned_count": tags.len(),
                "stats": to_value(&stats)?,
            })),
            Err(e) => engine_error(e),
        }
    }

    /// Stored and suggested categories
    #[tool(
        description = "Get available memory categories: the ones already in use (with usage counts) plus the suggested standard set."
    )]
    async fn memory_categories(&self) -> Result<CallToolResult, McpError> {
        let engine = self.get_engine();
        match engine.categories() {
            Ok(result) => {
                let mut value = to_value(&result)?;
                value["success"] = serde_json::json!(true);
                json_result(&value)
            }
            Err(e) => engine_error(e),
        }
    }

    /// Semantic similarity between two texts
    #[tool(
        description = "Compute semantic similarity between a query and a text, optionally blending in surrounding context. Requires a configured embedding provider."
    )]
    async fn compute_similarity(
        &self,
        params: Parameters<ComputeSimilarityParams>,
    ) -> Result<CallToolResult, McpError> {
        let engine = self.get_engine();
        match compute_text_similarity(
            engine.provider(),
            &params.0.query,
            &params.0.text,
            params.0.context.as_deref(),
            params.0.text_weight,
            params.0.context_weight,
        ) {
            Ok(result) => {
                let mut value = to_value(&result)?;
                value["success"] = serde_json::json!(true);
                json_result(&value)
            }
            Err(e) => engine_error(e),
        }
    }

    /// Rank candidate texts by similarity to a query
    #[tool(
        description = "Rank candidate texts by semantic similarity to a query, best first. Requires a configured embedding provider."
    )]
    async fn rank_texts(
        &self,
        params: Parameters<RankTextsParams>,
    ) -> Result<CallToolResult, McpError> {
        let engine = self.get_engine();
        match rank_texts_by_similarity(engine.provider(), &params.0.query, &params.0.texts) {
            Ok(result) => {
                let mut value = to_value(&result)?;
                value["success"] = serde_json::json!(true);
                json_result(&value)
            }
            Err(e) => engine_error(e),
        }
    }
}

#[rmcp::tool_handler]
impl ServerHandler for MemoryService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Persistent memory MCP server with smart tag consolidation and semantic search expansion.".to_string(),
            ),
            ..Default::default()
        }
    }
}

/// Run the MCP server over stdio
pub async fn run_mcp_server(data_dir: PathBuf) -> Result<()> {
    use tokio::io::{stdin, stdout};

    let service = MemoryService::new(data_dir);
    let transport = (stdin(), stdout());
    let server = service.serve(transport).await?;
    server.waiting().await?;

    Ok(())
}
