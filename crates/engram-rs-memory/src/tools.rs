//! Model-callable memory operations.
//!
//! These run inside the agent loop, so every failure is folded into the
//! returned text instead of propagating: the model always gets a result to
//! read.

use crate::store::MemoryStore;
use async_trait::async_trait;
use engram_rs_llm::EmbeddingClient;
use engram_rs_protocol::{Tool, ToolError};
use log::{error, warn};
use serde_json::{json, Value};
use std::sync::Arc;

/// Returned as the only element when a search matches nothing. Callers must
/// treat this literal as a no-result sentinel, not memory content.
pub const NO_MEMORIES_SENTINEL: &str = "No similar memories found";

/// Memory operations shared by the turn processor and the tool adapters.
pub struct MemoryTools {
    store: Arc<MemoryStore>,
    embedder: Arc<dyn EmbeddingClient>,
    similarity_threshold: f32,
    match_count: usize,
}

impl MemoryTools {
    /// Create the memory operations with default search policy.
    pub fn new(
        store: Arc<MemoryStore>,
        embedder: Arc<dyn EmbeddingClient>,
        similarity_threshold: f32,
        match_count: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            similarity_threshold,
            match_count,
        }
    }

    /// Embed `memory` and persist it against `conv_id`.
    ///
    /// Nothing is written when embedding fails.
    pub async fn save_memory(&self, memory: &str, conv_id: i64) -> String {
        let embedding = match self.embedder.embed(memory).await {
            Ok(embedding) => embedding,
            Err(err) => {
                error!("embedding failed for memory save (conv_id={conv_id}): {err}");
                return "Failed to generate embedding for memory".to_string();
            }
        };

        match self.store.insert_memory(conv_id, memory, &embedding) {
            Ok(id) => format!("Memory saved successfully with ID: {id}"),
            Err(err) => {
                error!("memory save failed (conv_id={conv_id}): {err}");
                format!("Error saving memory: {err}")
            }
        }
    }

    /// Search stored memories with the configured default policy.
    pub async fn search_memories_default(&self, query: &str) -> Vec<String> {
        self.search_memories(query, self.similarity_threshold, self.match_count)
            .await
    }

    /// Search stored memories for the top matches to `query`.
    pub async fn search_memories(
        &self,
        query: &str,
        similarity_threshold: f32,
        match_count: usize,
    ) -> Vec<String> {
        let embedding = match self.embedder.embed(query).await {
            Ok(embedding) => embedding,
            Err(err) => {
                error!("embedding failed for memory search: {err}");
                return vec!["Failed to generate embedding for query".to_string()];
            }
        };

        let hits = match self
            .store
            .find_similar(&embedding, similarity_threshold, match_count)
        {
            Ok(hits) => hits,
            Err(err) => {
                error!("memory search failed: {err}");
                return vec![format!("Error searching memories: {err}")];
            }
        };

        if hits.is_empty() {
            return vec![NO_MEMORIES_SENTINEL.to_string()];
        }

        hits.iter()
            .map(|hit| format!("Similarity: {:.3}\nMemory: {}\n", hit.similarity, hit.ques_analysis))
            .collect()
    }
}

/// `save_memory` exposed to the agent runtime.
#[derive(Clone)]
pub struct SaveMemoryTool {
    tools: Arc<MemoryTools>,
}

impl SaveMemoryTool {
    /// Wrap shared memory operations as a tool.
    pub fn new(tools: Arc<MemoryTools>) -> Self {
        Self { tools }
    }
}

impl std::fmt::Debug for SaveMemoryTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveMemoryTool").finish()
    }
}

#[async_trait]
impl Tool for SaveMemoryTool {
    fn name(&self) -> &str {
        "save_memory"
    }

    fn description(&self) -> &str {
        "Save a memory for later semantic retrieval, linked to a conversation"
    }

    fn args_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "memory": {
                    "type": "string",
                    "description": "The memory text to save"
                },
                "conv_id": {
                    "type": "integer",
                    "description": "The conversation ID to link this memory to"
                }
            },
            "required": ["memory", "conv_id"]
        })
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let Some(memory) = args.get("memory").and_then(Value::as_str) else {
            warn!("save_memory called without 'memory'");
            return Ok(json!("Error saving memory: missing required field 'memory'"));
        };
        let Some(conv_id) = args.get("conv_id").and_then(Value::as_i64) else {
            warn!("save_memory called without 'conv_id'");
            return Ok(json!("Error saving memory: missing required field 'conv_id'"));
        };

        Ok(json!(self.tools.save_memory(memory, conv_id).await))
    }
}

/// `search_memories` exposed to the agent runtime.
#[derive(Clone)]
pub struct SearchMemoriesTool {
    tools: Arc<MemoryTools>,
}

impl SearchMemoriesTool {
    /// Wrap shared memory operations as a tool.
    pub fn new(tools: Arc<MemoryTools>) -> Self {
        Self { tools }
    }
}

impl std::fmt::Debug for SearchMemoriesTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchMemoriesTool").finish()
    }
}

#[async_trait]
impl Tool for SearchMemoriesTool {
    fn name(&self) -> &str {
        "search_memories"
    }

    fn description(&self) -> &str {
        "Search previously saved memories by semantic similarity"
    }

    fn args_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "similarity_threshold": {
                    "type": "number",
                    "description": "Minimum similarity score (0-1, default 0.3)"
                },
                "match_count": {
                    "type": "integer",
                    "description": "Number of top matches to return (default 5)"
                }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let Some(query) = args.get("query").and_then(Value::as_str) else {
            warn!("search_memories called without 'query'");
            return Ok(json!(["Error searching memories: missing required field 'query'"]));
        };
        let threshold = args
            .get("similarity_threshold")
            .and_then(Value::as_f64)
            .map(|value| value as f32)
            .unwrap_or(self.tools.similarity_threshold);
        let count = args
            .get("match_count")
            .and_then(Value::as_u64)
            .map(|value| value as usize)
            .unwrap_or(self.tools.match_count);

        Ok(json!(self.tools.search_memories(query, threshold, count).await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryError;
    use engram_rs_test_utils::{FailingEmbeddingClient, HashEmbeddingClient};
    use pretty_assertions::assert_eq;

    const DIM: usize = 16;

    fn tools_with(embedder: Arc<dyn EmbeddingClient>) -> (Arc<MemoryStore>, MemoryTools) {
        let store = Arc::new(MemoryStore::open_in_memory(DIM).unwrap());
        let tools = MemoryTools::new(store.clone(), embedder, 0.3, 5);
        (store, tools)
    }

    #[tokio::test]
    async fn save_memory_persists_and_confirms() {
        let (store, tools) = tools_with(Arc::new(HashEmbeddingClient::new(DIM)));
        let conv_id = store.insert_conversation("q", "a", "").unwrap();

        let result = tools.save_memory("user prefers short answers", conv_id).await;
        assert!(result.starts_with("Memory saved successfully with ID:"));
        assert_eq!(store.count_memories().unwrap(), 1);
    }

    #[tokio::test]
    async fn save_memory_skips_store_when_embedding_fails() {
        let (store, tools) = tools_with(Arc::new(FailingEmbeddingClient::new(DIM)));
        let conv_id = store.insert_conversation("q", "a", "").unwrap();

        let result = tools.save_memory("anything", conv_id).await;
        assert_eq!(result, "Failed to generate embedding for memory");
        assert_eq!(store.count_memories().unwrap(), 0);
    }

    #[tokio::test]
    async fn save_memory_reports_store_errors_as_text() {
        let (store, tools) = tools_with(Arc::new(HashEmbeddingClient::new(DIM)));
        // No conversation row, so the FK rejects the insert.
        let result = tools.save_memory("orphan", 999).await;
        assert!(result.starts_with("Error saving memory:"));
        assert_eq!(store.count_memories().unwrap(), 0);
    }

    #[tokio::test]
    async fn search_memories_returns_sentinel_when_empty() {
        let (_store, tools) = tools_with(Arc::new(HashEmbeddingClient::new(DIM)));
        let results = tools.search_memories_default("anything").await;
        assert_eq!(results, vec![NO_MEMORIES_SENTINEL.to_string()]);
    }

    #[tokio::test]
    async fn search_memories_reports_embedding_failure() {
        let (_store, tools) = tools_with(Arc::new(FailingEmbeddingClient::new(DIM)));
        let results = tools.search_memories_default("anything").await;
        assert_eq!(results, vec!["Failed to generate embedding for query".to_string()]);
    }

    #[tokio::test]
    async fn saved_memory_is_found_again() {
        let (store, tools) = tools_with(Arc::new(HashEmbeddingClient::new(DIM)));
        let conv_id = store.insert_conversation("q", "a", "").unwrap();
        tools
            .save_memory("Question: deploy steps\nAnswer: use the release script", conv_id)
            .await;

        let results = tools
            .search_memories("Question: deploy steps\nAnswer: use the release script", 0.3, 5)
            .await;
        assert_eq!(results.len(), 1);
        assert!(results[0].starts_with("Similarity: "));
        assert!(results[0].contains("use the release script"));
    }

    #[tokio::test]
    async fn search_results_format_scores_to_three_decimals() {
        let (store, tools) = tools_with(Arc::new(HashEmbeddingClient::new(DIM)));
        let conv_id = store.insert_conversation("q", "a", "").unwrap();
        tools.save_memory("remember this", conv_id).await;

        let results = tools.search_memories("remember this", 0.3, 5).await;
        let line = results[0].lines().next().unwrap();
        let score = line.strip_prefix("Similarity: ").unwrap();
        assert_eq!(score.split('.').nth(1).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn save_tool_rejects_missing_fields_as_text() {
        let (_store, tools) = tools_with(Arc::new(HashEmbeddingClient::new(DIM)));
        let tool = SaveMemoryTool::new(Arc::new(tools));
        let result = tool.call(json!({ "conv_id": 1 })).await.unwrap();
        assert_eq!(
            result,
            json!("Error saving memory: missing required field 'memory'")
        );
    }

    #[tokio::test]
    async fn search_tool_uses_defaults_and_returns_array() {
        let (_store, tools) = tools_with(Arc::new(HashEmbeddingClient::new(DIM)));
        let tool = SearchMemoriesTool::new(Arc::new(tools));
        let result = tool.call(json!({ "query": "anything" })).await.unwrap();
        assert_eq!(result, json!([NO_MEMORIES_SENTINEL]));
    }

    #[test]
    fn dimension_mismatch_is_a_memory_error() {
        let store = MemoryStore::open_in_memory(DIM).unwrap();
        let err = store.find_similar(&[0.0; 3], 0.3, 5).unwrap_err();
        assert!(matches!(err, MemoryError::DimensionMismatch { .. }));
    }
}
