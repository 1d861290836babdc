//! Configuration schema for Engram.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;

const DEFAULT_CHAT_MODEL: &str = "gpt-4.1-nano";
const DEFAULT_API_BASE: &str = "https://api.openai.com";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;
const DEFAULT_DB_PATH: &str = ".engram/memory.db";
const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.3;
const DEFAULT_MATCH_COUNT: usize = 5;
const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

/// Root config for the Engram agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngramConfig {
    /// Chat model settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Embedding model settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Memory store settings.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// MCP tool server settings.
    #[serde(default)]
    pub mcp: McpServerConfig,
    /// Agent loop settings.
    #[serde(default)]
    pub agent: AgentConfig,
}

impl Default for EngramConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            memory: MemoryConfig::default(),
            mcp: McpServerConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

/// Chat model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model name sent to the chat completion API.
    pub model: String,
    /// Base URL for the API.
    pub api_base: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional sampling temperature.
    pub temperature: Option<f32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_CHAT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: String::new(),
            temperature: None,
        }
    }
}

/// Embedding model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding model name.
    pub model: String,
    /// Base URL for the API.
    pub api_base: String,
    /// Fixed dimensionality of produced vectors. Must match the vector
    /// column of the memory store.
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            dimension: DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

/// Memory store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Path to the SQLite database file.
    pub db_path: String,
    /// Minimum cosine similarity for a recalled memory.
    pub similarity_threshold: f32,
    /// Maximum number of memories returned per search.
    pub match_count: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            match_count: DEFAULT_MATCH_COUNT,
        }
    }
}

/// MCP tool server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct McpServerConfig {
    /// Executable used to start the tool server.
    pub command: String,
    /// Arguments passed to the executable.
    pub args: Vec<String>,
    /// Extra environment variables for the subprocess.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// Agent loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model-call/tool-dispatch rounds per turn.
    pub max_tool_rounds: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }
}

impl EngramConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> EngramConfigBuilder {
        EngramConfigBuilder::new()
    }

    /// Load config from process environment variables.
    ///
    /// `OPENAI_API_KEY` is required; everything else falls back to defaults.
    /// The caller is expected to have loaded any `.env` file beforehand.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingEnv("OPENAI_API_KEY".to_string()))?;

        let mut config = EngramConfig::default();
        config.llm.api_key = api_key;
        if let Ok(model) = env::var("OPENAI_MODEL") {
            config.llm.model = model;
        }
        if let Ok(base) = env::var("OPENAI_API_BASE") {
            config.llm.api_base = base.clone();
            config.embedding.api_base = base;
        }
        if let Ok(model) = env::var("ENGRAM_EMBEDDING_MODEL") {
            config.embedding.model = model;
        }
        if let Ok(raw) = env::var("ENGRAM_EMBEDDING_DIMENSION") {
            config.embedding.dimension = parse_env("ENGRAM_EMBEDDING_DIMENSION", &raw)?;
        }
        if let Ok(path) = env::var("ENGRAM_DB_PATH") {
            config.memory.db_path = path;
        }
        if let Ok(raw) = env::var("ENGRAM_SIMILARITY_THRESHOLD") {
            config.memory.similarity_threshold = parse_env("ENGRAM_SIMILARITY_THRESHOLD", &raw)?;
        }
        if let Ok(raw) = env::var("ENGRAM_MATCH_COUNT") {
            config.memory.match_count = parse_env("ENGRAM_MATCH_COUNT", &raw)?;
        }
        if let Ok(command) = env::var("ENGRAM_MCP_COMMAND") {
            config.mcp.command = command;
        }
        if let Ok(args) = env::var("ENGRAM_MCP_ARGS") {
            config.mcp.args = args.split_whitespace().map(str::to_string).collect();
        }
        if let Ok(raw) = env::var("ENGRAM_MAX_TOOL_ROUNDS") {
            config.agent.max_tool_rounds = parse_env("ENGRAM_MAX_TOOL_ROUNDS", &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.api_key.is_empty() {
            return Err(ConfigError::InvalidField {
                path: "llm.api_key".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.embedding.dimension == 0 {
            return Err(ConfigError::InvalidField {
                path: "embedding.dimension".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.memory.similarity_threshold) {
            return Err(ConfigError::InvalidField {
                path: "memory.similarity_threshold".to_string(),
                message: "must be within [0.0, 1.0]".to_string(),
            });
        }
        if self.memory.match_count == 0 {
            return Err(ConfigError::InvalidField {
                path: "memory.match_count".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.agent.max_tool_rounds == 0 {
            return Err(ConfigError::InvalidField {
                path: "agent.max_tool_rounds".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|err: T::Err| ConfigError::InvalidEnv {
        name: name.to_string(),
        message: err.to_string(),
    })
}

/// Builder for assembling an `EngramConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct EngramConfigBuilder {
    config: EngramConfig,
}

impl EngramConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: EngramConfig::default(),
        }
    }

    /// Replace the chat model configuration.
    pub fn llm(mut self, llm: LlmConfig) -> Self {
        self.config.llm = llm;
        self
    }

    /// Replace the embedding configuration.
    pub fn embedding(mut self, embedding: EmbeddingConfig) -> Self {
        self.config.embedding = embedding;
        self
    }

    /// Replace the memory store configuration.
    pub fn memory(mut self, memory: MemoryConfig) -> Self {
        self.config.memory = memory;
        self
    }

    /// Replace the MCP server configuration.
    pub fn mcp(mut self, mcp: McpServerConfig) -> Self {
        self.config.mcp = mcp;
        self
    }

    /// Replace the agent loop configuration.
    pub fn agent(mut self, agent: AgentConfig) -> Self {
        self.config.agent = agent;
        self
    }

    /// Validate and return the final config.
    pub fn build(self) -> Result<EngramConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn valid_config() -> EngramConfig {
        let mut config = EngramConfig::default();
        config.llm.api_key = "sk-test".to_string();
        config
    }

    #[test]
    fn defaults_match_policy() {
        let config = EngramConfig::default();
        assert_eq!(config.memory.similarity_threshold, 0.3);
        assert_eq!(config.memory.match_count, 5);
        assert_eq!(config.agent.max_tool_rounds, 8);
        assert_eq!(config.embedding.dimension, 1536);
    }

    #[test]
    fn builder_applies_sections() {
        let config = EngramConfig::builder()
            .llm(LlmConfig {
                api_key: "sk-test".to_string(),
                model: "gpt-4.1".to_string(),
                ..LlmConfig::default()
            })
            .agent(AgentConfig { max_tool_rounds: 3 })
            .build()
            .unwrap();
        assert_eq!(config.llm.model, "gpt-4.1");
        assert_eq!(config.agent.max_tool_rounds, 3);
    }

    #[test]
    fn validate_rejects_empty_api_key() {
        let config = EngramConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("llm.api_key"));
    }

    #[test]
    fn validate_rejects_zero_dimension() {
        let mut config = valid_config();
        config.embedding.dimension = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_threshold() {
        let mut config = valid_config();
        config.memory.similarity_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_rounds() {
        let mut config = valid_config();
        config.agent.max_tool_rounds = 0;
        assert!(config.validate().is_err());
    }
}
