//! Configuration for Engram: typed sections, a builder for programmatic
//! assembly, and environment-variable loading for the CLI.

mod error;
mod model;

pub use error::ConfigError;
pub use model::{
    AgentConfig, EmbeddingConfig, EngramConfig, EngramConfigBuilder, LlmConfig, McpServerConfig,
    MemoryConfig,
};
