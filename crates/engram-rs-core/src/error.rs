//! Error types for the core orchestration crate.

use thiserror::Error;

/// Errors returned by the agent runtime and turn processor.
#[derive(Debug, Error)]
pub enum EngramCoreError {
    /// Chat model invocation failed.
    #[error("model error: {0}")]
    Model(#[from] engram_rs_llm::LlmError),
    /// The model kept requesting tools past the configured bound.
    #[error("tool round limit reached after {0} rounds")]
    ToolRoundLimit(usize),
    /// A tool's backing session failed; the interactive session cannot
    /// continue.
    #[error("tool session failed: {0}")]
    ToolSession(String),
}
