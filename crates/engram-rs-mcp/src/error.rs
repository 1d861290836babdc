//! Error types for the MCP session.

use thiserror::Error;

/// Errors returned by the MCP client.
#[derive(Debug, Error)]
pub enum McpError {
    /// The tool server subprocess could not be started.
    #[error("failed to spawn MCP server '{command}': {message}")]
    SpawnFailed {
        /// Command that failed to start.
        command: String,
        /// Underlying failure.
        message: String,
    },
    /// A JSON-RPC message could not be serialized.
    #[error("failed to serialize JSON-RPC message: {0}")]
    Serialization(String),
    /// An RPC did not complete in time.
    #[error("JSON-RPC timeout calling '{method}'")]
    Timeout {
        /// Method that timed out.
        method: String,
    },
    /// The subprocess stream closed underneath the session.
    #[error("JSON-RPC transport closed")]
    TransportClosed,
    /// The server answered with a JSON-RPC error.
    #[error("MCP protocol error ({code}): {message}")]
    Protocol {
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },
    /// The server's response did not have the expected shape.
    #[error("invalid MCP response: {0}")]
    InvalidResponse(String),
}
