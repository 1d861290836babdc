//! Error types for chat and embedding API calls.

use thiserror::Error;

/// Errors returned by the chat and embedding clients.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport-level failure talking to the API.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// The API returned a non-success status.
    #[error("api error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        body: String,
    },
    /// The API response did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// An embedding came back with the wrong dimensionality.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured vector dimension.
        expected: usize,
        /// Dimension actually returned.
        actual: usize,
    },
}
