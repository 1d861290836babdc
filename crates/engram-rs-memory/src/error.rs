//! Error types for memory operations.

/// Errors returned by the memory store.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// IO error creating the database location.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// An embedding does not match the configured vector column.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured vector dimension.
        expected: usize,
        /// Dimension actually supplied.
        actual: usize,
    },
}
