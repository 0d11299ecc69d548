//! Index-layer error types.

use thiserror::Error;

/// Errors from the vector index adapter (C2).
#[derive(Debug, Error)]
pub enum VectorIndexError {
    #[error("vector dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector index backend unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("vector index write failed: {reason}")]
    WriteFailed { reason: String },

    #[error("vector index search failed: {reason}")]
    SearchFailed { reason: String },
}

/// Errors from the text index adapter (C3).
#[derive(Debug, Error)]
pub enum TextIndexError {
    #[error("text index backend unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("text index write failed: {reason}")]
    WriteFailed { reason: String },

    #[error("text index search failed: {reason}")]
    SearchFailed { reason: String },
}
