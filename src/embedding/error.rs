//! Embedding-layer error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the local/premium embedders and the registry that wraps them.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding model not found at {path}")]
    ModelNotFound { path: PathBuf },

    #[error("failed to load embedding model: {reason}")]
    ModelLoadFailed { reason: String },

    #[error("tokenization failed: {reason}")]
    TokenizationFailed { reason: String },

    #[error("inference failed: {reason}")]
    InferenceFailed { reason: String },

    #[error("invalid embedder configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A named premium embedder (or its calibration matrix) was requested but is not loaded.
    #[error("premium embedder unavailable: {name}")]
    EmbedderUnavailable { name: String },

    #[error("premium embedder request failed: {reason}")]
    PremiumRequestFailed { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
