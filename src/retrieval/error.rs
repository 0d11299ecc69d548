//! Retrieval-layer error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] crate::embedding::EmbeddingError),

    #[error("vector index failed: {0}")]
    VectorIndex(#[from] crate::index::VectorIndexError),

    #[error("text index failed: {0}")]
    TextIndex(#[from] crate::index::TextIndexError),
}
