//! Query Coordinator error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error("top_k {actual} out of range [{min}, {max}]")]
    TopKOutOfRange { actual: usize, min: usize, max: usize },

    #[error("embedding failed: {0}")]
    Embedding(#[from] crate::embedding::EmbeddingError),
}
