//! Answer generator error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("LLM call failed: {0}")]
    GenerationFailed(String),
}
