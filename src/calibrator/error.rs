//! Calibrator error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("calibration sample has {actual} texts, need at least {required}")]
    InsufficientSample { actual: usize, required: usize },

    #[error("local and premium embedders produced different row counts: {local} vs {premium}")]
    RowCountMismatch { local: usize, premium: usize },

    #[error("pseudo-inverse did not converge for a {rows}-row sample")]
    SingularSample { rows: usize },

    #[error(transparent)]
    Embedding(#[from] crate::embedding::EmbeddingError),
}
