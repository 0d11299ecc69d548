//! Quality evaluator error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("ground truth set required for IR metrics")]
    MissingGroundTruth,
}
