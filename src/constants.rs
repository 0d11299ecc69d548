//! Cross-cutting, shared constants.
//!
//! Prefer deriving secondary constants from primary ones to avoid drift.

/// Output dimension of the local embedder. A process-wide invariant: every vector stored in
/// the vector index, and every query embedding produced without a premium embedder, shares
/// this dimension.
pub const DEFAULT_LOCAL_EMBEDDING_DIM: usize = 384;

/// Default approximate-search candidate count for the two-step retriever (`top_k_approximate`).
pub const DEFAULT_TOP_K_APPROXIMATE: usize = 50;

/// Default rescored result count for the two-step retriever (`top_k_final`).
pub const DEFAULT_TOP_K_FINAL: usize = 10;

/// Default fused result count returned by the public query entry point.
pub const DEFAULT_TOP_K: usize = 10;

/// Reciprocal Rank Fusion smoothing constant (`k_RRF`).
pub const DEFAULT_RRF_K: u32 = 60;

/// Tier weights `(w1, w2, w3)` applied during fusion: curated, web knowledge base, live web.
pub const DEFAULT_TIER_WEIGHTS: (f32, f32, f32) = (1.0, 0.9, 0.7);

/// Default semantic cache cosine-similarity threshold.
pub const DEFAULT_CACHE_SIM_THRESHOLD: f32 = 0.95;

/// Default semantic cache entry TTL, in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Default semantic cache capacity (entry count).
pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Default maximum results requested from a single web search call.
pub const DEFAULT_WEB_MAX_RESULTS: usize = 5;

/// Default per-provider rate limit, in queries per minute.
pub const DEFAULT_WEB_QPM: u32 = 10;

/// Default minimum trust score required for live-web-to-KB promotion.
pub const DEFAULT_WEB_KB_MIN_TRUST: f32 = 0.5;

/// Default time-to-live for promoted web-KB chunks, in days.
pub const DEFAULT_WEB_KB_TTL_DAYS: i64 = 7;

/// Default per-tier retrieval deadline, in milliseconds.
pub const DEFAULT_PER_TIER_TIMEOUT_MS: u64 = 10_000;

/// Default overall query deadline, in milliseconds.
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 30_000;

/// Default context-relevance threshold used by the quality evaluator's `context_precision`.
pub const DEFAULT_RELEVANCE_THRESHOLD: f32 = 0.5;

/// Claim-support Jaccard threshold used by the quality evaluator's `faithfulness` metric.
pub const DEFAULT_FAITHFULNESS_THRESHOLD: f32 = 0.3;

/// Context-utilization Jaccard threshold.
pub const DEFAULT_UTILIZATION_THRESHOLD: f32 = 0.1;

/// Minimum `top_k` accepted by the query coordinator.
pub const MIN_TOP_K: usize = 1;

/// Maximum `top_k` accepted by the query coordinator.
pub const MAX_TOP_K: usize = 25;

/// Minimum representative-sample size the calibrator requires before fitting a matrix.
pub const MIN_CALIBRATION_SAMPLE_SIZE: usize = 100;

/// Default overall query deadline is `DEFAULT_QUERY_TIMEOUT_MS`; this is the default semantic
/// cache similarity floor below which `on_low_confidence` web triggering fires.
pub const DEFAULT_LOW_CONFIDENCE_SCORE_THRESHOLD: f32 = 0.5;

/// Minimum curated+web-KB hit count below which `on_low_confidence` web triggering fires.
pub const DEFAULT_LOW_CONFIDENCE_MIN_RESULTS: usize = 3;

/// Runtime dimension configuration for modules that need to agree on the local embedding
/// size (vector index, cache, registry) without a compile-time constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimConfig {
    /// The local embedding vector dimension (number of floats).
    pub local_dim: usize,
}

impl Default for DimConfig {
    fn default() -> Self {
        Self {
            local_dim: DEFAULT_LOCAL_EMBEDDING_DIM,
        }
    }
}

impl DimConfig {
    /// Creates a new dimension configuration.
    pub fn new(local_dim: usize) -> Self {
        Self { local_dim }
    }

    /// Validates that the dimension is usable.
    pub fn validate(&self) -> Result<(), DimValidationError> {
        if self.local_dim == 0 {
            return Err(DimValidationError::ZeroDimension);
        }
        Ok(())
    }
}

/// Error returned when dimension validation fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DimValidationError {
    /// Embedding dimension cannot be zero.
    #[error("embedding dimension cannot be zero")]
    ZeroDimension,
    /// Runtime dimension does not match the expected dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Validates that a runtime embedding dimension matches the expected dimension.
///
/// Use this at module boundaries (vector index writes, cache lookups, calibration loads) to
/// catch dimension mismatches early rather than encountering silent corruption downstream.
pub fn validate_embedding_dim(actual: usize, expected: usize) -> Result<(), DimValidationError> {
    if actual != expected {
        return Err(DimValidationError::DimensionMismatch { expected, actual });
    }
    Ok(())
}
