//! # triarag
//!
//! Three-tier retrieval-augmented QA engine: a curated local corpus, a persistent web
//! knowledge base, and live web search, fused by weighted reciprocal rank fusion behind a
//! single query entry point.
//!
//! ```text
//! Query → embed → semantic cache → {Tier 1 curated, Tier 2 web-KB, Tier 3 live web} → fuse
//!       → generate → evaluate → cache store → AnswerResult
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use triarag::Config;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! println!("Listening on {}", config.socket_addr());
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//!
//! | Feature | Purpose |
//! |---------|---------|
//! | `cpu` | CPU-only inference (docs.rs default) |
//! | `metal` | Apple Silicon GPU acceleration |
//! | `cuda` | NVIDIA GPU acceleration |
//! | `mock` | Mock backends for tests |
//!
//! ## Modules
//!
//! - [`embedding`] - local/premium embedders, calibration projection (C1)
//! - [`index`] - vector and text index adapters (C2, C3)
//! - [`retrieval`] - two-step, hybrid, and three-tier orchestrated retrieval (C4, C5, C7)
//! - [`web`] - live web search, extraction, trust scoring, rate limiting (C6)
//! - [`cache`] - semantic query cache (C8)
//! - [`generation`] - grounded answer generation (C9)
//! - [`evaluation`] - word-overlap quality metrics (C10)
//! - [`calibrator`] - offline calibration matrix fitting (C11)
//! - [`coordinator`] - the top-level query pipeline (C12)
//! - [`gateway`] - HTTP front door
//! - [`config`] - environment-backed configuration
//!
//! Links: repo/issues at the crate `repository` URL.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cache;
pub mod calibrator;
pub mod config;
pub mod constants;
pub mod coordinator;
pub mod embedding;
pub mod evaluation;
pub mod gateway;
pub mod generation;
pub mod hashing;
pub mod index;
pub mod metrics;
pub mod retrieval;
pub mod types;
pub mod web;

pub use cache::{SemanticCache, SemanticCacheHandle};
pub use calibrator::{CalibrationError, Calibrator};
pub use config::{Config, ConfigError};
pub use constants::{DimConfig, DimValidationError, validate_embedding_dim};
pub use coordinator::{CoordinatorError, QueryCoordinator, QueryRequest};
pub use embedding::{
    CalibrationMatrix, EmbedderRegistry, EmbeddingError, HttpPremiumEmbedder, LocalEmbedder,
    PremiumEmbedder,
};
pub use evaluation::{EvaluationError, EvaluatorConfig, GroundTruth, QualityEvaluator};
pub use gateway::{AppState, build_router};
pub use generation::{AnswerGenerator, GenerationError, LanguageModel};
pub use hashing::{hash_prompt, hash_to_u64};
pub use index::{
    Bm25TextIndex, InMemoryVectorIndex, TextIndex, TextIndexError, VectorIndex, VectorIndexError,
};
pub use metrics::{MetricsSink, NoopMetricsSink, PrometheusMetricsSink};
pub use retrieval::{
    HybridRetriever, OrchestratorResult, PromotionConfig, RetrievalError, ThreeTierOrchestrator,
    TierWeights, TwoStepRetriever,
};
pub use types::{
    AnswerResult, Chunk, ChunkBuilder, DecisionPath, IndexFilter, IngestChunk, QualityMetrics,
    RetrievalStats, RetrievedChunk, SourceName, SourceTier, TierOrigin, UserContext,
    WebSearchMode, WebSearchResult,
};
pub use web::{TrustConfig, WebSearchError, WebSearchProvider};
