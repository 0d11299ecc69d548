//! Retrieval layer: RRF fusion (shared), the two-step vector retriever (C4), and the hybrid
//! vector+text retriever (C5).

pub mod error;
pub mod hybrid;
pub mod orchestrator;
pub mod rrf;
pub mod two_step;

pub use error::RetrievalError;
pub use hybrid::HybridRetriever;
pub use orchestrator::{OrchestratorResult, PromotionConfig, ThreeTierOrchestrator, TierWeights};
pub use rrf::{RankedSource, weighted_rrf};
pub use two_step::TwoStepRetriever;
