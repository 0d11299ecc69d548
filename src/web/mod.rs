//! Live web search (C6): discovery, extraction, host-suffix trust scoring, and per-provider
//! rate limiting, fused into the third retrieval tier by the orchestrator.

pub mod error;
pub mod provider;
pub mod rate_limit;
pub mod trust;

pub use error::WebSearchError;
pub use provider::{
    Extractor, HttpExtractor, HttpWebSearcher, HybridWebProvider, WebSearcher, WebSearchProvider,
};
pub use rate_limit::RateLimiter;
pub use trust::{TrustConfig, trust_score};

#[cfg(any(test, feature = "mock"))]
pub use provider::mock::StubWebSearchProvider;
