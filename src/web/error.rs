//! Web search/extraction error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebSearchError {
    #[error("provider '{provider}' rate limited")]
    RateLimited { provider: String },

    #[error("all targets failed for provider '{provider}'")]
    AllTargetsFailed { provider: String },

    #[error("request to provider '{provider}' failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("provider call exceeded its deadline")]
    Timeout,
}
