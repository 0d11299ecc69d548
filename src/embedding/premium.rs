//! Premium embedders: higher-quality, API-backed embedding providers the registry projects
//! into local space via a [`CalibrationMatrix`](super::calibration::CalibrationMatrix).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::EmbeddingError;
use super::local::deterministic_embedding;

/// An API-backed (or stub) embedder whose native dimension `d_premium` is fixed at load.
/// May fail transiently, unlike [`LocalEmbedder`](super::local::LocalEmbedder).
#[async_trait]
pub trait PremiumEmbedder: Send + Sync + std::fmt::Debug {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut batch = self.embed_documents(&[text.to_string()]).await?;
        Ok(batch.pop().unwrap_or_default())
    }

    fn name(&self) -> &str;
    fn embedding_dim(&self) -> usize;
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponseRow {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingResponseRow>,
}

/// HTTP-backed premium embedder, acquiring its `reqwest::Client` once at construction per the
/// scoped-resources discipline (no per-query client creation).
pub struct HttpPremiumEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    name: String,
    embedding_dim: usize,
}

impl std::fmt::Debug for HttpPremiumEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPremiumEmbedder")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("embedding_dim", &self.embedding_dim)
            .finish()
    }
}

impl HttpPremiumEmbedder {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        embedding_dim: usize,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            name: name.into(),
            embedding_dim,
        }
    }
}

#[async_trait]
impl PremiumEmbedder for HttpPremiumEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = %self.name, count = texts.len(), "requesting premium embeddings");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| EmbeddingError::PremiumRequestFailed { reason: e.to_string() })?
            .error_for_status()
            .map_err(|e| EmbeddingError::PremiumRequestFailed { reason: e.to_string() })?
            .json::<EmbeddingResponse>()
            .await
            .map_err(|e| EmbeddingError::PremiumRequestFailed { reason: e.to_string() })?;

        Ok(response.data.into_iter().map(|row| row.embedding).collect())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }
}

/// Deterministic stub premium embedder for tests, with its own (typically larger) native
/// dimension, distinct from the local embedder's.
#[derive(Debug, Clone)]
pub struct StubPremiumEmbedder {
    name: String,
    embedding_dim: usize,
}

impl StubPremiumEmbedder {
    pub fn new(name: impl Into<String>, embedding_dim: usize) -> Self {
        Self {
            name: name.into(),
            embedding_dim,
        }
    }
}

#[async_trait]
impl PremiumEmbedder for StubPremiumEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|t| deterministic_embedding(&format!("{}:{t}", self.name), self.embedding_dim))
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_premium_embedder_is_deterministic() {
        let e = StubPremiumEmbedder::new("stub-premium", 1536);
        let a = e.embed_query("hello").await.unwrap();
        let b = e.embed_query("hello").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 1536);
    }

    #[tokio::test]
    async fn stub_premium_embedder_differs_from_local_stub() {
        let premium = StubPremiumEmbedder::new("stub-premium", 16);
        let a = premium.embed_query("hello").await.unwrap();
        let b = deterministic_embedding("hello", 16);
        assert_ne!(a, b);
    }
}
