//! Embedder Registry (C1): owns the local embedder and a map of named premium embedders, each
//! paired with its calibration matrix. Generalizes the teacher's single-embedder
//! `SinterEmbedder` ownership model to a local+N-premium registry.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::instrument;

use super::calibration::CalibrationMatrix;
use super::error::EmbeddingError;
use super::local::LocalEmbedder;
use super::premium::PremiumEmbedder;

struct PremiumSlot {
    embedder: Arc<dyn PremiumEmbedder>,
    calibration: CalibrationMatrix,
}

/// Holds a local embedder plus a map of premium embedders, each with its own calibration
/// matrix. Read-only after construction; safe to share across tasks via `Arc`.
pub struct EmbedderRegistry {
    local: Arc<dyn LocalEmbedder>,
    premium: HashMap<String, PremiumSlot>,
    default_premium_name: Option<String>,
}

impl std::fmt::Debug for EmbedderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbedderRegistry")
            .field("local_dim", &self.local.embedding_dim())
            .field("premium_names", &self.premium.keys().collect::<Vec<_>>())
            .field("default_premium_name", &self.default_premium_name)
            .finish()
    }
}

impl EmbedderRegistry {
    pub fn new(local: Arc<dyn LocalEmbedder>, default_premium_name: Option<String>) -> Self {
        Self {
            local,
            premium: HashMap::new(),
            default_premium_name,
        }
    }

    /// Registers a premium embedder and its calibration matrix. Switching `premium_name` per
    /// call afterwards is O(1) — no model reload.
    pub fn register_premium(
        &mut self,
        embedder: Arc<dyn PremiumEmbedder>,
        calibration: CalibrationMatrix,
    ) {
        self.premium.insert(
            embedder.name().to_string(),
            PremiumSlot { embedder, calibration },
        );
    }

    pub fn local_dim(&self) -> usize {
        self.local.embedding_dim()
    }

    pub fn has_premium(&self, name: &str) -> bool {
        self.premium.contains_key(name)
    }

    /// Resolves which premium embedder (if any) a caller's request maps to, applying the same
    /// empty-falls-back-to-default rule as `embed_query`/`rescore_candidates`.
    pub fn active_premium(&self, requested: Option<&str>) -> Option<String> {
        self.resolve_premium_name(requested).map(str::to_string)
    }

    fn resolve_premium_name(&self, requested: Option<&str>) -> Option<&str> {
        requested
            .filter(|n| !n.is_empty())
            .or(self.default_premium_name.as_deref())
    }

    fn slot(&self, name: &str) -> Result<&PremiumSlot, EmbeddingError> {
        self.premium
            .get(name)
            .ok_or_else(|| EmbeddingError::EmbedderUnavailable { name: name.to_string() })
    }

    /// Always uses the local embedder. Deterministic over identical input.
    #[instrument(skip(self, texts), fields(count = texts.len()))]
    pub async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.local.embed_documents(texts).await
    }

    /// If `premium_name` is empty and no default is set, returns the local embedding directly.
    /// Otherwise computes `v_premium = premium.embed(text)` and projects it into local space.
    #[instrument(skip(self, text))]
    pub async fn embed_query(
        &self,
        text: &str,
        premium_name: Option<&str>,
    ) -> Result<Vec<f32>, EmbeddingError> {
        match self.resolve_premium_name(premium_name) {
            None => self.local.embed_query(text).await,
            Some(name) => {
                let slot = self.slot(name)?;
                let v_premium = slot.embedder.embed_query(text).await?;
                slot.calibration.project(&v_premium)
            }
        }
    }

    /// Returns `(candidate_vecs_premium, query_vec_premium)` in native premium space, unprojected,
    /// for the two-step retriever's rescoring phase. Falls back to the local embedder's output
    /// (treated as "native space") when no premium embedder is active.
    #[instrument(skip(self, texts, query_text))]
    pub async fn rescore_candidates(
        &self,
        texts: &[String],
        query_text: &str,
        premium_name: Option<&str>,
    ) -> Result<(Vec<Vec<f32>>, Vec<f32>), EmbeddingError> {
        match self.resolve_premium_name(premium_name) {
            None => {
                let candidates = self.local.embed_documents(texts).await?;
                let query = self.local.embed_query(query_text).await?;
                Ok((candidates, query))
            }
            Some(name) => {
                let slot = self.slot(name)?;
                let candidates = slot.embedder.embed_documents(texts).await?;
                let query = slot.embedder.embed_query(query_text).await?;
                Ok((candidates, query))
            }
        }
    }
}
