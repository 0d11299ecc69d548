//! Two-Step Retriever (C4): approximate k-NN in local space, optionally rescored against
//! native premium-space embeddings for the surviving candidates.

use std::sync::Arc;

use tracing::instrument;

use super::error::RetrievalError;
use crate::embedding::EmbedderRegistry;
use crate::index::{IndexFilter, VectorIndex};
use crate::types::{RetrievedChunk, SourceName, SourceTier};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

pub struct TwoStepRetriever {
    registry: Arc<EmbedderRegistry>,
    vector_index: Arc<dyn VectorIndex>,
}

impl TwoStepRetriever {
    pub fn new(registry: Arc<EmbedderRegistry>, vector_index: Arc<dyn VectorIndex>) -> Self {
        Self { registry, vector_index }
    }

    /// Runs both steps and returns at most `top_k_final` chunks, sorted best-first.
    #[instrument(skip(self, query, filter))]
    pub async fn retrieve(
        &self,
        query: &str,
        top_k_approximate: usize,
        top_k_final: usize,
        filter: Option<&IndexFilter>,
        premium_name: Option<&str>,
        source_tier: SourceTier,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        let q_local = self.registry.embed_query(query, premium_name).await?;
        let candidates = self
            .vector_index
            .knn(&q_local, top_k_approximate, filter)
            .await?;

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let approximate: Vec<RetrievedChunk> = candidates
            .iter()
            .enumerate()
            .map(|(rank, hit)| RetrievedChunk {
                chunk_id: hit.chunk_id.clone(),
                text: hit.payload.text.clone(),
                score_raw: hit.score,
                rank_in_source: rank + 1,
                source_tier,
                source_name: SourceName::Vector,
                similarity_native: None,
                trust_score: hit.payload.trust_score,
                payload: hit.payload.clone(),
            })
            .collect();

        if self.registry.active_premium(premium_name).is_none() {
            let mut ranked = approximate;
            ranked.truncate(top_k_final);
            return Ok(ranked);
        }

        let texts: Vec<String> = approximate.iter().map(|c| c.text.clone()).collect();
        let (candidate_vecs, query_vec) = self
            .registry
            .rescore_candidates(&texts, query, premium_name)
            .await?;

        let mut rescored: Vec<RetrievedChunk> = approximate
            .into_iter()
            .zip(candidate_vecs)
            .map(|(mut chunk, vec)| {
                chunk.similarity_native = Some(cosine(&query_vec, &vec));
                chunk
            })
            .collect();

        rescored.sort_by(|a, b| {
            let score_a = a.similarity_native.unwrap_or(a.score_raw);
            let score_b = b.similarity_native.unwrap_or(b.score_raw);
            score_b
                .partial_cmp(&score_a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.rank_in_source.cmp(&b.rank_in_source))
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        rescored.truncate(top_k_final);
        Ok(rescored)
    }
}
