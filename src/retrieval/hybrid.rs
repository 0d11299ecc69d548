//! Hybrid Retriever (C5): fuses C4's vector branch with C3's text branch via weighted RRF.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::instrument;

use super::error::RetrievalError;
use super::rrf::{RankedSource, weighted_rrf};
use super::two_step::TwoStepRetriever;
use crate::constants::DEFAULT_RRF_K;
use crate::index::{IndexFilter, TextIndex};
use crate::types::{RetrievedChunk, SourceName, SourceTier};

const VECTOR_WEIGHT: f32 = 1.0;
const TEXT_WEIGHT: f32 = 1.0;

pub struct HybridRetriever {
    two_step: TwoStepRetriever,
    text_index: Arc<dyn TextIndex>,
}

impl HybridRetriever {
    pub fn new(two_step: TwoStepRetriever, text_index: Arc<dyn TextIndex>) -> Self {
        Self { two_step, text_index }
    }

    #[instrument(skip(self, query, filter))]
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&IndexFilter>,
        premium_name: Option<&str>,
        source_tier: SourceTier,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        let branch_limit = 3 * top_k;

        let (vector_hits, text_hits) = tokio::join!(
            self.two_step.retrieve(
                query,
                crate::constants::DEFAULT_TOP_K_APPROXIMATE.max(branch_limit),
                branch_limit,
                filter,
                premium_name,
                source_tier,
            ),
            self.text_index.search(query, branch_limit, filter),
        );
        let vector_hits = vector_hits?;
        let text_hits = text_hits.map_err(RetrievalError::from)?;

        let mut by_id: HashMap<String, RetrievedChunk> = HashMap::new();
        for chunk in vector_hits {
            by_id.insert(chunk.chunk_id.clone(), chunk);
        }
        for hit in &text_hits {
            by_id.entry(hit.chunk_id.clone()).or_insert_with(|| RetrievedChunk {
                chunk_id: hit.chunk_id.clone(),
                text: hit.payload.text.clone(),
                score_raw: hit.score,
                rank_in_source: 0,
                source_tier,
                source_name: SourceName::Text,
                similarity_native: None,
                trust_score: hit.payload.trust_score,
                payload: hit.payload.clone(),
            });
        }

        let vector_ids: Vec<String> = by_id
            .values()
            .filter(|c| c.source_name == SourceName::Vector)
            .map(|c| c.chunk_id.clone())
            .collect();
        let text_ids: Vec<String> = text_hits.iter().map(|h| h.chunk_id.clone()).collect();

        let fused = weighted_rrf(
            &[
                RankedSource { weight: VECTOR_WEIGHT, items: &vector_ids },
                RankedSource { weight: TEXT_WEIGHT, items: &text_ids },
            ],
            DEFAULT_RRF_K,
        );

        let mut results: Vec<RetrievedChunk> = fused
            .into_iter()
            .filter_map(|(chunk_id, score)| {
                let mut chunk = by_id.remove(&chunk_id)?;
                chunk.score_raw = score;
                Some(chunk)
            })
            .collect();
        results.truncate(top_k);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbedderRegistry;
    use crate::embedding::local::HashLocalEmbedder;
    use crate::index::text::Bm25TextIndex;
    use crate::index::vector::InMemoryVectorIndex;
    use crate::types::{ChunkBuilder, IngestChunk, TextRecord, TierOrigin, VectorRecord};
    use chrono::Utc;

    async fn seeded_hybrid() -> HybridRetriever {
        let local = Arc::new(HashLocalEmbedder::new(8));
        let registry = Arc::new(EmbedderRegistry::new(local, None));
        let vector_index = Arc::new(InMemoryVectorIndex::new(8));
        let text_index: Arc<dyn TextIndex> = Arc::new(Bm25TextIndex::new());

        for (i, text) in [
            "token bucket rate limiting for web providers",
            "semantic cache lookup by cosine similarity",
        ]
        .iter()
        .enumerate()
        {
            let chunk = ChunkBuilder::build(
                IngestChunk {
                    text: text.to_string(),
                    source_path: format!("doc-{i}.md"),
                    document_id: format!("doc-{i}"),
                    document_type: "pattern".to_string(),
                    tier_origin: TierOrigin::Curated,
                    source_hash: "hash".to_string(),
                    source_mtime: None,
                    url: None,
                    trust_score: None,
                    ttl: None,
                },
                Utc::now(),
            );
            let vector = registry.embed_documents(&[text.to_string()]).await.unwrap();
            vector_index
                .upsert(vec![VectorRecord {
                    chunk_id: chunk.chunk_id.clone(),
                    local_vector: vector[0].clone(),
                    payload: chunk.clone(),
                }])
                .await
                .unwrap();
            text_index
                .upsert(vec![TextRecord {
                    chunk_id: chunk.chunk_id.clone(),
                    text: chunk.text.clone(),
                    payload: chunk,
                }])
                .await
                .unwrap();
        }

        let two_step = TwoStepRetriever::new(registry, vector_index);
        HybridRetriever::new(two_step, text_index)
    }

    #[tokio::test]
    async fn fuses_both_branches_for_a_shared_hit() {
        let hybrid = seeded_hybrid().await;
        let results = hybrid
            .retrieve("rate limiting token bucket", 5, None, None, SourceTier::Tier1)
            .await
            .unwrap();
        assert!(!results.is_empty());
        assert!(results[0].text.contains("rate limiting"));
    }

    #[tokio::test]
    async fn respects_top_k_truncation() {
        let hybrid = seeded_hybrid().await;
        let results = hybrid
            .retrieve("cache", 1, None, None, SourceTier::Tier1)
            .await
            .unwrap();
        assert!(results.len() <= 1);
    }
}
