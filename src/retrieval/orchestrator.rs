//! Three-Tier Orchestrator (C7): fans out curated (Tier 1), persistent web-KB (Tier 2), and
//! live-web (Tier 3) retrieval concurrently, applies the live-tier triggering policy, fuses the
//! three ordered tier outputs with weighted RRF, and optionally promotes live-web results into
//! the web-KB tier asynchronously.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{instrument, warn};

use super::hybrid::HybridRetriever;
use super::rrf::{RankedSource, weighted_rrf};
use crate::constants::DEFAULT_RRF_K;
use crate::embedding::EmbedderRegistry;
use crate::index::{IndexFilter, TextIndex, VectorIndex};
use crate::types::{
    Chunk, ChunkBuilder, DecisionPath, IngestChunk, RetrievedChunk, SourceName, SourceTier,
    TextRecord, TierOrigin, VectorRecord, WebSearchMode, WebSearchResult,
};
use crate::web::WebSearchProvider;

/// Per-`document_id` advisory lock serializing the vector-then-text promotion write so two
/// concurrent promotions of the same web result can't interleave their two-phase writes.
/// Grounded in the `DashMap`-per-key shape `crate::web::rate_limit::RateLimiter` already uses.
#[derive(Default)]
struct PromotionLocks {
    locks: DashMap<String, Arc<AsyncMutex<()>>>,
}

impl PromotionLocks {
    fn get(&self, key: &str) -> Arc<AsyncMutex<()>> {
        Arc::clone(
            self.locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        )
    }
}

/// Tier weights `(w1, w2, w3)`: curated, web knowledge base, live web.
#[derive(Debug, Clone, Copy)]
pub struct TierWeights {
    pub tier_1: f32,
    pub tier_2: f32,
    pub tier_3: f32,
}

impl Default for TierWeights {
    fn default() -> Self {
        let (w1, w2, w3) = crate::constants::DEFAULT_TIER_WEIGHTS;
        Self { tier_1: w1, tier_2: w2, tier_3: w3 }
    }
}

/// Controls whether and under which threshold the live-web tier is promoted into the
/// persistent knowledge base.
#[derive(Debug, Clone, Copy)]
pub struct PromotionConfig {
    pub enabled: bool,
    pub min_trust_score: f32,
    pub ttl: chrono::Duration,
}

impl Default for PromotionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_trust_score: crate::constants::DEFAULT_WEB_KB_MIN_TRUST,
            ttl: chrono::Duration::days(crate::constants::DEFAULT_WEB_KB_TTL_DAYS),
        }
    }
}

pub struct OrchestratorResult {
    pub chunks: Vec<RetrievedChunk>,
    pub decision_path: DecisionPath,
    pub tier_1_count: usize,
    pub tier_2_count: usize,
    pub tier_3_count: usize,
}

/// Fans tiers 1-3 out, fuses, and (optionally) kicks off asynchronous live-web-to-KB promotion.
pub struct ThreeTierOrchestrator {
    hybrid: Arc<HybridRetriever>,
    web: Option<Arc<dyn WebSearchProvider>>,
    vector_index: Arc<dyn VectorIndex>,
    text_index: Arc<dyn TextIndex>,
    registry: Arc<EmbedderRegistry>,
    weights: TierWeights,
    per_tier_timeout: Duration,
    promotion: PromotionConfig,
    promotion_locks: Arc<PromotionLocks>,
}

const LOW_CONFIDENCE_TRIGGER_WORDS: [&str; 4] = ["latest", "recent", "new", "update"];

fn mentions_current_or_future_year(query: &str, now: chrono::DateTime<Utc>) -> Option<i32> {
    let current_year = now.format("%Y").to_string().parse::<i32>().unwrap_or(0);
    let bytes = query.as_bytes();
    let mut i = 0;
    while i + 4 <= bytes.len() {
        if bytes[i..i + 4].iter().all(u8::is_ascii_digit) {
            if let Ok(year) = query[i..i + 4].parse::<i32>() {
                if year >= current_year {
                    return Some(year);
                }
            }
        }
        i += 1;
    }
    None
}

impl ThreeTierOrchestrator {
    pub fn new(
        hybrid: Arc<HybridRetriever>,
        web: Option<Arc<dyn WebSearchProvider>>,
        vector_index: Arc<dyn VectorIndex>,
        text_index: Arc<dyn TextIndex>,
        registry: Arc<EmbedderRegistry>,
        weights: TierWeights,
        per_tier_timeout: Duration,
        promotion: PromotionConfig,
    ) -> Self {
        Self {
            hybrid,
            web,
            vector_index,
            text_index,
            registry,
            weights,
            per_tier_timeout,
            promotion,
            promotion_locks: Arc::new(PromotionLocks::default()),
        }
    }

    fn should_trigger_tier_3(
        &self,
        mode: WebSearchMode,
        query: &str,
        top_local_score: Option<f32>,
        tier_1_2_count: usize,
    ) -> Option<String> {
        match mode {
            WebSearchMode::Off => None,
            WebSearchMode::Parallel => Some("parallel mode".to_string()),
            WebSearchMode::OnLowConfidence => {
                if top_local_score.is_none_or(|s| s < crate::constants::DEFAULT_LOW_CONFIDENCE_SCORE_THRESHOLD) {
                    return Some("top local score below threshold".to_string());
                }
                let lower = query.to_lowercase();
                if LOW_CONFIDENCE_TRIGGER_WORDS.iter().any(|w| lower.contains(w)) {
                    return Some("temporal keyword".to_string());
                }
                if let Some(year) = mentions_current_or_future_year(&lower, Utc::now()) {
                    return Some(format!("temporal keyword: {year}"));
                }
                if tier_1_2_count < crate::constants::DEFAULT_LOW_CONFIDENCE_MIN_RESULTS {
                    return Some("fewer than minimum tier 1+2 results".to_string());
                }
                None
            }
        }
    }

    #[instrument(skip(self, query, user_filter))]
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        web_mode: WebSearchMode,
        user_filter: Option<IndexFilter>,
        premium_name: Option<&str>,
    ) -> OrchestratorResult {
        let mut decision_path = DecisionPath::default();

        let tier1_filter = merge_tier_filter(&user_filter, TierOrigin::Curated);
        let mut tier2_filter = merge_tier_filter(&user_filter, TierOrigin::WebKb);
        tier2_filter.as_of = Some(Utc::now());

        let tier1_fut = tokio::time::timeout(
            self.per_tier_timeout,
            self.hybrid.retrieve(query, top_k, Some(&tier1_filter), premium_name, SourceTier::Tier1),
        );
        let tier2_fut = tokio::time::timeout(
            self.per_tier_timeout,
            self.hybrid.retrieve(query, top_k, Some(&tier2_filter), premium_name, SourceTier::Tier2),
        );

        let (tier1_res, tier2_res) = tokio::join!(tier1_fut, tier2_fut);

        let tier1 = flatten_tier_result(tier1_res, &mut decision_path, "tier 1");
        let tier2 = flatten_tier_result(tier2_res, &mut decision_path, "tier 2");
        decision_path.tier_1_used = true;
        decision_path.tier_2_used = true;

        let top_local_score = tier1
            .iter()
            .chain(tier2.iter())
            .map(|c| c.similarity_native.unwrap_or(c.score_raw))
            .fold(None, |acc: Option<f32>, s| Some(acc.map_or(s, |a| a.max(s))));

        let trigger_reason =
            self.should_trigger_tier_3(web_mode, query, top_local_score, tier1.len() + tier2.len());

        let tier3 = if let (Some(reason), Some(web)) = (trigger_reason, self.web.as_ref()) {
            decision_path.web_live_used = true;
            decision_path.web_trigger_reason = Some(reason.to_string());
            match tokio::time::timeout(self.per_tier_timeout, web.search(query, top_k)).await {
                Ok(Ok(results)) => {
                    let chunks = web_results_to_chunks(&results);
                    if self.promotion.enabled {
                        self.spawn_promotion(results);
                    }
                    chunks
                }
                Ok(Err(err)) => {
                    warn!(error = %err, "tier 3 web search failed");
                    decision_path.errors.push(format!("tier 3: {err}"));
                    Vec::new()
                }
                Err(_) => {
                    warn!("tier 3 web search timed out");
                    decision_path.errors.push("tier 3: deadline exceeded".to_string());
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let tier_1_count = tier1.len();
        let tier_2_count = tier2.len();
        let tier_3_count = tier3.len();

        let chunks = self.fuse(tier1, tier2, tier3, top_k);

        OrchestratorResult { chunks, decision_path, tier_1_count, tier_2_count, tier_3_count }
    }

    fn fuse(
        &self,
        tier1: Vec<RetrievedChunk>,
        tier2: Vec<RetrievedChunk>,
        tier3: Vec<RetrievedChunk>,
        top_k: usize,
    ) -> Vec<RetrievedChunk> {
        let mut by_id = std::collections::HashMap::new();
        let tier1_ids: Vec<String> = tier1.iter().map(|c| c.chunk_id.clone()).collect();
        let tier2_ids: Vec<String> = tier2.iter().map(|c| c.chunk_id.clone()).collect();
        let tier3_ids: Vec<String> = tier3.iter().map(|c| c.chunk_id.clone()).collect();
        for chunk in tier1.into_iter().chain(tier2).chain(tier3) {
            by_id.entry(chunk.chunk_id.clone()).or_insert(chunk);
        }

        let fused = weighted_rrf(
            &[
                RankedSource { weight: self.weights.tier_1, items: &tier1_ids },
                RankedSource { weight: self.weights.tier_2, items: &tier2_ids },
                RankedSource { weight: self.weights.tier_3, items: &tier3_ids },
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
        results
    }

    /// Chunks and ingests trustworthy, full-text Tier-3 results into the web-KB tier without
    /// blocking the caller's response. The vector write runs first and must succeed before the
    /// text write is attempted, so a chunk is never visible via text search without also being
    /// present in the vector index; the per-`document_id` lock keeps two concurrent promotions
    /// of the same URL from interleaving their writes.
    fn spawn_promotion(&self, results: Vec<WebSearchResult>) {
        let vector_index = Arc::clone(&self.vector_index);
        let text_index = Arc::clone(&self.text_index);
        let registry = Arc::clone(&self.registry);
        let locks = Arc::clone(&self.promotion_locks);
        let min_trust = self.promotion.min_trust_score;
        let ttl = self.promotion.ttl;
        tokio::spawn(async move {
            for result in results {
                if !result.is_full_text || result.trust_score < min_trust {
                    continue;
                }

                let lock = locks.get(&result.url);
                let _guard = lock.lock().await;

                let chunk = ChunkBuilder::build(
                    IngestChunk {
                        text: result.snippet_or_content.clone(),
                        source_path: result.url.clone(),
                        document_id: result.url.clone(),
                        document_type: "web".to_string(),
                        tier_origin: TierOrigin::WebKb,
                        source_hash: crate::hashing::sha256_hex(result.snippet_or_content.as_bytes()),
                        source_mtime: None,
                        url: Some(result.url.clone()),
                        trust_score: Some(result.trust_score),
                        ttl: Some(ttl),
                    },
                    Utc::now(),
                );

                let vector = match registry.embed_documents(&[chunk.text.clone()]).await {
                    Ok(mut vecs) => vecs.remove(0),
                    Err(err) => {
                        warn!(error = %err, url = %result.url, "web-kb embedding failed, skipping promotion");
                        continue;
                    }
                };

                if let Err(err) = vector_index
                    .upsert(vec![VectorRecord { chunk_id: chunk.chunk_id.clone(), local_vector: vector, payload: chunk.clone() }])
                    .await
                {
                    warn!(error = %err, url = %result.url, "web-kb vector promotion failed, skipping text write");
                    continue;
                }

                if let Err(err) = text_index
                    .upsert(vec![TextRecord { chunk_id: chunk.chunk_id.clone(), text: chunk.text.clone(), payload: chunk }])
                    .await
                {
                    warn!(error = %err, url = %result.url, "web-kb text promotion failed after vector write");
                }
            }
        });
    }
}

fn merge_tier_filter(user_filter: &Option<IndexFilter>, tier_origin: TierOrigin) -> IndexFilter {
    let mut filter = user_filter.clone().unwrap_or_default();
    filter.tier_origin = Some(tier_origin);
    filter
}

fn flatten_tier_result(
    result: Result<Result<Vec<RetrievedChunk>, crate::retrieval::RetrievalError>, tokio::time::error::Elapsed>,
    decision_path: &mut DecisionPath,
    label: &str,
) -> Vec<RetrievedChunk> {
    match result {
        Ok(Ok(chunks)) => chunks,
        Ok(Err(err)) => {
            warn!(error = %err, tier = label, "tier retrieval failed");
            decision_path.errors.push(format!("{label}: {err}"));
            Vec::new()
        }
        Err(_) => {
            warn!(tier = label, "tier retrieval timed out");
            decision_path.errors.push(format!("{label}: deadline exceeded"));
            Vec::new()
        }
    }
}

fn web_results_to_chunks(results: &[WebSearchResult]) -> Vec<RetrievedChunk> {
    results
        .iter()
        .enumerate()
        .map(|(rank, result)| {
            let payload = Chunk {
                chunk_id: crate::hashing::chunk_id(&result.url, "live", &result.snippet_or_content),
                text: result.snippet_or_content.clone(),
                source_path: result.url.clone(),
                document_id: result.url.clone(),
                document_type: "web".to_string(),
                tier_origin: TierOrigin::WebKb,
                ingested_at: result.retrieved_at,
                source_hash: String::new(),
                source_mtime: None,
                url: Some(result.url.clone()),
                trust_score: Some(result.trust_score),
                expires_at: None,
            };
            RetrievedChunk {
                chunk_id: payload.chunk_id.clone(),
                text: payload.text.clone(),
                score_raw: 1.0 / (rank as f32 + 1.0),
                rank_in_source: rank + 1,
                source_tier: SourceTier::Tier3,
                source_name: SourceName::WebLive,
                similarity_native: None,
                trust_score: Some(result.trust_score),
                payload,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbedderRegistry;
    use crate::embedding::local::HashLocalEmbedder;
    use crate::index::text::Bm25TextIndex;
    use crate::index::vector::InMemoryVectorIndex;
    use crate::retrieval::two_step::TwoStepRetriever;
    use crate::types::{ChunkBuilder as CB, IngestChunk as IC, TierOrigin as TO};
    use crate::web::provider::mock::StubWebSearchProvider;

    async fn build_orchestrator(
        web: Option<Arc<dyn WebSearchProvider>>,
    ) -> ThreeTierOrchestrator {
        let local = Arc::new(HashLocalEmbedder::new(8));
        let registry = Arc::new(EmbedderRegistry::new(local, None));
        let vector_index: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new(8));
        let text_index: Arc<dyn TextIndex> = Arc::new(Bm25TextIndex::new());

        let chunk = CB::build(
            IC {
                text: "curated rate limiting guidance".to_string(),
                source_path: "doc-0.md".to_string(),
                document_id: "doc-0".to_string(),
                document_type: "pattern".to_string(),
                tier_origin: TO::Curated,
                source_hash: "hash".to_string(),
                source_mtime: None,
                url: None,
                trust_score: None,
                ttl: None,
            },
            Utc::now(),
        );
        let vector = registry.embed_documents(&[chunk.text.clone()]).await.unwrap();
        vector_index
            .upsert(vec![VectorRecord { chunk_id: chunk.chunk_id.clone(), local_vector: vector[0].clone(), payload: chunk.clone() }])
            .await
            .unwrap();
        text_index
            .upsert(vec![TextRecord { chunk_id: chunk.chunk_id.clone(), text: chunk.text.clone(), payload: chunk }])
            .await
            .unwrap();

        let two_step = TwoStepRetriever::new(Arc::clone(&registry), Arc::clone(&vector_index));
        let hybrid = Arc::new(HybridRetriever::new(two_step, Arc::clone(&text_index)));

        ThreeTierOrchestrator::new(
            hybrid,
            web,
            vector_index,
            text_index,
            registry,
            TierWeights::default(),
            Duration::from_millis(500),
            PromotionConfig { enabled: false, ..PromotionConfig::default() },
        )
    }

    #[tokio::test]
    async fn off_mode_never_runs_tier_3() {
        let web: Arc<dyn WebSearchProvider> = Arc::new(StubWebSearchProvider::with_results(vec![]));
        let orchestrator = build_orchestrator(Some(web)).await;
        let result = orchestrator
            .retrieve("rate limiting guidance", 5, WebSearchMode::Off, None, None)
            .await;
        assert!(!result.decision_path.web_live_used);
        assert_eq!(result.tier_3_count, 0);
    }

    #[tokio::test]
    async fn parallel_mode_always_runs_tier_3() {
        let web_result = WebSearchResult {
            rank: 1,
            title: "t".to_string(),
            snippet_or_content: "fresh web content".to_string(),
            url: "https://example.com".to_string(),
            provider_id: "stub".to_string(),
            trust_score: 0.8,
            retrieved_at: Utc::now(),
            is_full_text: false,
        };
        let web: Arc<dyn WebSearchProvider> = Arc::new(StubWebSearchProvider::with_results(vec![web_result]));
        let orchestrator = build_orchestrator(Some(web)).await;
        let result = orchestrator
            .retrieve("rate limiting guidance", 5, WebSearchMode::Parallel, None, None)
            .await;
        assert!(result.decision_path.web_live_used);
        assert_eq!(result.tier_3_count, 1);
    }

    #[tokio::test]
    async fn on_low_confidence_triggers_on_temporal_keyword() {
        let web: Arc<dyn WebSearchProvider> = Arc::new(StubWebSearchProvider::with_results(vec![]));
        let orchestrator = build_orchestrator(Some(web)).await;
        let result = orchestrator
            .retrieve("latest rate limiting guidance", 5, WebSearchMode::OnLowConfidence, None, None)
            .await;
        assert!(result.decision_path.web_live_used);
        assert_eq!(result.decision_path.web_trigger_reason.as_deref(), Some("temporal keyword"));
    }

    #[tokio::test]
    async fn rate_limited_web_tier_still_returns_tier_1_results() {
        let web: Arc<dyn WebSearchProvider> = Arc::new(StubWebSearchProvider::rate_limited());
        let orchestrator = build_orchestrator(Some(web)).await;
        let result = orchestrator
            .retrieve("latest rate limiting guidance", 5, WebSearchMode::Parallel, None, None)
            .await;
        assert_eq!(result.tier_3_count, 0);
        assert!(result.tier_1_count >= 1);
        assert!(!result.decision_path.errors.is_empty());
    }
}
