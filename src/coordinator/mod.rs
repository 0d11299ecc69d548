//! Query Coordinator (C12): the single public entry point. Validates the request, embeds the
//! query once, checks the semantic cache, fans out to the three-tier orchestrator on a miss,
//! truncates to the generator's token budget, generates an answer, scores it, and stores the
//! result back in the cache.
//!
//! Grounded in the shape of the teacher's `TieredCache::lookup_with_semantic_query` →
//! `CrossEncoderScorer::verify_candidates` chain, generalized to
//! cache → tiers → generation → evaluation → cache-store.

pub mod error;

use std::sync::Arc;

use tracing::{instrument, warn};

pub use error::CoordinatorError;

use crate::cache::SemanticCacheHandle;
use crate::constants::{MAX_TOP_K, MIN_TOP_K};
use crate::embedding::EmbedderRegistry;
use crate::evaluation::QualityEvaluator;
use crate::generation::AnswerGenerator;
use crate::index::IndexFilter;
use crate::retrieval::ThreeTierOrchestrator;
use crate::types::{AnswerResult, QualityMetrics, RetrievalStats, UserContext, WebSearchMode};

/// A single incoming query, already decoded from whatever transport (HTTP, in-process) it
/// arrived over.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub query: String,
    pub top_k: Option<usize>,
    pub use_cache: bool,
    pub premium_name: Option<String>,
    pub web_mode: WebSearchMode,
    pub user_context: UserContext,
    pub filter: Option<IndexFilter>,
}

impl Default for QueryRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            top_k: None,
            use_cache: true,
            premium_name: None,
            web_mode: WebSearchMode::default(),
            user_context: UserContext::default(),
            filter: None,
        }
    }
}

/// Wires together the registry, cache, orchestrator, generator, and evaluator behind the
/// single `query` entry point.
pub struct QueryCoordinator {
    registry: Arc<EmbedderRegistry>,
    cache: SemanticCacheHandle,
    orchestrator: Arc<ThreeTierOrchestrator>,
    generator: Arc<AnswerGenerator>,
    evaluator: Arc<QualityEvaluator>,
    top_k_default: usize,
    context_token_budget: usize,
    evaluator_enabled: bool,
    evaluator_sample_rate: f32,
}

impl QueryCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<EmbedderRegistry>,
        cache: SemanticCacheHandle,
        orchestrator: Arc<ThreeTierOrchestrator>,
        generator: Arc<AnswerGenerator>,
        evaluator: Arc<QualityEvaluator>,
        top_k_default: usize,
        context_token_budget: usize,
        evaluator_enabled: bool,
        evaluator_sample_rate: f32,
    ) -> Self {
        Self {
            registry,
            cache,
            orchestrator,
            generator,
            evaluator,
            top_k_default,
            context_token_budget,
            evaluator_enabled,
            evaluator_sample_rate,
        }
    }

    fn validate(&self, request: &QueryRequest) -> Result<usize, CoordinatorError> {
        if request.query.trim().is_empty() {
            return Err(CoordinatorError::EmptyQuery);
        }
        let top_k = request.top_k.unwrap_or(self.top_k_default);
        if !(MIN_TOP_K..=MAX_TOP_K).contains(&top_k) {
            return Err(CoordinatorError::TopKOutOfRange { actual: top_k, min: MIN_TOP_K, max: MAX_TOP_K });
        }
        Ok(top_k)
    }

    fn should_evaluate(&self, query: &str) -> bool {
        if !self.evaluator_enabled {
            return false;
        }
        if self.evaluator_sample_rate >= 1.0 {
            return true;
        }
        if self.evaluator_sample_rate <= 0.0 {
            return false;
        }
        let bucket = crate::hashing::hash_to_u64(query.as_bytes()) as f64 / u64::MAX as f64;
        bucket < self.evaluator_sample_rate as f64
    }

    #[instrument(skip(self, request), fields(query = %request.query))]
    pub async fn query(&self, request: QueryRequest) -> Result<AnswerResult, CoordinatorError> {
        let top_k = self.validate(&request)?;
        let premium_name = request.premium_name.as_deref();

        let q_local = self.registry.embed_query(&request.query, premium_name).await?;
        let fingerprint = request.user_context.fingerprint();

        if request.use_cache
            && let Some(entry) = self.cache.lookup(&q_local, fingerprint)
        {
            return Ok(AnswerResult {
                answer: entry.answer,
                retrieved_docs: entry.sources.len(),
                context_docs_used: entry.sources.len(),
                sources: entry.sources,
                cache_hit: true,
                retrieval_stats: Some(RetrievalStats { cache_hit: true, ..Default::default() }),
                decision_path: None,
                quality_metrics: None,
            });
        }

        let orchestrator_result = self
            .orchestrator
            .retrieve(&request.query, top_k, request.web_mode, request.filter.clone(), premium_name)
            .await;

        let retrieved_docs = orchestrator_result.chunks.len();
        let truncated =
            AnswerGenerator::truncate_to_budget(orchestrator_result.chunks.clone(), self.context_token_budget);
        let context_docs_used = truncated.len();

        let generated = match self.generator.generate(&request.query, &truncated).await {
            Ok(generated) => generated,
            Err(err) => {
                warn!(error = %err, "generation failed, returning sources without an answer");
                return Ok(AnswerResult {
                    answer: String::new(),
                    sources: truncated,
                    cache_hit: false,
                    retrieved_docs,
                    context_docs_used,
                    retrieval_stats: Some(RetrievalStats {
                        tier_1_results: orchestrator_result.tier_1_count,
                        tier_2_results: orchestrator_result.tier_2_count,
                        tier_3_results: orchestrator_result.tier_3_count,
                        cache_hit: false,
                    }),
                    decision_path: Some(orchestrator_result.decision_path),
                    quality_metrics: None,
                });
            }
        };

        let quality_metrics: Option<QualityMetrics> = if self.should_evaluate(&request.query) {
            Some(self.evaluator.evaluate(&request.query, &generated.answer, &truncated, &generated.cited_ordinals, None))
        } else {
            None
        };

        self.cache.store(q_local, fingerprint, generated.answer.clone(), truncated.clone());

        Ok(AnswerResult {
            answer: generated.answer,
            sources: truncated,
            cache_hit: false,
            retrieved_docs,
            context_docs_used,
            retrieval_stats: Some(RetrievalStats {
                tier_1_results: orchestrator_result.tier_1_count,
                tier_2_results: orchestrator_result.tier_2_count,
                tier_3_results: orchestrator_result.tier_3_count,
                cache_hit: false,
            }),
            decision_path: Some(orchestrator_result.decision_path),
            quality_metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SemanticCacheHandle;
    use crate::embedding::EmbedderRegistry;
    use crate::embedding::local::HashLocalEmbedder;
    use crate::evaluation::{EvaluatorConfig, QualityEvaluator};
    use crate::generation::AnswerGenerator;
    use crate::generation::mock::StubLanguageModel;
    use crate::index::text::Bm25TextIndex;
    use crate::index::vector::InMemoryVectorIndex;
    use crate::metrics::NoopMetricsSink;
    use crate::retrieval::{HybridRetriever, PromotionConfig, ThreeTierOrchestrator, TierWeights};
    use crate::retrieval::two_step::TwoStepRetriever;
    use crate::types::{ChunkBuilder, IngestChunk, TextRecord, TierOrigin, VectorRecord};
    use chrono::Utc;
    use std::time::Duration;

    async fn seeded_coordinator(response: &str) -> QueryCoordinator {
        let local = Arc::new(HashLocalEmbedder::new(8));
        let registry = Arc::new(EmbedderRegistry::new(local, None));
        let vector_index: Arc<dyn crate::index::VectorIndex> = Arc::new(InMemoryVectorIndex::new(8));
        let text_index: Arc<dyn crate::index::TextIndex> = Arc::new(Bm25TextIndex::new());

        let chunk = ChunkBuilder::build(
            IngestChunk {
                text: "rate limiting with a token bucket".to_string(),
                source_path: "doc-0.md".to_string(),
                document_id: "doc-0".to_string(),
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
        let orchestrator = Arc::new(ThreeTierOrchestrator::new(
            hybrid,
            None,
            vector_index,
            text_index,
            Arc::clone(&registry),
            TierWeights::default(),
            Duration::from_millis(500),
            PromotionConfig { enabled: false, ..PromotionConfig::default() },
        ));

        let llm = Arc::new(StubLanguageModel { response: response.to_string() });
        let generator = Arc::new(AnswerGenerator::new(llm, "stub-model", 0.0, 256));
        let evaluator = Arc::new(QualityEvaluator::new(EvaluatorConfig::default(), Arc::new(NoopMetricsSink)));

        QueryCoordinator::new(registry, SemanticCacheHandle::new(), orchestrator, generator, evaluator, 10, 500, true, 1.0)
    }

    #[tokio::test]
    async fn rejects_empty_query() {
        let coordinator = seeded_coordinator("answer [1]").await;
        let result = coordinator.query(QueryRequest { query: "  ".to_string(), ..Default::default() }).await;
        assert!(matches!(result, Err(CoordinatorError::EmptyQuery)));
    }

    #[tokio::test]
    async fn rejects_out_of_range_top_k() {
        let coordinator = seeded_coordinator("answer").await;
        let result = coordinator
            .query(QueryRequest { query: "rate limiting".to_string(), top_k: Some(100), ..Default::default() })
            .await;
        assert!(matches!(result, Err(CoordinatorError::TopKOutOfRange { .. })));
    }

    #[tokio::test]
    async fn cache_miss_then_hit_on_repeat_query() {
        let coordinator = seeded_coordinator("rate limiting uses a token bucket [1]").await;
        let request = QueryRequest { query: "explain rate limiting".to_string(), ..Default::default() };

        let first = coordinator.query(request.clone()).await.unwrap();
        assert!(!first.cache_hit);
        assert!(!first.sources.is_empty());

        let second = coordinator.query(request).await.unwrap();
        assert!(second.cache_hit);
        assert_eq!(second.answer, first.answer);
    }
}
