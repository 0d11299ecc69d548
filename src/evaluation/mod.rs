//! Quality Evaluator (C10): word-overlap heuristics over tokenized, lowercased,
//! stopword-filtered text — no LLM calls. Tokenizer and stopword list are grounded in the
//! teacher's `Reranker::compute_placeholder_score`.

pub mod error;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{instrument, warn};

pub use error::EvaluationError;

use crate::metrics::MetricsSink;
use crate::types::{
    AnswerQualityMetrics, ContextQualityMetrics, HallucinationSeverity, IrMetrics, QualityMetrics,
    RetrievedChunk,
};

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall",
    "can", "need", "dare", "ought", "used", "to", "of", "in", "for", "on", "with", "at", "by",
    "from", "as", "into", "through", "during", "before", "after", "above", "below", "between",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why", "how",
    "all", "each", "few", "more", "most", "other", "some", "such", "no", "nor", "not", "only",
    "own", "same", "so", "than", "too", "very", "just", "and", "but", "if", "or", "because",
    "until", "while", "what", "which", "who", "whom", "this", "that", "these", "those", "am",
    "it", "its",
];

fn tokenize(text: &str) -> HashSet<String> {
    let lower = text.to_lowercase();
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 { 0.0 } else { intersection as f32 / union as f32 }
}

/// Splits `text` into sentence-level claims on `.`, `!`, `?`, dropping empty fragments.
fn split_claims(text: &str) -> Vec<String> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Ground-truth set of relevant `chunk_id`s, for the optional IR metrics.
pub struct GroundTruth<'a> {
    pub relevant_chunk_ids: &'a HashSet<String>,
    pub k: usize,
}

fn ir_metrics(sources: &[RetrievedChunk], ground_truth: &GroundTruth<'_>) -> IrMetrics {
    let k = ground_truth.k.min(sources.len());
    let top_k = &sources[..k];
    let relevant = ground_truth.relevant_chunk_ids;

    let hits_at_k = top_k.iter().filter(|c| relevant.contains(&c.chunk_id)).count();
    let precision_at_k = if k == 0 { 0.0 } else { hits_at_k as f32 / k as f32 };
    let recall_at_k = if relevant.is_empty() { 0.0 } else { hits_at_k as f32 / relevant.len() as f32 };

    let mrr = top_k
        .iter()
        .position(|c| relevant.contains(&c.chunk_id))
        .map(|idx| 1.0 / (idx as f32 + 1.0))
        .unwrap_or(0.0);

    let mut hits_so_far = 0usize;
    let mut precision_sum = 0.0f32;
    for (i, chunk) in top_k.iter().enumerate() {
        if relevant.contains(&chunk.chunk_id) {
            hits_so_far += 1;
            precision_sum += hits_so_far as f32 / (i as f32 + 1.0);
        }
    }
    let map = if relevant.is_empty() { 0.0 } else { precision_sum / relevant.len() as f32 };

    let dcg: f32 = top_k
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            if relevant.contains(&chunk.chunk_id) { 1.0 / (i as f32 + 2.0).log2() } else { 0.0 }
        })
        .sum();
    let ideal_hits = relevant.len().min(k);
    let idcg: f32 = (0..ideal_hits).map(|i| 1.0 / (i as f32 + 2.0).log2()).sum();
    let ndcg_at_k = if idcg == 0.0 { 0.0 } else { dcg / idcg };

    IrMetrics { precision_at_k, recall_at_k, mrr, map, ndcg_at_k }
}

/// Configuration thresholds for the evaluator's heuristics.
#[derive(Debug, Clone, Copy)]
pub struct EvaluatorConfig {
    pub relevance_threshold: f32,
    pub faithfulness_threshold: f32,
    pub utilization_threshold: f32,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            relevance_threshold: crate::constants::DEFAULT_RELEVANCE_THRESHOLD,
            faithfulness_threshold: crate::constants::DEFAULT_FAITHFULNESS_THRESHOLD,
            utilization_threshold: crate::constants::DEFAULT_UTILIZATION_THRESHOLD,
        }
    }
}

pub struct QualityEvaluator {
    config: EvaluatorConfig,
    metrics: Arc<dyn MetricsSink>,
}

impl QualityEvaluator {
    pub fn new(config: EvaluatorConfig, metrics: Arc<dyn MetricsSink>) -> Self {
        Self { config, metrics }
    }

    fn classify_severity(faithfulness: f32) -> HallucinationSeverity {
        if faithfulness >= 1.0 {
            HallucinationSeverity::None
        } else if faithfulness >= 0.7 {
            HallucinationSeverity::Minor
        } else if faithfulness >= 0.4 {
            HallucinationSeverity::Moderate
        } else {
            HallucinationSeverity::Severe
        }
    }

    /// Evaluates `answer` against `query` and the `sources` it was grounded in. `cited_ordinals`
    /// are the 1-based ordinals the generator extracted from the answer (see [`crate::generation`]).
    #[instrument(skip(self, query, answer, sources, cited_ordinals, ground_truth))]
    pub fn evaluate(
        &self,
        query: &str,
        answer: &str,
        sources: &[RetrievedChunk],
        cited_ordinals: &[usize],
        ground_truth: Option<GroundTruth<'_>>,
    ) -> QualityMetrics {
        let chunk_token_sets: Vec<HashSet<String>> = sources.iter().map(|c| tokenize(&c.text)).collect();

        let claims = split_claims(answer);
        let mut unsupported_claims = Vec::new();
        let mut supported = 0usize;
        for claim in &claims {
            let claim_tokens = tokenize(claim);
            let is_supported = chunk_token_sets
                .iter()
                .any(|chunk_tokens| jaccard(&claim_tokens, chunk_tokens) >= self.config.faithfulness_threshold);
            if is_supported {
                supported += 1;
            } else {
                unsupported_claims.push(claim.clone());
            }
        }
        let faithfulness = if claims.is_empty() { 1.0 } else { supported as f32 / claims.len() as f32 };
        let hallucination_severity = Self::classify_severity(faithfulness);
        let has_hallucination = faithfulness < 1.0;

        if matches!(hallucination_severity, HallucinationSeverity::Moderate | HallucinationSeverity::Severe) {
            warn!(query, ?unsupported_claims, ?hallucination_severity, "answer has unsupported claims");
        }

        let query_tokens = tokenize(query);
        let answer_tokens = tokenize(answer);
        let answer_relevancy = jaccard(&query_tokens, &answer_tokens);
        let answer_completeness = if query_tokens.is_empty() {
            1.0
        } else {
            query_tokens.intersection(&answer_tokens).count() as f32 / query_tokens.len() as f32
        };

        let citation_grounding = if cited_ordinals.is_empty() {
            1.0
        } else {
            let in_range = cited_ordinals.iter().filter(|&&ord| ord >= 1 && ord <= sources.len()).count();
            in_range as f32 / cited_ordinals.len() as f32
        };

        let context_precision = if sources.is_empty() {
            0.0
        } else {
            sources.iter().filter(|c| c.score_raw >= self.config.relevance_threshold).count() as f32
                / sources.len() as f32
        };
        let context_relevancy = if sources.is_empty() {
            0.0
        } else {
            sources.iter().map(|c| c.score_raw).sum::<f32>() / sources.len() as f32
        };
        let context_utilization = if sources.is_empty() {
            0.0
        } else {
            chunk_token_sets
                .iter()
                .filter(|chunk_tokens| jaccard(chunk_tokens, &answer_tokens) >= self.config.utilization_threshold)
                .count() as f32
                / sources.len() as f32
        };
        let context_recall = ground_truth.as_ref().map(|gt| {
            if gt.relevant_chunk_ids.is_empty() {
                1.0
            } else {
                let hits = sources.iter().filter(|c| gt.relevant_chunk_ids.contains(&c.chunk_id)).count();
                hits as f32 / gt.relevant_chunk_ids.len() as f32
            }
        });

        let ir = ground_truth.map(|gt| ir_metrics(sources, &gt));

        self.metrics.record_gauge("evaluator_faithfulness", faithfulness as f64);
        self.metrics.record_gauge("evaluator_answer_relevancy", answer_relevancy as f64);
        self.metrics.record_gauge("evaluator_context_precision", context_precision as f64);
        self.metrics.record_counter("evaluator_runs_total", 1);

        QualityMetrics {
            answer: AnswerQualityMetrics {
                faithfulness,
                has_hallucination,
                hallucination_severity,
                answer_relevancy,
                answer_completeness,
                citation_grounding,
                unsupported_claims,
            },
            context: ContextQualityMetrics {
                context_precision,
                context_recall,
                context_relevancy,
                context_utilization,
            },
            ir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::NoopMetricsSink;
    use crate::types::{Chunk, SourceName, SourceTier, TierOrigin};

    fn chunk(id: &str, text: &str, score: f32) -> RetrievedChunk {
        RetrievedChunk {
            chunk_id: id.to_string(),
            text: text.to_string(),
            score_raw: score,
            rank_in_source: 1,
            source_tier: SourceTier::Tier1,
            source_name: SourceName::Vector,
            similarity_native: None,
            trust_score: Some(1.0),
            payload: Chunk {
                chunk_id: id.to_string(),
                text: text.to_string(),
                source_path: format!("{id}.md"),
                document_id: "doc".to_string(),
                document_type: "markdown".to_string(),
                tier_origin: TierOrigin::Curated,
                ingested_at: chrono::Utc::now(),
                source_hash: "h".to_string(),
                source_mtime: None,
                url: None,
                trust_score: Some(1.0),
                expires_at: None,
            },
        }
    }

    fn evaluator() -> QualityEvaluator {
        QualityEvaluator::new(EvaluatorConfig::default(), Arc::new(NoopMetricsSink))
    }

    #[test]
    fn fully_grounded_answer_has_perfect_faithfulness() {
        let sources = vec![chunk("a", "Rust enforces memory safety through ownership.", 0.9)];
        let metrics = evaluator().evaluate(
            "is rust memory safe",
            "Rust enforces memory safety through ownership.",
            &sources,
            &[1],
            None,
        );
        assert_eq!(metrics.answer.faithfulness, 1.0);
        assert_eq!(metrics.answer.hallucination_severity, HallucinationSeverity::None);
        assert!(!metrics.answer.has_hallucination);
    }

    #[test]
    fn unsupported_claim_triggers_hallucination() {
        let sources = vec![chunk("a", "Rust enforces memory safety through ownership.", 0.9)];
        let metrics = evaluator().evaluate(
            "what about rust",
            "Rust enforces memory safety. The moon is made of cheese.",
            &sources,
            &[1],
            None,
        );
        assert!(metrics.answer.faithfulness < 1.0);
        assert!(metrics.answer.has_hallucination);
        assert_eq!(metrics.answer.unsupported_claims.len(), 1);
    }

    #[test]
    fn out_of_range_citation_lowers_grounding() {
        let sources = vec![chunk("a", "text", 0.9)];
        let metrics = evaluator().evaluate("q", "answer [5]", &sources, &[5], None);
        assert_eq!(metrics.answer.citation_grounding, 0.0);
    }

    #[test]
    fn context_precision_reflects_relevance_threshold() {
        let sources = vec![chunk("a", "text", 0.9), chunk("b", "text", 0.1)];
        let metrics = evaluator().evaluate("q", "answer", &sources, &[], None);
        assert_eq!(metrics.context.context_precision, 0.5);
    }

    #[test]
    fn ir_metrics_only_computed_with_ground_truth() {
        let sources = vec![chunk("a", "text", 0.9), chunk("b", "text", 0.5)];
        let without = evaluator().evaluate("q", "answer", &sources, &[], None);
        assert!(without.ir.is_none());

        let relevant: HashSet<String> = ["a".to_string()].into_iter().collect();
        let gt = GroundTruth { relevant_chunk_ids: &relevant, k: 2 };
        let with = evaluator().evaluate("q", "answer", &sources, &[], Some(gt));
        let ir = with.ir.unwrap();
        assert_eq!(ir.precision_at_k, 0.5);
        assert_eq!(ir.mrr, 1.0);
    }

    #[test]
    fn empty_answer_has_perfect_faithfulness_by_convention() {
        let sources = vec![chunk("a", "text", 0.9)];
        let metrics = evaluator().evaluate("q", "", &sources, &[], None);
        assert_eq!(metrics.answer.faithfulness, 1.0);
    }
}
