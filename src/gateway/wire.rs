//! HTTP wire shapes for the query endpoint, kept separate from the internal
//! [`crate::types`] model so the external contract can evolve independently of it.

use serde::{Deserialize, Serialize};

use crate::types::{AnswerResult, DecisionPath, RetrievedChunk, SourceName, WebSearchMode};

const CHUNK_TEXT_PREVIEW_CHARS: usize = 400;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequestWire {
    pub query: String,
    pub top_k: Option<usize>,
    #[serde(default = "default_true")]
    pub use_cache: bool,
    pub query_embedder_type: Option<String>,
    #[serde(default)]
    pub user_context: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub enable_web_search: bool,
    pub web_mode: Option<WebModeWire>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebModeWire {
    Parallel,
    OnLowConfidence,
}

impl From<WebModeWire> for WebSearchMode {
    fn from(value: WebModeWire) -> Self {
        match value {
            WebModeWire::Parallel => WebSearchMode::Parallel,
            WebModeWire::OnLowConfidence => WebSearchMode::OnLowConfidence,
        }
    }
}

impl QueryRequestWire {
    /// Resolves the effective web mode: `enable_web_search = false` always wins with `Off`;
    /// otherwise the caller's explicit mode, defaulting to `on_low_confidence`.
    pub fn resolved_web_mode(&self) -> WebSearchMode {
        if !self.enable_web_search {
            return WebSearchMode::Off;
        }
        self.web_mode.map(Into::into).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceWire {
    pub document_id: String,
    pub source_path: String,
    pub document_type: String,
    pub score: f32,
    pub source_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust_score: Option<f32>,
    pub chunk_text: String,
}

fn source_type_label(name: SourceName) -> &'static str {
    match name {
        SourceName::Vector => "vector",
        SourceName::Text => "text",
        SourceName::WebKb => "web_kb",
        SourceName::WebLive => "web_live",
    }
}

impl From<&RetrievedChunk> for SourceWire {
    fn from(chunk: &RetrievedChunk) -> Self {
        let preview: String = chunk.text.chars().take(CHUNK_TEXT_PREVIEW_CHARS).collect();
        Self {
            document_id: chunk.payload.document_id.clone(),
            source_path: chunk.payload.source_path.clone(),
            document_type: chunk.payload.document_type.clone(),
            score: chunk.similarity_native.unwrap_or(chunk.score_raw),
            source_type: source_type_label(chunk.source_name),
            url: chunk.payload.url.clone(),
            trust_score: chunk.trust_score,
            chunk_text: preview,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TierBreakdownWire {
    pub tier_1_results: usize,
    pub tier_2_results: usize,
    pub tier_3_results: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchParametersWire {
    pub top_k: usize,
    pub web_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub premium_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrievalMetricsWire {
    pub documents: usize,
    pub tier_breakdown: TierBreakdownWire,
    pub decision_path: DecisionPath,
    pub search_parameters: SearchParametersWire,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationReasoningWire {
    pub context_selection: String,
    pub document_ranking: String,
    pub prompt_structure: String,
    pub citations_found: usize,
    pub model_used: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrievalStatsWire {
    pub tier_1_results: usize,
    pub tier_2_results: usize,
    pub tier_3_results: usize,
    pub cache_hit: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponseWire {
    pub answer: String,
    pub sources: Vec<SourceWire>,
    pub cache_hit: bool,
    pub retrieved_docs: usize,
    pub context_docs_used: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieval_stats: Option<RetrievalStatsWire>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieval_metrics: Option<RetrievalMetricsWire>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_reasoning: Option<GenerationReasoningWire>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_metrics: Option<crate::types::QualityMetrics>,
}

/// Assembles the wire response from the coordinator's result plus the request-scoped facts
/// (`top_k`, resolved web mode, model name) the internal [`AnswerResult`] doesn't carry.
pub fn to_wire_response(
    result: AnswerResult,
    top_k: usize,
    web_mode: WebSearchMode,
    premium_name: Option<String>,
    generation_model: &str,
) -> QueryResponseWire {
    let sources: Vec<SourceWire> = result.sources.iter().map(SourceWire::from).collect();

    let retrieval_metrics = result.decision_path.clone().map(|decision_path| RetrievalMetricsWire {
        documents: result.retrieved_docs,
        tier_breakdown: TierBreakdownWire {
            tier_1_results: result.retrieval_stats.as_ref().map(|s| s.tier_1_results).unwrap_or_default(),
            tier_2_results: result.retrieval_stats.as_ref().map(|s| s.tier_2_results).unwrap_or_default(),
            tier_3_results: result.retrieval_stats.as_ref().map(|s| s.tier_3_results).unwrap_or_default(),
        },
        decision_path,
        search_parameters: SearchParametersWire {
            top_k,
            web_mode: match web_mode {
                WebSearchMode::Off => "off",
                WebSearchMode::Parallel => "parallel",
                WebSearchMode::OnLowConfidence => "on_low_confidence",
            },
            premium_name,
        },
    });

    let generation_reasoning = if result.answer.is_empty() {
        None
    } else {
        Some(GenerationReasoningWire {
            context_selection: "fused tiers truncated to the generator's token budget".to_string(),
            document_ranking: "weighted reciprocal rank fusion across retrieval tiers".to_string(),
            prompt_structure: "numbered sources with bracketed citation instructions".to_string(),
            citations_found: sources.len(),
            model_used: generation_model.to_string(),
        })
    };

    QueryResponseWire {
        answer: result.answer,
        sources,
        cache_hit: result.cache_hit,
        retrieved_docs: result.retrieved_docs,
        context_docs_used: result.context_docs_used,
        retrieval_stats: result.retrieval_stats.map(|s| RetrievalStatsWire {
            tier_1_results: s.tier_1_results,
            tier_2_results: s.tier_2_results,
            tier_3_results: s.tier_3_results,
            cache_hit: s.cache_hit,
        }),
        retrieval_metrics,
        generation_reasoning,
        quality_metrics: result.quality_metrics,
    }
}
