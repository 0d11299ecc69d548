//! Shared data model: chunks, records, and the ephemeral per-query types that flow
//! between retrieval, generation, and evaluation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a chunk originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierOrigin {
    /// Curated source corpus, ingested offline.
    Curated,
    /// Promoted from a live web result into the persistent knowledge base.
    WebKb,
}

/// Which retrieval source produced a [`RetrievedChunk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceName {
    Vector,
    Text,
    WebKb,
    WebLive,
}

/// Which of the three orchestrator tiers a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceTier {
    Tier1 = 1,
    Tier2 = 2,
    Tier3 = 3,
}

/// A unit of retrievable text, owned by the vector and text indexes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub text: String,
    pub source_path: String,
    pub document_id: String,
    pub document_type: String,
    pub tier_origin: TierOrigin,
    pub ingested_at: DateTime<Utc>,
    /// SHA-256 of the owning document's source bytes, hex-encoded.
    pub source_hash: String,
    pub source_mtime: Option<DateTime<Utc>>,
    pub url: Option<String>,
    pub trust_score: Option<f32>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Chunk {
    /// True if this chunk has an `expires_at` in the past relative to `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// Input carrier for the (out-of-scope) ingestion caller handing chunks to the index adapters.
/// Not a parser — just a builder that fills in the deterministic fields [`Chunk`] requires.
#[derive(Debug, Clone)]
pub struct IngestChunk {
    pub text: String,
    pub source_path: String,
    pub document_id: String,
    pub document_type: String,
    pub tier_origin: TierOrigin,
    pub source_hash: String,
    pub source_mtime: Option<DateTime<Utc>>,
    pub url: Option<String>,
    pub trust_score: Option<f32>,
    pub ttl: Option<chrono::Duration>,
}

/// Builds [`Chunk`]s from [`IngestChunk`] inputs, deriving `chunk_id` deterministically.
pub struct ChunkBuilder;

impl ChunkBuilder {
    /// Builds a chunk, stamping `ingested_at = now` and deriving `chunk_id` from
    /// `(document_id, source_hash, text)` so re-ingestion of unchanged content is idempotent.
    pub fn build(input: IngestChunk, now: DateTime<Utc>) -> Chunk {
        let chunk_id =
            crate::hashing::chunk_id(&input.document_id, &input.source_hash, &input.text);
        Chunk {
            chunk_id,
            text: input.text,
            source_path: input.source_path,
            document_id: input.document_id,
            document_type: input.document_type,
            tier_origin: input.tier_origin,
            ingested_at: now,
            source_hash: input.source_hash,
            source_mtime: input.source_mtime,
            url: input.url,
            trust_score: input.trust_score,
            expires_at: input.ttl.map(|ttl| now + ttl),
        }
    }
}

/// A vector-index row: `(chunk_id, local_vector, payload)`.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub chunk_id: String,
    pub local_vector: Vec<f32>,
    pub payload: Chunk,
}

/// A text-index row: `(chunk_id, text, payload subset)`.
#[derive(Debug, Clone)]
pub struct TextRecord {
    pub chunk_id: String,
    pub text: String,
    pub payload: Chunk,
}

/// Payload filter applied to vector/text index queries.
#[derive(Debug, Clone, Default)]
pub struct IndexFilter {
    pub tier_origin: Option<TierOrigin>,
    pub document_type: Option<String>,
    /// When set, chunks whose `expires_at` is at or before this instant are excluded.
    pub as_of: Option<DateTime<Utc>>,
}

impl IndexFilter {
    pub fn matches(&self, chunk: &Chunk) -> bool {
        if let Some(tier) = self.tier_origin
            && chunk.tier_origin != tier
        {
            return false;
        }
        if let Some(ref dt) = self.document_type
            && &chunk.document_type != dt
        {
            return false;
        }
        if let Some(as_of) = self.as_of
            && chunk.is_expired(as_of)
        {
            return false;
        }
        true
    }
}

/// A scored hit from a single retrieval source, ephemeral for the duration of a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk_id: String,
    pub text: String,
    pub score_raw: f32,
    pub rank_in_source: usize,
    pub source_tier: SourceTier,
    pub source_name: SourceName,
    pub similarity_native: Option<f32>,
    pub trust_score: Option<f32>,
    pub payload: Chunk,
}

impl Serialize for SourceTier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for SourceTier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        match value {
            1 => Ok(SourceTier::Tier1),
            2 => Ok(SourceTier::Tier2),
            3 => Ok(SourceTier::Tier3),
            other => Err(serde::de::Error::custom(format!(
                "invalid source tier: {other}"
            ))),
        }
    }
}

/// A single live-web search hit, before extraction/promotion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchResult {
    pub rank: usize,
    pub title: String,
    pub snippet_or_content: String,
    pub url: String,
    pub provider_id: String,
    pub trust_score: f32,
    pub retrieved_at: DateTime<Utc>,
    /// True if `snippet_or_content` is full extracted body text rather than a short snippet.
    pub is_full_text: bool,
}

/// A materialized web document, ready to be chunked and promoted into the web-KB tier.
#[derive(Debug, Clone)]
pub struct WebDocument {
    pub url: String,
    pub title: String,
    pub text: String,
    pub trust_score: f32,
    pub retrieved_at: DateTime<Utc>,
}

/// A cache entry keyed by query embedding.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub query_embedding_local: Vec<f32>,
    pub fingerprint: u64,
    pub answer: String,
    pub sources: Vec<RetrievedChunk>,
    pub created_at: DateTime<Utc>,
    pub ttl: chrono::Duration,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.created_at + self.ttl <= now
    }
}

/// Per-tier hit counts and the cache flag, returned alongside every [`AnswerResult`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalStats {
    pub tier_1_results: usize,
    pub tier_2_results: usize,
    pub tier_3_results: usize,
    pub cache_hit: bool,
}

/// Records which tiers ran and why, for a single query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionPath {
    pub tier_1_used: bool,
    pub tier_2_used: bool,
    pub web_live_used: bool,
    pub web_trigger_reason: Option<String>,
    pub cache_used: bool,
    pub rerank_used: bool,
    pub errors: Vec<String>,
}

/// Answer-level quality metrics computed by the evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerQualityMetrics {
    pub faithfulness: f32,
    pub has_hallucination: bool,
    pub hallucination_severity: HallucinationSeverity,
    pub answer_relevancy: f32,
    pub answer_completeness: f32,
    pub citation_grounding: f32,
    pub unsupported_claims: Vec<String>,
}

/// Context-level quality metrics computed by the evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextQualityMetrics {
    pub context_precision: f32,
    pub context_recall: Option<f32>,
    pub context_relevancy: f32,
    pub context_utilization: f32,
}

/// Coarse classification of an answer's deviation from grounded context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HallucinationSeverity {
    None,
    Minor,
    Moderate,
    Severe,
}

/// Information-retrieval metrics, only populated when a ground-truth set is supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrMetrics {
    pub precision_at_k: f32,
    pub recall_at_k: f32,
    pub mrr: f32,
    pub map: f32,
    pub ndcg_at_k: f32,
}

/// Full quality-metrics bundle attached to an [`AnswerResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub answer: AnswerQualityMetrics,
    pub context: ContextQualityMetrics,
    pub ir: Option<IrMetrics>,
}

/// The public response type returned by the query coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub sources: Vec<RetrievedChunk>,
    pub cache_hit: bool,
    pub retrieved_docs: usize,
    pub context_docs_used: usize,
    pub retrieval_stats: Option<RetrievalStats>,
    pub decision_path: Option<DecisionPath>,
    pub quality_metrics: Option<QualityMetrics>,
}

/// Arbitrary user-supplied context accompanying a query; used to derive filters and the
/// cache fingerprint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserContext {
    #[serde(flatten)]
    pub fields: HashMap<String, serde_json::Value>,
}

impl UserContext {
    /// Deterministic fingerprint over the sorted field set, used to keep the semantic cache
    /// from leaking answers across contexts.
    pub fn fingerprint(&self) -> u64 {
        let mut keys: Vec<_> = self.fields.keys().collect();
        keys.sort();
        let mut buf = String::new();
        for key in keys {
            buf.push_str(key);
            buf.push('=');
            buf.push_str(&self.fields[key].to_string());
            buf.push(';');
        }
        crate::hashing::hash_to_u64(buf.as_bytes())
    }
}

/// Mode controlling whether and when the live-web tier runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebSearchMode {
    Off,
    Parallel,
    #[default]
    OnLowConfidence,
}
