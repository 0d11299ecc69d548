//! Text Index Adapter (C3): BM25 keyword search over chunk text, generalizing the pack's
//! `Bm25Index` pattern (tunable k1/b, upsert/remove/search) to the shared `Chunk` payload.

use std::collections::HashMap;

use async_trait::async_trait;
use bm25::{Embedder, EmbedderBuilder, Scorer, Tokenizer};
use parking_lot::RwLock;
use tracing::instrument;

use super::error::TextIndexError;
use crate::types::{Chunk, IndexFilter, TextRecord};

/// A single BM25 hit: `(chunk_id, score, payload)`.
#[derive(Debug, Clone)]
pub struct TextHit {
    pub chunk_id: String,
    pub score: f32,
    pub payload: Chunk,
}

/// Tunable BM25 parameters, defaults picked for prose rather than source code.
#[derive(Debug, Clone)]
pub struct Bm25Config {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

/// Lowercases and splits on non-alphanumeric boundaries. Plain prose tokenizer, unlike the
/// code-aware splitter a source-search index would need.
#[derive(Debug, Clone, Default)]
pub struct ProseTokenizer;

impl Tokenizer for ProseTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect()
    }
}

#[async_trait]
pub trait TextIndex: Send + Sync {
    async fn upsert(&self, records: Vec<TextRecord>) -> Result<(), TextIndexError>;

    async fn delete(&self, chunk_id: &str) -> Result<(), TextIndexError>;

    async fn delete_by_filter(&self, filter: &IndexFilter) -> Result<usize, TextIndexError>;

    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&IndexFilter>,
    ) -> Result<Vec<TextHit>, TextIndexError>;

    async fn count(&self) -> Result<usize, TextIndexError>;
}

struct Inner {
    tokenizer: ProseTokenizer,
    embedder: Embedder<u32, ProseTokenizer>,
    scorer: Scorer<String, u32>,
    payloads: HashMap<String, Chunk>,
    doc_lengths: HashMap<String, usize>,
    config: Bm25Config,
}

fn build_embedder(config: &Bm25Config, avgdl: f32) -> Embedder<u32, ProseTokenizer> {
    EmbedderBuilder::<u32, ProseTokenizer>::with_avgdl(avgdl)
        .b(config.b)
        .k1(config.k1)
        .build()
}

/// BM25-backed text index, default/only implementation of [`TextIndex`].
pub struct Bm25TextIndex {
    inner: RwLock<Inner>,
}

impl Bm25TextIndex {
    pub fn new() -> Self {
        Self::with_config(Bm25Config::default())
    }

    pub fn with_config(config: Bm25Config) -> Self {
        Self {
            inner: RwLock::new(Inner {
                tokenizer: ProseTokenizer,
                embedder: build_embedder(&config, 100.0),
                scorer: Scorer::new(),
                payloads: HashMap::new(),
                doc_lengths: HashMap::new(),
                config,
            }),
        }
    }

    fn recalculate_avgdl(inner: &mut Inner) {
        if inner.doc_lengths.is_empty() {
            return;
        }
        let total: usize = inner.doc_lengths.values().sum();
        let avgdl = total as f32 / inner.doc_lengths.len() as f32;
        inner.embedder = build_embedder(&inner.config, avgdl);
    }
}

impl Default for Bm25TextIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextIndex for Bm25TextIndex {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert(&self, records: Vec<TextRecord>) -> Result<(), TextIndexError> {
        let mut inner = self.inner.write();
        for record in records {
            let tokens = inner.tokenizer.tokenize(&record.text);
            let embedding = inner.embedder.embed(&record.text);
            inner.doc_lengths.insert(record.chunk_id.clone(), tokens.len());
            inner.scorer.upsert(&record.chunk_id, embedding);
            inner.payloads.insert(record.chunk_id, record.payload);
        }
        Self::recalculate_avgdl(&mut inner);
        Ok(())
    }

    async fn delete(&self, chunk_id: &str) -> Result<(), TextIndexError> {
        let mut inner = self.inner.write();
        inner.payloads.remove(chunk_id);
        inner.doc_lengths.remove(chunk_id);
        // The bm25 crate's Scorer has no removal primitive, so deletions rebuild it from the
        // remaining documents rather than leaving a stale, unreachable entry behind.
        let mut scorer = Scorer::new();
        for (id, payload) in &inner.payloads {
            scorer.upsert(id, inner.embedder.embed(&payload.text));
        }
        inner.scorer = scorer;
        Ok(())
    }

    async fn delete_by_filter(&self, filter: &IndexFilter) -> Result<usize, TextIndexError> {
        let ids: Vec<String> = {
            let inner = self.inner.read();
            inner
                .payloads
                .iter()
                .filter(|(_, payload)| filter.matches(payload))
                .map(|(id, _)| id.clone())
                .collect()
        };
        for id in &ids {
            self.delete(id).await?;
        }
        Ok(ids.len())
    }

    #[instrument(skip(self, query, filter), fields(k))]
    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&IndexFilter>,
    ) -> Result<Vec<TextHit>, TextIndexError> {
        let inner = self.inner.read();
        let query_embedding = inner.embedder.embed(query);
        let matches = inner.scorer.matches(&query_embedding);

        let hits = matches
            .into_iter()
            .filter_map(|m| {
                let payload = inner.payloads.get(&m.id)?;
                if !filter.is_none_or(|f| f.matches(payload)) {
                    return None;
                }
                Some(TextHit {
                    chunk_id: m.id,
                    score: m.score,
                    payload: payload.clone(),
                })
            })
            .take(k)
            .collect();
        Ok(hits)
    }

    async fn count(&self) -> Result<usize, TextIndexError> {
        Ok(self.inner.read().payloads.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkBuilder, IngestChunk, TierOrigin};
    use chrono::Utc;

    fn test_record(id: &str, text: &str) -> TextRecord {
        let chunk = ChunkBuilder::build(
            IngestChunk {
                text: text.to_string(),
                source_path: format!("{id}.md"),
                document_id: id.to_string(),
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
        TextRecord {
            chunk_id: chunk.chunk_id.clone(),
            text: chunk.text.clone(),
            payload: chunk,
        }
    }

    #[tokio::test]
    async fn search_ranks_exact_keyword_match_first() {
        let index = Bm25TextIndex::new();
        index
            .upsert(vec![
                test_record("a", "how to configure the retry policy for web search"),
                test_record("b", "struct DatabaseConnection pool Pool"),
            ])
            .await
            .unwrap();

        let hits = index.search("retry policy", 5, None).await.unwrap();
        assert_eq!(hits[0].payload.document_id, "a");
    }

    #[tokio::test]
    async fn delete_removes_from_subsequent_search() {
        let index = Bm25TextIndex::new();
        let record = test_record("only", "rate limiting token bucket");
        let chunk_id = record.chunk_id.clone();
        index.upsert(vec![record]).await.unwrap();
        index.delete(&chunk_id).await.unwrap();

        let hits = index.search("rate limiting", 5, None).await.unwrap();
        assert!(hits.is_empty());
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_by_filter_scopes_to_tier() {
        let index = Bm25TextIndex::new();
        let mut curated = test_record("curated-doc", "curated content about caching");
        curated.payload.tier_origin = TierOrigin::Curated;
        let mut web = test_record("web-doc", "web content about caching");
        web.payload.tier_origin = TierOrigin::WebKb;

        index.upsert(vec![curated, web]).await.unwrap();

        let removed = index
            .delete_by_filter(&IndexFilter {
                tier_origin: Some(TierOrigin::WebKb),
                document_type: None,
                as_of: None,
            })
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(index.count().await.unwrap(), 1);
    }
}
