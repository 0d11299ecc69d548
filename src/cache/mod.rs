//! Semantic query cache (C8): near-duplicate lookup keyed by query embedding cosine similarity
//! rather than exact text match, generalizing the teacher's `L1Cache`/`L1CacheHandle`
//! (`moka::sync::Cache` + `Arc`-wrapped handle) from hash-keyed exact lookup to a scan-and-score
//! similarity lookup.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use moka::sync::Cache;
use tracing::instrument;

use crate::constants::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_SIM_THRESHOLD, DEFAULT_CACHE_TTL_SECS};
use crate::types::{CacheEntry, RetrievedChunk};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// In-memory semantic cache. Entries are scanned linearly on lookup/store since similarity
/// search has no natural hash key; `N_cache` is kept small enough (tens of thousands) that this
/// is cheap relative to an LLM call.
pub struct SemanticCache {
    entries: Cache<u64, CacheEntry>,
    next_id: AtomicU64,
    sim_threshold: f32,
    ttl: chrono::Duration,
}

impl SemanticCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_SIM_THRESHOLD)
    }

    pub fn with_capacity(capacity: u64, sim_threshold: f32) -> Self {
        Self {
            entries: Cache::builder().max_capacity(capacity).build(),
            next_id: AtomicU64::new(0),
            sim_threshold,
            ttl: chrono::Duration::seconds(DEFAULT_CACHE_TTL_SECS as i64),
        }
    }

    /// Returns the stored entry whose local embedding has cosine similarity ≥ `sim_threshold`
    /// with `q_local` and whose fingerprint matches `fingerprint`. Prefers the most similar
    /// match, breaking ties by most recent `created_at`. Expired entries are skipped and
    /// lazily evicted.
    #[instrument(skip(self, q_local))]
    pub fn lookup(&self, q_local: &[f32], fingerprint: u64) -> Option<CacheEntry> {
        let now = chrono::Utc::now();
        let mut best: Option<(f32, CacheEntry)> = None;
        let mut expired = Vec::new();
        for (id, entry) in self.entries.iter() {
            if entry.is_expired(now) {
                expired.push(*id);
                continue;
            }
            if entry.fingerprint != fingerprint {
                continue;
            }
            let sim = cosine(q_local, &entry.query_embedding_local);
            if sim < self.sim_threshold {
                continue;
            }
            match &best {
                None => best = Some((sim, entry)),
                Some((best_sim, best_entry)) => {
                    if sim > *best_sim || (sim == *best_sim && entry.created_at > best_entry.created_at) {
                        best = Some((sim, entry));
                    }
                }
            }
        }
        for id in expired {
            self.entries.invalidate(&id);
        }
        best.map(|(_, entry)| entry)
    }

    /// Inserts a new entry unless an equivalent one (same fingerprint, cosine similarity ≥
    /// `sim_threshold`) already exists. Moka evicts least-recently-used entries on overflow.
    #[instrument(skip(self, q_local, answer, sources))]
    pub fn store(&self, q_local: Vec<f32>, fingerprint: u64, answer: String, sources: Vec<RetrievedChunk>) {
        if self.lookup(&q_local, fingerprint).is_some() {
            return;
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let entry = CacheEntry {
            query_embedding_local: q_local,
            fingerprint,
            answer,
            sources,
            created_at: chrono::Utc::now(),
            ttl: self.ttl,
        };
        self.entries.insert(id, entry);
    }

    /// Removes every entry for which `predicate` returns `true`.
    pub fn invalidate(&self, predicate: impl Fn(&CacheEntry) -> bool) {
        let matching: Vec<u64> = self
            .entries
            .iter()
            .filter(|(_, entry)| predicate(entry))
            .map(|(id, _)| *id)
            .collect();
        for id in matching {
            self.entries.invalidate(&id);
        }
    }

    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.entry_count() == 0
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}

impl Default for SemanticCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SemanticCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticCache")
            .field("entries", &self.entries.entry_count())
            .field("sim_threshold", &self.sim_threshold)
            .finish()
    }
}

/// Shared handle to a [`SemanticCache`], mirroring the teacher's clone-and-share idiom for its
/// own cache handles.
#[derive(Clone)]
pub struct SemanticCacheHandle {
    inner: Arc<SemanticCache>,
}

impl SemanticCacheHandle {
    pub fn new() -> Self {
        Self { inner: Arc::new(SemanticCache::new()) }
    }

    pub fn with_capacity(capacity: u64, sim_threshold: f32) -> Self {
        Self { inner: Arc::new(SemanticCache::with_capacity(capacity, sim_threshold)) }
    }

    pub fn lookup(&self, q_local: &[f32], fingerprint: u64) -> Option<CacheEntry> {
        self.inner.lookup(q_local, fingerprint)
    }

    pub fn store(&self, q_local: Vec<f32>, fingerprint: u64, answer: String, sources: Vec<RetrievedChunk>) {
        self.inner.store(q_local, fingerprint, answer, sources)
    }

    pub fn invalidate(&self, predicate: impl Fn(&CacheEntry) -> bool) {
        self.inner.invalidate(predicate)
    }

    pub fn len(&self) -> u64 {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&self) {
        self.inner.clear()
    }

    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl Default for SemanticCacheHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SemanticCacheHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticCacheHandle").field("strong_count", &self.strong_count()).finish()
    }
}
