//! Vector Index Adapter (C2): upsert and k-NN search over local-space vectors, generalizing
//! the teacher's `VectorDbClient`/`QdrantClient`/`MockVectorDbClient` from a fixed-schema cache
//! point store into a `(chunk_id, local_vector, payload)` index with payload filters.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Distance, Filter, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder, point_id::PointIdOptions,
};
use tracing::instrument;

use super::error::VectorIndexError;
use crate::types::{Chunk, IndexFilter, VectorRecord};

/// A single k-NN hit: `(chunk_id, score, payload)`.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub chunk_id: String,
    pub score: f32,
    pub payload: Chunk,
}

/// Upserts `(chunk_id, local_vector, payload)` keyed by `chunk_id`; supports cosine k-NN search
/// and deletion by id or filter. All vectors stored share exactly one dimension; writes with any
/// other dimension are rejected.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), VectorIndexError>;

    async fn delete(&self, chunk_id: &str) -> Result<(), VectorIndexError>;

    async fn delete_by_filter(&self, filter: &IndexFilter) -> Result<usize, VectorIndexError>;

    async fn knn(
        &self,
        query_vec: &[f32],
        k: usize,
        filter: Option<&IndexFilter>,
    ) -> Result<Vec<VectorHit>, VectorIndexError>;

    async fn count(&self) -> Result<usize, VectorIndexError>;

    fn dimension(&self) -> usize;
}

struct StoredVector {
    vector: Vec<f32>,
    payload: Chunk,
}

/// Brute-force cosine-similarity in-memory index. Default backend, and the one used by tests.
pub struct InMemoryVectorIndex {
    dimension: usize,
    rows: RwLock<HashMap<String, StoredVector>>,
}

impl InMemoryVectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            rows: RwLock::new(HashMap::new()),
        }
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), VectorIndexError> {
        let mut rows = self.rows.write();
        for record in records {
            if record.local_vector.len() != self.dimension {
                return Err(VectorIndexError::DimensionMismatch {
                    expected: self.dimension,
                    actual: record.local_vector.len(),
                });
            }
            rows.insert(
                record.chunk_id.clone(),
                StoredVector {
                    vector: record.local_vector,
                    payload: record.payload,
                },
            );
        }
        Ok(())
    }

    async fn delete(&self, chunk_id: &str) -> Result<(), VectorIndexError> {
        self.rows.write().remove(chunk_id);
        Ok(())
    }

    async fn delete_by_filter(&self, filter: &IndexFilter) -> Result<usize, VectorIndexError> {
        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|_, stored| !filter.matches(&stored.payload));
        Ok(before - rows.len())
    }

    #[instrument(skip(self, query_vec, filter), fields(k))]
    async fn knn(
        &self,
        query_vec: &[f32],
        k: usize,
        filter: Option<&IndexFilter>,
    ) -> Result<Vec<VectorHit>, VectorIndexError> {
        if query_vec.len() != self.dimension {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query_vec.len(),
            });
        }
        let rows = self.rows.read();
        let mut scored: Vec<VectorHit> = rows
            .iter()
            .filter(|(_, stored)| filter.is_none_or(|f| f.matches(&stored.payload)))
            .map(|(chunk_id, stored)| VectorHit {
                chunk_id: chunk_id.clone(),
                score: cosine_similarity(query_vec, &stored.vector),
                payload: stored.payload.clone(),
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        scored.truncate(k);
        Ok(scored)
    }

    async fn count(&self) -> Result<usize, VectorIndexError> {
        Ok(self.rows.read().len())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Thin Qdrant-backed implementation, reusing the teacher's client acquisition-at-startup
/// discipline (one `Qdrant` handle, built once, shared via `Arc`).
pub struct QdrantVectorIndex {
    client: Qdrant,
    collection: String,
    dimension: usize,
    /// `chunk_id -> payload`, kept alongside Qdrant since payload round-tripping through the
    /// wire protocol for a `Chunk` is out of scope for this adapter; Qdrant stores vectors and
    /// a minimal filterable payload, this map serves full reconstruction.
    payloads: RwLock<HashMap<String, Chunk>>,
}

impl QdrantVectorIndex {
    pub async fn connect(url: &str, collection: &str, dimension: usize) -> Result<Self, VectorIndexError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| VectorIndexError::Unavailable { reason: e.to_string() })?;

        let exists = client
            .collection_exists(collection)
            .await
            .map_err(|e| VectorIndexError::Unavailable { reason: e.to_string() })?;
        if !exists {
            client
                .create_collection(
                    CreateCollectionBuilder::new(collection)
                        .vectors_config(VectorParamsBuilder::new(dimension as u64, Distance::Cosine))
                        .on_disk_payload(true),
                )
                .await
                .map_err(|e| VectorIndexError::Unavailable { reason: e.to_string() })?;
        }

        Ok(Self {
            client,
            collection: collection.to_string(),
            dimension,
            payloads: RwLock::new(HashMap::new()),
        })
    }

    fn point_id(chunk_id: &str) -> u64 {
        crate::hashing::hash_to_u64(chunk_id.as_bytes())
    }
}

#[async_trait]
impl VectorIndex for QdrantVectorIndex {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), VectorIndexError> {
        if records.is_empty() {
            return Ok(());
        }
        let mut points = Vec::with_capacity(records.len());
        for record in &records {
            if record.local_vector.len() != self.dimension {
                return Err(VectorIndexError::DimensionMismatch {
                    expected: self.dimension,
                    actual: record.local_vector.len(),
                });
            }
            let mut payload: HashMap<String, qdrant_client::qdrant::Value> = HashMap::new();
            payload.insert("chunk_id".to_string(), record.chunk_id.clone().into());
            payload.insert(
                "tier_origin".to_string(),
                format!("{:?}", record.payload.tier_origin).into(),
            );
            payload.insert("document_type".to_string(), record.payload.document_type.clone().into());
            points.push(PointStruct::new(
                Self::point_id(&record.chunk_id),
                record.local_vector.clone(),
                payload,
            ));
        }

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| VectorIndexError::WriteFailed { reason: e.to_string() })?;

        let mut cache = self.payloads.write();
        for record in records {
            cache.insert(record.chunk_id, record.payload);
        }
        Ok(())
    }

    async fn delete(&self, chunk_id: &str) -> Result<(), VectorIndexError> {
        use qdrant_client::qdrant::{DeletePointsBuilder, PointsIdsList};
        let ids = PointsIdsList {
            ids: vec![Self::point_id(chunk_id).into()],
        };
        self.client
            .delete_points(DeletePointsBuilder::new(&self.collection).points(ids).wait(true))
            .await
            .map_err(|e| VectorIndexError::WriteFailed { reason: e.to_string() })?;
        self.payloads.write().remove(chunk_id);
        Ok(())
    }

    async fn delete_by_filter(&self, filter: &IndexFilter) -> Result<usize, VectorIndexError> {
        let ids: Vec<String> = self
            .payloads
            .read()
            .iter()
            .filter(|(_, payload)| filter.matches(payload))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &ids {
            self.delete(id).await?;
        }
        Ok(ids.len())
    }

    async fn knn(
        &self,
        query_vec: &[f32],
        k: usize,
        filter: Option<&IndexFilter>,
    ) -> Result<Vec<VectorHit>, VectorIndexError> {
        if query_vec.len() != self.dimension {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query_vec.len(),
            });
        }

        let mut builder = SearchPointsBuilder::new(&self.collection, query_vec.to_vec(), k as u64)
            .with_payload(true);
        if let Some(f) = filter
            && let Some(tier) = f.tier_origin
        {
            builder = builder.filter(Filter::must([Condition::matches(
                "tier_origin",
                format!("{tier:?}"),
            )]));
        }

        let result = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| VectorIndexError::SearchFailed { reason: e.to_string() })?;

        let cache = self.payloads.read();
        Ok(result
            .result
            .into_iter()
            .filter_map(|point| {
                let chunk_id = match point.id.and_then(|pid| pid.point_id_options) {
                    Some(PointIdOptions::Num(n)) => n,
                    _ => return None,
                };
                let payload = cache
                    .values()
                    .find(|c| Self::point_id(&c.chunk_id) == chunk_id)?;
                Some(VectorHit {
                    chunk_id: payload.chunk_id.clone(),
                    score: point.score,
                    payload: payload.clone(),
                })
            })
            .collect())
    }

    async fn count(&self) -> Result<usize, VectorIndexError> {
        Ok(self.payloads.read().len())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Shared handle type, mirroring the teacher's `Arc`-wrapped handle idiom for capability traits.
pub type SharedVectorIndex = Arc<dyn VectorIndex>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkBuilder, IngestChunk, TierOrigin};
    use chrono::Utc;

    fn test_chunk(id: &str) -> Chunk {
        ChunkBuilder::build(
            IngestChunk {
                text: format!("text for {id}"),
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
        )
    }

    #[tokio::test]
    async fn rejects_wrong_dimension_on_upsert() {
        let index = InMemoryVectorIndex::new(4);
        let chunk = test_chunk("c1");
        let result = index
            .upsert(vec![VectorRecord {
                chunk_id: chunk.chunk_id.clone(),
                local_vector: vec![1.0, 2.0],
                payload: chunk,
            }])
            .await;
        assert!(matches!(result, Err(VectorIndexError::DimensionMismatch { .. })));
    }

    #[tokio::test]
    async fn knn_returns_highest_similarity_first() {
        let index = InMemoryVectorIndex::new(2);
        let a = test_chunk("a");
        let b = test_chunk("b");
        index
            .upsert(vec![
                VectorRecord {
                    chunk_id: a.chunk_id.clone(),
                    local_vector: vec![1.0, 0.0],
                    payload: a,
                },
                VectorRecord {
                    chunk_id: b.chunk_id.clone(),
                    local_vector: vec![0.0, 1.0],
                    payload: b,
                },
            ])
            .await
            .unwrap();

        let hits = index.knn(&[1.0, 0.0], 2, None).await.unwrap();
        assert_eq!(hits[0].payload.document_id, "a");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn delete_by_filter_removes_matching_tier() {
        let index = InMemoryVectorIndex::new(2);
        let mut curated = test_chunk("curated-1");
        curated.tier_origin = TierOrigin::Curated;
        let mut web = test_chunk("web-1");
        web.tier_origin = TierOrigin::WebKb;

        index
            .upsert(vec![
                VectorRecord {
                    chunk_id: curated.chunk_id.clone(),
                    local_vector: vec![1.0, 0.0],
                    payload: curated,
                },
                VectorRecord {
                    chunk_id: web.chunk_id.clone(),
                    local_vector: vec![0.0, 1.0],
                    payload: web,
                },
            ])
            .await
            .unwrap();

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
