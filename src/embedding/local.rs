//! The local embedder: deterministic, low-latency, fixed dimension `d_local`.
//!
//! Mirrors the teacher's Sinter embedder's load/stub-mode split: [`CandleLocalEmbedder`] loads
//! GGUF weights and a tokenizer via `candle`; [`HashLocalEmbedder`] produces deterministic
//! embeddings from a seeded PRNG for tests and default (model-less) operation.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use candle_core::{Device, IndexOp, Tensor};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::device::select_device;
use super::error::EmbeddingError;

/// Deterministic embedder over arbitrary text, fixed dimension at load time.
#[async_trait]
pub trait LocalEmbedder: Send + Sync + std::fmt::Debug {
    /// Embeds a batch of documents. Deterministic over identical input.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embeds a single query string.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut batch = self.embed_documents(&[text.to_string()]).await?;
        Ok(batch.pop().unwrap_or_default())
    }

    fn embedding_dim(&self) -> usize;
}

enum CandleBackend {
    Model {
        embedding_table: Tensor,
        tokenizer: Arc<tokenizers::Tokenizer>,
        device: Device,
    },
    Stub {
        device: Device,
    },
}

/// Local embedder backed by `candle` GGUF weights, with a deterministic stub fallback when no
/// model path is configured.
pub struct CandleLocalEmbedder {
    backend: CandleBackend,
    embedding_dim: usize,
}

impl std::fmt::Debug for CandleLocalEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandleLocalEmbedder")
            .field("embedding_dim", &self.embedding_dim)
            .field(
                "backend",
                &match &self.backend {
                    CandleBackend::Model { device, .. } => format!("Model({device:?})"),
                    CandleBackend::Stub { device } => format!("Stub({device:?})"),
                },
            )
            .finish()
    }
}

impl CandleLocalEmbedder {
    /// Loads weights and tokenizer from `model_path`'s directory. Falls back to the
    /// deterministic stub if `model_path` is `None`.
    pub fn load(
        model_path: Option<PathBuf>,
        embedding_dim: usize,
    ) -> Result<Self, EmbeddingError> {
        let device = select_device()?;

        let Some(model_path) = model_path else {
            warn!("no local embedder model path configured, running in stub mode");
            return Ok(Self {
                backend: CandleBackend::Stub { device },
                embedding_dim,
            });
        };

        if !model_path.exists() {
            return Err(EmbeddingError::ModelNotFound { path: model_path });
        }

        let tokenizer_path = model_path
            .parent()
            .map(|p| p.join("tokenizer.json"))
            .unwrap_or_else(|| PathBuf::from("tokenizer.json"));
        let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            EmbeddingError::TokenizationFailed {
                reason: format!("failed to load tokenizer at {}: {e}", tokenizer_path.display()),
            }
        })?;

        let mut file = std::fs::File::open(&model_path)?;
        let content = candle_core::quantized::gguf_file::Content::read(&mut file).map_err(|e| {
            EmbeddingError::ModelLoadFailed {
                reason: format!("failed to read GGUF content: {e}"),
            }
        })?;

        let embedding_table = Self::load_embedding_tensor(&content, &mut file, &device, embedding_dim)?;

        info!(
            model_path = %model_path.display(),
            embedding_dim,
            "local embedder loaded"
        );

        Ok(Self {
            backend: CandleBackend::Model {
                embedding_table,
                tokenizer: Arc::new(tokenizer),
                device,
            },
            embedding_dim,
        })
    }

    fn load_embedding_tensor(
        content: &candle_core::quantized::gguf_file::Content,
        file: &mut std::fs::File,
        device: &Device,
        embedding_dim: usize,
    ) -> Result<Tensor, EmbeddingError> {
        let tensor_name = content
            .tensor_infos
            .keys()
            .find(|name| name.contains("embed") || name.contains("tok_embd"))
            .ok_or_else(|| EmbeddingError::ModelLoadFailed {
                reason: "GGUF file has no token-embedding tensor".to_string(),
            })?
            .clone();

        let tensor = content
            .tensor(file, &tensor_name, device)
            .map_err(|e| EmbeddingError::ModelLoadFailed {
                reason: format!("failed to read tensor '{tensor_name}': {e}"),
            })?
            .dequantize(device)
            .map_err(|e| EmbeddingError::ModelLoadFailed {
                reason: format!("failed to dequantize '{tensor_name}': {e}"),
            })?;

        let hidden = tensor.dim(1).map_err(|e| EmbeddingError::ModelLoadFailed {
            reason: e.to_string(),
        })?;
        if embedding_dim > hidden {
            return Err(EmbeddingError::InvalidConfig {
                reason: format!("embedding_dim ({embedding_dim}) exceeds model hidden size ({hidden})"),
            });
        }

        Ok(tensor)
    }

    fn embed_with_model(
        &self,
        text: &str,
        embedding_table: &Tensor,
        tokenizer: &tokenizers::Tokenizer,
        device: &Device,
    ) -> Result<Vec<f32>, EmbeddingError> {
        let encoding = tokenizer
            .encode(text, true)
            .map_err(|e| EmbeddingError::TokenizationFailed { reason: e.to_string() })?;

        let ids: Vec<u32> = encoding.get_ids().to_vec();
        if ids.is_empty() {
            return Ok(vec![0.0; self.embedding_dim]);
        }

        debug!(token_count = ids.len(), "embedding text via embedding-table mean pooling");

        let ids_tensor = Tensor::new(&ids[..], device).map_err(|e| EmbeddingError::InferenceFailed {
            reason: e.to_string(),
        })?;
        let token_embeddings =
            embedding_table
                .index_select(&ids_tensor, 0)
                .map_err(|e| EmbeddingError::InferenceFailed { reason: e.to_string() })?;
        let pooled = token_embeddings
            .mean(0)
            .map_err(|e| EmbeddingError::InferenceFailed { reason: e.to_string() })?
            .i(..self.embedding_dim)
            .map_err(|e| EmbeddingError::InferenceFailed { reason: e.to_string() })?
            .to_vec1::<f32>()
            .map_err(|e| EmbeddingError::InferenceFailed { reason: e.to_string() })?;

        Ok(l2_normalize(pooled))
    }

    fn embed_stub(&self, text: &str) -> Vec<f32> {
        deterministic_embedding(text, self.embedding_dim)
    }
}

#[async_trait]
impl LocalEmbedder for CandleLocalEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        match &self.backend {
            CandleBackend::Model {
                embedding_table,
                tokenizer,
                device,
            } => texts
                .iter()
                .map(|t| self.embed_with_model(t, embedding_table, tokenizer, device))
                .collect(),
            CandleBackend::Stub { .. } => Ok(texts.iter().map(|t| self.embed_stub(t)).collect()),
        }
    }

    fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }
}

/// Pure hash-based embedder: no model, always deterministic. Used in tests and as the default
/// when the `mock` feature is active.
#[derive(Debug, Clone)]
pub struct HashLocalEmbedder {
    embedding_dim: usize,
}

impl HashLocalEmbedder {
    pub fn new(embedding_dim: usize) -> Self {
        Self { embedding_dim }
    }
}

impl Default for HashLocalEmbedder {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_LOCAL_EMBEDDING_DIM)
    }
}

#[async_trait]
impl LocalEmbedder for HashLocalEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|t| deterministic_embedding(t, self.embedding_dim))
            .collect())
    }

    fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }
}

/// Seeded-PRNG embedding shared by the stub local and stub premium embedders, grounded in the
/// teacher's `embed_stub` hash-then-LCG construction.
pub(crate) fn deterministic_embedding(text: &str, dim: usize) -> Vec<f32> {
    use std::hash::{DefaultHasher, Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let mut state = hasher.finish();

    let mut embedding = Vec::with_capacity(dim);
    for _ in 0..dim {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let value = ((state >> 32) as f32 / u32::MAX as f32) * 2.0 - 1.0;
        embedding.push(value);
    }
    l2_normalize(embedding)
}

pub(crate) fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}
