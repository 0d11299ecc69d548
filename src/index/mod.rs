//! Storage adapters for the curated/web-KB tiers: a vector index (C2) and a text index (C3),
//! both addressed by `chunk_id` over the shared [`crate::types::Chunk`] payload.

pub mod error;
pub mod text;
pub mod vector;

pub use error::{TextIndexError, VectorIndexError};
pub use text::{Bm25TextIndex, ProseTokenizer, TextHit, TextIndex};
pub use vector::{InMemoryVectorIndex, QdrantVectorIndex, SharedVectorIndex, VectorHit, VectorIndex};

pub use crate::types::IndexFilter;
