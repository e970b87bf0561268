//! Vector primitives for the wardrobe index.
//!
//! This module provides the exact flat index, its on-disk codec, the
//! normalization math every stored and query vector passes through, and the
//! embedder seam that turns images and text into vectors.
//!
//! # Architecture
//! Vectors live in one contiguous row-major buffer; a row's position is its
//! slot id. Similarity is the inner product of unit vectors, so a full scan
//! ranks by cosine similarity. The flat layout is chosen for exact results at
//! wardrobe scale; nothing here is approximate.

mod embedding;
mod flat;
pub mod math;
mod storage;
mod types;

// Re-export core types for public API
pub use embedding::{
    ClipEmbedder, Embedder, LazyClipEmbedder, ModelPair, PrecomputedEmbedder, parse_model_pair,
};
pub use flat::FlatIndex;
pub use storage::{VectorFile, VectorStorageError};
pub use types::{SlotId, VECTOR_DIMENSION_512, VectorDimension, VectorError};
