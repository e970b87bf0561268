//! Type-safe wrappers and core types for the flat vector index.
//!
//! Slot ids and dimensions are newtypes so that a physical slot can never be
//! confused with an item identifier or a raw length.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Embedding dimension produced by the CLIP ViT-B/32 towers.
pub const VECTOR_DIMENSION_512: usize = 512;

/// Physical position of a vector inside the flat index.
///
/// Slot ids start at zero and are handed out in insertion order. A slot is
/// never handed out twice while the process runs, even after the entry that
/// occupied it has been removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(u32);

impl SlotId {
    /// Creates a new `SlotId`.
    #[must_use]
    pub const fn new(slot: u32) -> Self {
        Self(slot)
    }

    /// Creates a slot id from a row index, failing once the u32 space is used up.
    pub fn from_index(index: usize) -> Result<Self, VectorError> {
        u32::try_from(index)
            .map(Self)
            .map_err(|_| VectorError::SlotSpaceExhausted)
    }

    /// Returns the underlying u32 value.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Row index of this slot in the flat index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type-safe wrapper for vector dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VectorDimension(usize);

impl VectorDimension {
    /// Creates a new `VectorDimension` with validation.
    ///
    /// Returns an error if the dimension is zero.
    pub fn new(dim: usize) -> Result<Self, VectorError> {
        if dim == 0 {
            return Err(VectorError::InvalidDimension {
                dimension: 0,
                reason: "Vector dimension cannot be zero",
            });
        }
        Ok(Self(dim))
    }

    /// Creates the standard 512-dimensional CLIP dimension.
    #[must_use]
    pub const fn dimension_512() -> Self {
        Self(VECTOR_DIMENSION_512)
    }

    /// Returns the underlying dimension value.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }

    /// Validates that a vector has the expected length and only finite components.
    pub fn validate_vector(&self, vector: &[f32]) -> Result<(), VectorError> {
        if vector.len() != self.0 {
            return Err(VectorError::DimensionMismatch {
                expected: self.0,
                actual: vector.len(),
            });
        }
        if let Some(position) = vector.iter().position(|v| !v.is_finite()) {
            return Err(VectorError::NonFinite { position });
        }
        Ok(())
    }
}

impl Default for VectorDimension {
    fn default() -> Self {
        Self::dimension_512()
    }
}

impl std::fmt::Display for VectorDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors that can occur during vector operations.
///
/// All error messages include actionable suggestions for resolution.
#[derive(Error, Debug)]
pub enum VectorError {
    #[error(
        "Vector dimension mismatch: expected {expected}, got {actual}\nSuggestion: Ensure all vectors come from the same embedding model"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid vector dimension: {dimension}\nReason: {reason}")]
    InvalidDimension {
        dimension: usize,
        reason: &'static str,
    },

    #[error(
        "Vector component {position} is NaN or infinite\nSuggestion: Check the embedding service output"
    )]
    NonFinite { position: usize },

    #[error(
        "Slot space exhausted\nSuggestion: Compact the index to reclaim orphaned slots"
    )]
    SlotSpaceExhausted,

    #[error(
        "Embedding generation failed: {0}\nSuggestion: Verify the embedding model is properly initialized and the image is readable"
    )]
    EmbeddingFailed(String),
}
