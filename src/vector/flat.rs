//! Exact, append-only flat index of unit vectors.
//!
//! Rows are stored contiguously in one `Vec<f32>`; row `i` is slot `i`.
//! Search is a full inner-product scan, parallelised across rows with rayon.
//! Rows are never removed in place. Dropping rows happens only through
//! [`FlatIndex::retain_rows`], which builds a new, densely numbered index.

use std::cmp::Ordering;

use rayon::prelude::*;

use crate::vector::math::inner_product;
use crate::vector::{SlotId, VectorDimension, VectorError};

/// Flat inner-product index.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: VectorDimension,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Creates an empty index for vectors of the given dimension.
    #[must_use]
    pub fn new(dimension: VectorDimension) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Wraps raw row-major data, checking that it holds whole rows.
    pub fn from_raw(dimension: VectorDimension, data: Vec<f32>) -> Result<Self, VectorError> {
        if data.len() % dimension.get() != 0 {
            return Err(VectorError::DimensionMismatch {
                expected: dimension.get(),
                actual: data.len() % dimension.get(),
            });
        }
        Ok(Self { dimension, data })
    }

    /// Number of physical rows, including rows no longer referenced by metadata.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension.get()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    /// Raw row-major data.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Appends a row and returns the slot it occupies.
    ///
    /// The caller is responsible for normalizing the vector first.
    pub fn push(&mut self, vector: &[f32]) -> Result<SlotId, VectorError> {
        self.dimension.validate_vector(vector)?;
        let slot = SlotId::from_index(self.len())?;
        self.data.extend_from_slice(vector);
        Ok(slot)
    }

    /// Drops every row from `len` onwards.
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len * self.dimension.get());
    }

    /// Returns the row stored at a slot.
    #[must_use]
    pub fn row(&self, slot: SlotId) -> Option<&[f32]> {
        let dim = self.dimension.get();
        let start = slot.index().checked_mul(dim)?;
        self.data.get(start..start + dim)
    }

    /// Builds a new index holding only the given rows, in the given order.
    ///
    /// Row `i` of the result is `slots[i]` of `self`. Unknown slots are skipped.
    #[must_use]
    pub fn retain_rows(&self, slots: &[SlotId]) -> Self {
        let mut data = Vec::with_capacity(slots.len() * self.dimension.get());
        for slot in slots {
            if let Some(row) = self.row(*slot) {
                data.extend_from_slice(row);
            }
        }
        Self {
            dimension: self.dimension,
            data,
        }
    }

    /// Returns the `n` rows with the highest inner product against `query`.
    ///
    /// Results are ordered by descending similarity; equal scores keep slot order.
    /// The query must already have the index dimension.
    #[must_use]
    pub fn top_k(&self, query: &[f32], n: usize) -> Vec<(SlotId, f32)> {
        if n == 0 || self.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(SlotId, f32)> = self
            .data
            .par_chunks_exact(self.dimension.get())
            .enumerate()
            .map(|(row, vector)| (SlotId::new(row as u32), inner_product(query, vector)))
            .collect();

        let n = n.min(scored.len());
        if n < scored.len() {
            scored.select_nth_unstable_by(n - 1, rank_order);
            scored.truncate(n);
        }
        scored.sort_unstable_by(rank_order);
        scored
    }
}

fn rank_order(a: &(SlotId, f32), b: &(SlotId, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}
