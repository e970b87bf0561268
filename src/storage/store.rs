//! The in-memory wardrobe index.
//!
//! [`VectorStore`] pairs an append-only [`FlatIndex`] with a [`MetadataTable`].
//! Every mutation is persisted before it returns; if the save fails the
//! mutation is undone so memory never runs ahead of what callers were told.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::PathBuf;

use serde::Serialize;

use crate::storage::{IndexPersistence, IndexSnapshot, ItemMetadata, MetadataTable};
use crate::vector::math::normalized;
use crate::vector::{FlatIndex, SlotId, VectorDimension};
use crate::{IndexError, IndexResult};

/// Default multiplier applied to `k` when fetching candidates.
pub const DEFAULT_OVERSAMPLE_FACTOR: usize = 5;

/// Default candidate count when the oversampled superset is empty.
pub const DEFAULT_FALLBACK_CANDIDATES: usize = 100;

/// How many raw candidates a search pulls from the flat index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTuning {
    pub oversample_factor: usize,
    pub fallback_candidates: usize,
}

impl Default for SearchTuning {
    fn default() -> Self {
        Self {
            oversample_factor: DEFAULT_OVERSAMPLE_FACTOR,
            fallback_candidates: DEFAULT_FALLBACK_CANDIDATES,
        }
    }
}

impl SearchTuning {
    /// Size of the candidate superset for `k` results over `total_slots` rows.
    #[must_use]
    pub fn superset_size(&self, k: usize, total_slots: usize) -> usize {
        let size = k.saturating_mul(self.oversample_factor).min(total_slots);
        if size == 0 {
            self.fallback_candidates.min(total_slots)
        } else {
            size
        }
    }
}

/// Filters applied while walking search candidates.
///
/// An empty category list behaves like no category filter.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchFilter {
    pub owner: Option<String>,
    pub categories: Option<Vec<String>>,
    pub exclude_item_id: Option<String>,
    pub min_similarity: f32,
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self {
            owner: None,
            categories: None,
            exclude_item_id: None,
            min_similarity: 0.0,
        }
    }
}

impl SearchFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    #[must_use]
    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn exclude(mut self, item_id: impl Into<String>) -> Self {
        self.exclude_item_id = Some(item_id.into());
        self
    }

    #[must_use]
    pub fn min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    fn accepts(&self, metadata: &ItemMetadata) -> bool {
        if let Some(owner) = &self.owner {
            if metadata.owner != *owner {
                return false;
            }
        }
        match &self.categories {
            Some(categories) if !categories.is_empty() => {
                categories.iter().any(|c| *c == metadata.category)
            }
            _ => true,
        }
    }
}

/// One search result: full metadata plus similarity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub slot: SlotId,
    pub similarity: f32,
    #[serde(flatten)]
    pub metadata: ItemMetadata,
}

/// Index statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub live_items: usize,
    pub total_slots: usize,
    pub orphaned_slots: usize,
    pub dimension: usize,
    pub categories: BTreeMap<String, usize>,
    pub unique_owners: usize,
    pub location: Option<PathBuf>,
}

/// Outcome of [`VectorStore::compact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompactionReport {
    pub slots_before: usize,
    pub slots_after: usize,
    pub reclaimed: usize,
}

/// Flat vector index with item metadata.
#[derive(Debug)]
pub struct VectorStore {
    index: FlatIndex,
    table: MetadataTable,
    persistence: Option<IndexPersistence>,
    tuning: SearchTuning,
}

impl VectorStore {
    /// Store without durable storage.
    #[must_use]
    pub fn in_memory(dimension: VectorDimension) -> Self {
        Self {
            index: FlatIndex::new(dimension),
            table: MetadataTable::new(),
            persistence: None,
            tuning: SearchTuning::default(),
        }
    }

    /// Opens the store backed by `persistence`, loading whatever snapshot is usable.
    pub fn open(persistence: IndexPersistence) -> Self {
        let IndexSnapshot { index, table } = persistence.load();
        Self {
            index,
            table,
            persistence: Some(persistence),
            tuning: SearchTuning::default(),
        }
    }

    #[must_use]
    pub fn with_tuning(mut self, tuning: SearchTuning) -> Self {
        self.tuning = tuning;
        self
    }

    #[must_use]
    pub fn tuning(&self) -> SearchTuning {
        self.tuning
    }

    #[must_use]
    pub fn dimension(&self) -> VectorDimension {
        self.index.dimension()
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Physical slots, orphans included.
    #[must_use]
    pub fn total_slots(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn contains(&self, item_id: &str) -> bool {
        self.table.slot_of(item_id).is_some()
    }

    /// Live entry of an item.
    #[must_use]
    pub fn get(&self, item_id: &str) -> Option<(SlotId, &ItemMetadata)> {
        self.table.entry_for(item_id)
    }

    /// Stored (normalized) vector of a live item.
    #[must_use]
    pub fn vector_of(&self, item_id: &str) -> Option<&[f32]> {
        let slot = self.table.slot_of(item_id)?;
        self.index.row(slot)
    }

    /// Adds or replaces the vector of `metadata.item_id`.
    ///
    /// A previous entry for the same item is orphaned and the vector is
    /// appended at the next slot.
    pub fn add(&mut self, vector: &[f32], metadata: ItemMetadata) -> IndexResult<SlotId> {
        if metadata.item_id.trim().is_empty() {
            return Err(IndexError::invalid_input("metadata must include an item_id"));
        }
        self.index.dimension().validate_vector(vector)?;

        let vector = normalized(vector);
        let item_id = metadata.item_id.clone();
        let slot = self.index.push(&vector)?;
        let previous = self.table.insert(slot, metadata);
        if let Some((old_slot, _)) = &previous {
            tracing::warn!(
                target: "stylevec::store",
                "item {item_id} already exists at slot {old_slot}, replacing"
            );
        }

        if let Err(e) = self.persist() {
            self.table.remove_slot(slot);
            self.index.truncate(slot.index());
            if let Some((old_slot, old_metadata)) = previous {
                self.table.insert(old_slot, old_metadata);
            }
            self.restore_on_disk();
            return Err(e);
        }

        tracing::info!(target: "stylevec::store", "added item {item_id} at slot {slot}");
        Ok(slot)
    }

    /// Logically removes an item. Its slot stays in the flat index as an orphan.
    pub fn remove(&mut self, item_id: &str) -> IndexResult<bool> {
        let Some((slot, metadata)) = self.table.remove_item(item_id) else {
            return Ok(false);
        };

        if let Err(e) = self.persist() {
            self.table.insert(slot, metadata);
            self.restore_on_disk();
            return Err(e);
        }

        tracing::info!(target: "stylevec::store", "removed item {item_id} (slot {slot} orphaned)");
        Ok(true)
    }

    /// Filtered top-k search by cosine similarity.
    ///
    /// Candidates are the `superset_size` nearest rows; filters are applied
    /// while walking them, so fewer than `k` results may come back even when
    /// more matching items exist further down the ranking.
    ///
    /// A non-finite `min_similarity` is rejected as invalid input.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        filter: &SearchFilter,
    ) -> IndexResult<Vec<SearchHit>> {
        if k == 0 || self.table.is_empty() {
            return Ok(Vec::new());
        }
        self.index.dimension().validate_vector(query)?;
        if !filter.min_similarity.is_finite() {
            return Err(IndexError::invalid_input(format!(
                "min_similarity must be finite, got {}",
                filter.min_similarity
            )));
        }

        let query = normalized(query);
        let superset = self.tuning.superset_size(k, self.index.len());
        let candidates = self.index.top_k(&query, superset);

        let mut seen: HashSet<&str> = HashSet::new();
        if let Some(exclude) = &filter.exclude_item_id {
            seen.insert(exclude.as_str());
        }

        let mut results = Vec::with_capacity(k);
        for (slot, similarity) in candidates {
            let Some(metadata) = self.table.get(slot) else {
                continue;
            };
            if seen.contains(metadata.item_id.as_str()) {
                continue;
            }
            if !filter.accepts(metadata) {
                continue;
            }
            if similarity < filter.min_similarity {
                continue;
            }

            seen.insert(metadata.item_id.as_str());
            results.push(SearchHit {
                slot,
                similarity,
                metadata: metadata.clone(),
            });
            if results.len() >= k {
                break;
            }
        }

        tracing::debug!(
            target: "stylevec::store",
            superset,
            returned = results.len(),
            "search complete"
        );
        Ok(results)
    }

    /// Index statistics.
    #[must_use]
    pub fn stats(&self) -> IndexStats {
        let mut categories = BTreeMap::new();
        let mut owners = BTreeSet::new();
        for (_, metadata) in self.table.iter() {
            *categories.entry(metadata.category.clone()).or_insert(0) += 1;
            if !metadata.owner.is_empty() {
                owners.insert(metadata.owner.as_str());
            }
        }

        IndexStats {
            live_items: self.table.len(),
            total_slots: self.index.len(),
            orphaned_slots: self.index.len() - self.table.len(),
            dimension: self.index.dimension().get(),
            categories,
            unique_owners: owners.len(),
            location: self.persistence.as_ref().map(|p| p.vector_path()),
        }
    }

    /// Rebuilds the flat index without orphaned slots.
    ///
    /// Live entries keep their relative order and get dense slot ids from zero.
    pub fn compact(&mut self) -> IndexResult<CompactionReport> {
        let slots_before = self.index.len();
        let live: Vec<SlotId> = self.table.iter().map(|(slot, _)| slot).collect();

        let index = self.index.retain_rows(&live);
        let mut table = MetadataTable::new();
        for (new_slot, (_, metadata)) in self.table.iter().enumerate() {
            table.insert(SlotId::from_index(new_slot)?, metadata.clone());
        }

        let old_index = std::mem::replace(&mut self.index, index);
        let old_table = std::mem::replace(&mut self.table, table);
        if let Err(e) = self.persist() {
            self.index = old_index;
            self.table = old_table;
            self.restore_on_disk();
            return Err(e);
        }

        let report = CompactionReport {
            slots_before,
            slots_after: self.index.len(),
            reclaimed: slots_before - self.index.len(),
        };
        tracing::info!(
            target: "stylevec::store",
            "compacted index: {} -> {} slots",
            report.slots_before,
            report.slots_after
        );
        Ok(report)
    }

    /// Writes the current snapshot, if the store is backed by storage.
    pub fn persist(&self) -> IndexResult<()> {
        match &self.persistence {
            Some(persistence) => persistence.save(&self.index, &self.table),
            None => Ok(()),
        }
    }

    /// Best-effort rewrite of the rolled-back state after a failed save, so a
    /// half-written snapshot does not outlive the failure.
    fn restore_on_disk(&self) {
        if let Err(e) = self.persist() {
            tracing::warn!(
                target: "stylevec::store",
                "could not restore the previous snapshot on disk: {e}"
            );
        }
    }
}
