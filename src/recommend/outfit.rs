//! Outfit completion from several base items.
//!
//! The base items' embeddings are averaged into one style vector. Target
//! categories come from a compatibility table keyed by the base categories,
//! and each target gets its own filtered search.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::recommend::ItemRecordStore;
use crate::storage::{SearchFilter, SearchHit, SharedStore};
use crate::vector::Embedder;
use crate::vector::math::normalized_mean;
use crate::{IndexError, IndexResult};

/// Similarity floor applied to every outfit search.
pub const DEFAULT_OUTFIT_MIN_SIMILARITY: f32 = 0.5;

/// Results per target category when a request does not say.
pub const DEFAULT_K_PER_CATEGORY: usize = 3;

/// Which categories complete an outfit started with a given category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRules {
    compatibility: BTreeMap<String, Vec<String>>,
    fallback_targets: Vec<String>,
}

impl Default for CategoryRules {
    fn default() -> Self {
        let table: [(&str, &[&str]); 4] = [
            ("top", &["bottom", "shoes", "outerwear"]),
            ("bottom", &["top", "shoes", "outerwear"]),
            ("dress", &["shoes", "outerwear"]),
            ("outerwear", &["top", "bottom", "shoes"]),
        ];
        Self::new(
            table
                .iter()
                .map(|(base, targets)| {
                    (
                        base.to_string(),
                        targets.iter().map(|t| t.to_string()).collect(),
                    )
                })
                .collect(),
            vec!["top".to_string(), "bottom".to_string(), "shoes".to_string()],
        )
    }
}

impl CategoryRules {
    pub fn new(compatibility: BTreeMap<String, Vec<String>>, fallback_targets: Vec<String>) -> Self {
        Self {
            compatibility,
            fallback_targets,
        }
    }

    #[must_use]
    pub fn compatibility(&self) -> &BTreeMap<String, Vec<String>> {
        &self.compatibility
    }

    #[must_use]
    pub fn fallback_targets(&self) -> &[String] {
        &self.fallback_targets
    }

    /// Targets suggested for one base category.
    #[must_use]
    pub fn targets_for(&self, category: &str) -> &[String] {
        self.compatibility
            .get(category)
            .map_or(self.fallback_targets.as_slice(), Vec::as_slice)
    }

    /// Union of the targets of every base category, minus the base categories.
    #[must_use]
    pub fn target_categories(&self, base: &BTreeSet<String>) -> BTreeSet<String> {
        base.iter()
            .flat_map(|category| self.targets_for(category).iter().cloned())
            .filter(|target| !base.contains(target))
            .collect()
    }
}

/// Builds outfit suggestions for a set of base items.
pub struct OutfitAggregator {
    store: SharedStore,
    embedder: Arc<dyn Embedder>,
    records: Option<Arc<dyn ItemRecordStore>>,
    rules: CategoryRules,
    min_similarity: f32,
}

impl std::fmt::Debug for OutfitAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutfitAggregator")
            .field("embedder", &self.embedder.model_name())
            .field("has_records", &self.records.is_some())
            .field("rules", &self.rules)
            .field("min_similarity", &self.min_similarity)
            .finish()
    }
}

impl OutfitAggregator {
    pub fn new(
        store: SharedStore,
        embedder: Arc<dyn Embedder>,
        records: Option<Arc<dyn ItemRecordStore>>,
    ) -> Self {
        Self {
            store,
            embedder,
            records,
            rules: CategoryRules::default(),
            min_similarity: DEFAULT_OUTFIT_MIN_SIMILARITY,
        }
    }

    #[must_use]
    pub fn with_rules(mut self, rules: CategoryRules) -> Self {
        self.rules = rules;
        self
    }

    #[must_use]
    pub fn with_min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    #[must_use]
    pub fn rules(&self) -> &CategoryRules {
        &self.rules
    }

    /// Suggestions per missing category for an outfit built around `base_item_ids`.
    ///
    /// Every target category is present in the result, possibly with no items.
    pub fn recommend_outfit(
        &self,
        base_item_ids: &[String],
        owner: &str,
        k_per_category: usize,
    ) -> IndexResult<BTreeMap<String, Vec<SearchHit>>> {
        if base_item_ids.is_empty() {
            return Err(IndexError::invalid_input("at least one base item is required"));
        }
        if owner.trim().is_empty() {
            return Err(IndexError::invalid_input("owner must not be empty"));
        }
        if k_per_category == 0 {
            return Err(IndexError::invalid_input("k_per_category must be at least 1"));
        }

        let records = self.records.as_ref().ok_or_else(|| IndexError::Configuration {
            reason: "outfit recommendations need an item record store".to_string(),
        })?;
        let items = records.fetch_by_ids(base_item_ids)?;
        if items.is_empty() {
            return Err(IndexError::ItemNotFound {
                item_id: base_item_ids.join(", "),
            });
        }

        let mut embeddings = Vec::with_capacity(items.len());
        for item in &items {
            let Some(image_ref) = item.image_ref.as_deref() else {
                tracing::debug!(target: "stylevec::outfit", "base item {} has no image, skipping", item.id);
                continue;
            };
            match self.embedder.embed_image(image_ref) {
                Ok(embedding) => embeddings.push(embedding),
                Err(e) => {
                    tracing::warn!(target: "stylevec::outfit", "skipping base item {}: {e}", item.id);
                }
            }
        }
        let style = normalized_mean(&embeddings).ok_or_else(|| IndexError::NoEmbeddingSource {
            what: "outfit base items".to_string(),
            reason: "no base item could be embedded".to_string(),
        })?;

        let base_categories: BTreeSet<String> =
            items.iter().map(|item| item.category.clone()).collect();
        let targets = self.rules.target_categories(&base_categories);

        let store = self.store.read();
        let mut outfit = BTreeMap::new();
        for category in targets {
            let filter = SearchFilter {
                owner: Some(owner.to_string()),
                categories: Some(vec![category.clone()]),
                exclude_item_id: None,
                min_similarity: self.min_similarity,
            };
            let hits = store.search(&style, k_per_category, &filter)?;
            outfit.insert(category, hits);
        }

        tracing::debug!(
            target: "stylevec::outfit",
            base = items.len(),
            embedded = embeddings.len(),
            categories = outfit.len(),
            "outfit computed"
        );
        Ok(outfit)
    }
}
