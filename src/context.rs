//! Application context: everything a request handler needs, built once.
//!
//! [`AppContext`] owns the shared store, the embedder and the optional record
//! store, and runs the flows that touch more than one of them: ingesting an
//! uploaded item, rebuilding the index from records, and compaction.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::config::Settings;
use crate::recommend::{
    ItemRecordStore, JsonCatalogStore, OutfitAggregator, RecommendRequest, RecommendationEngine,
    TextQuery,
};
use crate::storage::{
    CompactionReport, IndexPersistence, IndexStats, ItemMetadata, SearchHit, SharedStore,
    VectorStore,
};
use crate::vector::{
    Embedder, LazyClipEmbedder, PrecomputedEmbedder, SlotId, VectorDimension, parse_model_pair,
};
use crate::{IndexError, IndexResult};

/// Progress is logged every this many records during a reindex.
const REINDEX_PROGRESS_INTERVAL: usize = 10;

/// A newly uploaded item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemUpload {
    pub item_id: String,
    pub owner: String,
    pub category: String,
    pub image_ref: String,
    pub name: Option<String>,
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl ItemUpload {
    pub fn new(
        item_id: impl Into<String>,
        owner: impl Into<String>,
        category: impl Into<String>,
        image_ref: impl Into<String>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            owner: owner.into(),
            category: category.into(),
            image_ref: image_ref.into(),
            name: None,
            attributes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Result of a successful ingest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestOutcome {
    pub item_id: String,
    pub slot: SlotId,
    pub dimension: usize,
    pub metadata: ItemMetadata,
}

/// Counters from [`AppContext::reindex_from_records`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReindexReport {
    pub total: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Index statistics plus service-level facts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStats {
    #[serde(flatten)]
    pub index: IndexStats,
    pub model: String,
    pub records_configured: bool,
}

/// Explicit application context.
pub struct AppContext {
    store: SharedStore,
    embedder: Arc<dyn Embedder>,
    records: Option<Arc<dyn ItemRecordStore>>,
    engine: RecommendationEngine,
    outfits: OutfitAggregator,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("engine", &self.engine)
            .field("outfits", &self.outfits)
            .finish()
    }
}

impl AppContext {
    /// Assemble a context from ready-made parts with default tuning.
    pub fn new(
        store: VectorStore,
        embedder: Arc<dyn Embedder>,
        records: Option<Arc<dyn ItemRecordStore>>,
    ) -> IndexResult<Self> {
        Self::with_settings(store, embedder, records, &Settings::default())
    }

    /// Assemble a context from ready-made parts, taking defaults from `settings`.
    pub fn with_settings(
        store: VectorStore,
        embedder: Arc<dyn Embedder>,
        records: Option<Arc<dyn ItemRecordStore>>,
        settings: &Settings,
    ) -> IndexResult<Self> {
        if embedder.dimension() != store.dimension() {
            return Err(IndexError::Configuration {
                reason: format!(
                    "embedder '{}' produces {}-dimensional vectors but the index holds {}",
                    embedder.model_name(),
                    embedder.dimension(),
                    store.dimension()
                ),
            });
        }

        let store: SharedStore = Arc::new(RwLock::new(store));
        let engine =
            RecommendationEngine::new(Arc::clone(&store), Arc::clone(&embedder), records.clone())
                .with_defaults(settings.search.default_k, settings.search.default_min_similarity);
        let outfits =
            OutfitAggregator::new(Arc::clone(&store), Arc::clone(&embedder), records.clone())
                .with_rules(settings.category_rules())
                .with_min_similarity(settings.outfit.min_similarity);

        Ok(Self {
            store,
            embedder,
            records,
            engine,
            outfits,
        })
    }

    /// Build everything described by `settings`: the persisted store, the
    /// embedder and, when configured, the catalog.
    pub fn from_settings(settings: &Settings) -> IndexResult<Self> {
        settings.validate()?;
        let dimension = VectorDimension::new(settings.index.dimension)?;

        let persistence =
            IndexPersistence::new(settings.index_dir(), settings.index.name.clone(), dimension);
        let store = VectorStore::open(persistence).with_tuning(settings.search_tuning());

        let embedder: Arc<dyn Embedder> = match &settings.embedding.precomputed_path {
            Some(path) => Arc::new(
                PrecomputedEmbedder::from_json_file(&settings.resolve_path(path), dimension)
                    .map_err(|e| IndexError::Configuration {
                        reason: e.to_string(),
                    })?,
            ),
            None => {
                let pair = parse_model_pair(&settings.embedding.model).map_err(|e| {
                    IndexError::Configuration {
                        reason: e.to_string(),
                    }
                })?;
                Arc::new(LazyClipEmbedder::new(
                    pair,
                    settings.embedding.cache_dir.clone(),
                    settings.embedding.show_download_progress,
                ))
            }
        };

        let records: Option<Arc<dyn ItemRecordStore>> = match &settings.records.catalog_path {
            Some(path) => Some(Arc::new(JsonCatalogStore::open(
                settings.resolve_path(path),
            )?)),
            None => None,
        };

        Self::with_settings(store, embedder, records, settings)
    }

    #[must_use]
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    #[must_use]
    pub fn engine(&self) -> &RecommendationEngine {
        &self.engine
    }

    #[must_use]
    pub fn outfits(&self) -> &OutfitAggregator {
        &self.outfits
    }

    #[must_use]
    pub fn has_records(&self) -> bool {
        self.records.is_some()
    }

    /// Embed an uploaded image and add it to the index.
    pub fn ingest(&self, upload: ItemUpload) -> IndexResult<IngestOutcome> {
        for (field, value) in [
            ("item_id", &upload.item_id),
            ("owner", &upload.owner),
            ("category", &upload.category),
        ] {
            if value.trim().is_empty() {
                return Err(IndexError::invalid_input(format!("{field} must not be empty")));
            }
        }

        tracing::info!(target: "stylevec::ingest", "generating embedding for item {}", upload.item_id);
        let vector = self
            .embedder
            .embed_image(&upload.image_ref)
            .map_err(IndexError::Embedding)?;

        let mut metadata = ItemMetadata::new(upload.item_id, upload.owner, upload.category)
            .with_image_ref(upload.image_ref);
        if let Some(name) = upload.name.filter(|n| !n.trim().is_empty()) {
            metadata.name = name;
        }
        metadata.attributes = upload.attributes;

        let slot = self.store.write().add(&vector, metadata.clone())?;
        Ok(IngestOutcome {
            item_id: metadata.item_id.clone(),
            slot,
            dimension: vector.len(),
            metadata,
        })
    }

    /// Logically remove an item from the index.
    pub fn remove(&self, item_id: &str) -> IndexResult<bool> {
        if item_id.trim().is_empty() {
            return Err(IndexError::invalid_input("item_id must not be empty"));
        }
        self.store.write().remove(item_id)
    }

    pub fn recommend(&self, request: &RecommendRequest) -> IndexResult<Vec<SearchHit>> {
        self.engine.recommend(request)
    }

    pub fn search_by_text(&self, query: &TextQuery) -> IndexResult<Vec<SearchHit>> {
        self.engine.search_by_text(query)
    }

    pub fn recommend_outfit(
        &self,
        base_item_ids: &[String],
        owner: &str,
        k_per_category: usize,
    ) -> IndexResult<BTreeMap<String, Vec<SearchHit>>> {
        self.outfits
            .recommend_outfit(base_item_ids, owner, k_per_category)
    }

    /// Re-ingest every record of the record store.
    ///
    /// Records without an image are skipped; failures are counted and do not
    /// stop the run.
    pub fn reindex_from_records(&self) -> IndexResult<ReindexReport> {
        let records = self.records.as_ref().ok_or_else(|| IndexError::Configuration {
            reason: "reindexing needs an item record store".to_string(),
        })?;
        let items = records.fetch_all()?;

        let mut report = ReindexReport {
            total: items.len(),
            ..ReindexReport::default()
        };
        tracing::info!(target: "stylevec::reindex", "reindexing {} records", report.total);

        for (position, record) in items.into_iter().enumerate() {
            let Some(image_ref) = record.image_ref.clone() else {
                tracing::warn!(target: "stylevec::reindex", "item {} has no image reference, skipping", record.id);
                report.skipped += 1;
                continue;
            };

            let mut upload = ItemUpload::new(record.id.clone(), record.owner, record.category, image_ref);
            upload.name = record.name;
            match self.ingest(upload) {
                Ok(_) => report.processed += 1,
                Err(e) => {
                    tracing::warn!(target: "stylevec::reindex", "failed to index item {}: {e}", record.id);
                    report.failed += 1;
                }
            }

            if (position + 1) % REINDEX_PROGRESS_INTERVAL == 0 {
                tracing::info!(
                    target: "stylevec::reindex",
                    "progress: {}/{} records",
                    position + 1,
                    report.total
                );
            }
        }

        tracing::info!(
            target: "stylevec::reindex",
            processed = report.processed,
            skipped = report.skipped,
            failed = report.failed,
            "reindex complete"
        );
        Ok(report)
    }

    /// Drop orphaned slots; see [`VectorStore::compact`].
    pub fn compact(&self) -> IndexResult<CompactionReport> {
        self.store.write().compact()
    }

    #[must_use]
    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            index: self.store.read().stats(),
            model: self.embedder.model_name().to_string(),
            records_configured: self.records.is_some(),
        }
    }
}
