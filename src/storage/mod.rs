//! Storage layer: item metadata, the persisted snapshot and the vector store.

mod metadata;
mod persistence;
mod store;

pub use metadata::{ItemMetadata, MetadataTable, default_name};
pub use persistence::{IndexPersistence, IndexSnapshot};
pub use store::{
    CompactionReport, DEFAULT_FALLBACK_CANDIDATES, DEFAULT_OVERSAMPLE_FACTOR, IndexStats,
    SearchFilter, SearchHit, SearchTuning, VectorStore,
};

/// The store as shared between request handlers.
///
/// Mutations hold the write lock across read-modify-persist; searches hold
/// the read lock only while scanning.
pub type SharedStore = std::sync::Arc<parking_lot::RwLock<VectorStore>>;
