//! The main library module for stylevec
//!
//! A similarity-search backend for clothing items: image embeddings are kept
//! in an exact flat index next to item metadata, and filtered nearest-neighbour
//! queries produce item and outfit recommendations.

pub mod config;
pub mod context;
pub mod display;
pub mod error;
pub mod io;
pub mod logging;
pub mod recommend;
pub mod storage;
pub mod vector;

// Explicit exports for better API clarity
pub use config::Settings;
pub use context::{AppContext, IngestOutcome, ItemUpload, ReindexReport, ServiceStats};
pub use error::{ErrorKind, IndexError, IndexResult};
pub use recommend::{
    CategoryRules, InMemoryRecordStore, ItemRecord, ItemRecordStore, JsonCatalogStore,
    OutfitAggregator, RecommendRequest, RecommendationEngine, TextQuery,
};
pub use storage::{
    CompactionReport, IndexPersistence, IndexStats, ItemMetadata, SearchFilter, SearchHit,
    SearchTuning, SharedStore, VectorStore,
};
pub use vector::{Embedder, PrecomputedEmbedder, SlotId, VectorDimension};
