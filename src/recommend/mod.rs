//! Retrieval on top of the vector store: item recommendations, text search
//! and outfit completion.

mod engine;
mod outfit;
mod records;

pub use engine::{
    DEFAULT_K, DEFAULT_MIN_SIMILARITY, RecommendRequest, RecommendationEngine, TextQuery,
};
pub use outfit::{
    CategoryRules, DEFAULT_K_PER_CATEGORY, DEFAULT_OUTFIT_MIN_SIMILARITY, OutfitAggregator,
};
pub use records::{InMemoryRecordStore, ItemRecord, ItemRecordStore, JsonCatalogStore};
