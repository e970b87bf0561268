//! Single-item recommendations and free-text search.

use std::sync::Arc;

use crate::recommend::ItemRecordStore;
use crate::storage::{SearchFilter, SearchHit, SharedStore};
use crate::vector::Embedder;
use crate::{IndexError, IndexResult};

/// Results returned when a request does not say how many.
pub const DEFAULT_K: usize = 10;

/// Similarity floor used when a request does not set one.
pub const DEFAULT_MIN_SIMILARITY: f32 = 0.5;

/// "More like this item" request.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendRequest {
    pub item_id: String,
    pub owner: String,
    pub k: Option<usize>,
    pub target_categories: Option<Vec<String>>,
    pub min_similarity: Option<f32>,
    /// Image to embed when no record store is configured or the record has none.
    pub image_ref: Option<String>,
}

impl RecommendRequest {
    pub fn new(item_id: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            owner: owner.into(),
            k: None,
            target_categories: None,
            min_similarity: None,
            image_ref: None,
        }
    }

    #[must_use]
    pub fn k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    #[must_use]
    pub fn target_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = Some(min_similarity);
        self
    }

    #[must_use]
    pub fn image_ref(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }
}

/// Text-to-image search request.
#[derive(Debug, Clone, PartialEq)]
pub struct TextQuery {
    pub text: String,
    pub owner: Option<String>,
    pub k: Option<usize>,
    pub categories: Option<Vec<String>>,
    pub min_similarity: Option<f32>,
}

impl TextQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            owner: None,
            k: None,
            categories: None,
            min_similarity: None,
        }
    }
}

/// Resolves items to query vectors and runs filtered searches.
pub struct RecommendationEngine {
    store: SharedStore,
    embedder: Arc<dyn Embedder>,
    records: Option<Arc<dyn ItemRecordStore>>,
    default_k: usize,
    default_min_similarity: f32,
}

impl std::fmt::Debug for RecommendationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecommendationEngine")
            .field("embedder", &self.embedder.model_name())
            .field("has_records", &self.records.is_some())
            .field("default_k", &self.default_k)
            .field("default_min_similarity", &self.default_min_similarity)
            .finish()
    }
}

impl RecommendationEngine {
    pub fn new(
        store: SharedStore,
        embedder: Arc<dyn Embedder>,
        records: Option<Arc<dyn ItemRecordStore>>,
    ) -> Self {
        Self {
            store,
            embedder,
            records,
            default_k: DEFAULT_K,
            default_min_similarity: DEFAULT_MIN_SIMILARITY,
        }
    }

    #[must_use]
    pub fn with_defaults(mut self, k: usize, min_similarity: f32) -> Self {
        self.default_k = k;
        self.default_min_similarity = min_similarity;
        self
    }

    /// Items from the owner's wardrobe most similar to `request.item_id`.
    pub fn recommend(&self, request: &RecommendRequest) -> IndexResult<Vec<SearchHit>> {
        if request.item_id.trim().is_empty() {
            return Err(IndexError::invalid_input("item_id must not be empty"));
        }
        if request.owner.trim().is_empty() {
            return Err(IndexError::invalid_input("owner must not be empty"));
        }
        let k = request.k.unwrap_or(self.default_k);
        let min_similarity = request.min_similarity.unwrap_or(self.default_min_similarity);
        validate_k_and_floor(k, min_similarity)?;
        if let Some(categories) = &request.target_categories {
            validate_categories(categories)?;
        }

        let image_ref = self.resolve_image_ref(request)?;
        let query = self.embedder.embed_image(&image_ref).map_err(|e| {
            IndexError::NoEmbeddingSource {
                what: format!("item '{}'", request.item_id),
                reason: e.to_string(),
            }
        })?;

        let filter = SearchFilter {
            owner: Some(request.owner.clone()),
            categories: request.target_categories.clone(),
            exclude_item_id: Some(request.item_id.clone()),
            min_similarity,
        };
        let hits = self.store.read().search(&query, k, &filter)?;

        tracing::debug!(
            target: "stylevec::recommend",
            item_id = %request.item_id,
            returned = hits.len(),
            "recommendations computed"
        );
        Ok(hits)
    }

    /// Items whose images best match a text description.
    pub fn search_by_text(&self, query: &TextQuery) -> IndexResult<Vec<SearchHit>> {
        if query.text.trim().is_empty() {
            return Err(IndexError::invalid_input("query text must not be empty"));
        }
        let k = query.k.unwrap_or(self.default_k);
        let min_similarity = query.min_similarity.unwrap_or(self.default_min_similarity);
        validate_k_and_floor(k, min_similarity)?;
        if let Some(categories) = &query.categories {
            validate_categories(categories)?;
        }

        let vector = self.embedder.embed_text(&query.text).map_err(IndexError::Embedding)?;
        let filter = SearchFilter {
            owner: query.owner.clone(),
            categories: query.categories.clone(),
            exclude_item_id: None,
            min_similarity,
        };
        self.store.read().search(&vector, k, &filter)
    }

    fn resolve_image_ref(&self, request: &RecommendRequest) -> IndexResult<String> {
        let from_record = match &self.records {
            Some(records) => {
                let record = records.fetch_by_id(&request.item_id)?.ok_or_else(|| {
                    IndexError::ItemNotFound {
                        item_id: request.item_id.clone(),
                    }
                })?;
                record.image_ref
            }
            None => None,
        };

        from_record
            .or_else(|| request.image_ref.clone())
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| IndexError::NoEmbeddingSource {
                what: format!("item '{}'", request.item_id),
                reason: "no image reference is known for it".to_string(),
            })
    }
}

fn validate_k_and_floor(k: usize, min_similarity: f32) -> IndexResult<()> {
    if k == 0 {
        return Err(IndexError::invalid_input("k must be at least 1"));
    }
    if !(-1.0..=1.0).contains(&min_similarity) {
        return Err(IndexError::invalid_input(format!(
            "min_similarity must be within [-1, 1], got {min_similarity}"
        )));
    }
    Ok(())
}

fn validate_categories(categories: &[String]) -> IndexResult<()> {
    if categories.is_empty() {
        return Err(IndexError::invalid_input(
            "target category list must not be empty when given",
        ));
    }
    Ok(())
}
