//! Embedding generation for wardrobe images and free text.
//!
//! The index never looks at pixels. It consumes vectors through the
//! [`Embedder`] trait, which maps an image reference (a local path) or a text
//! query into the same unit-length vector space.
//!
//! Two implementations ship with the crate:
//! - [`ClipEmbedder`] runs a CLIP-style image/text model pair through fastembed.
//! - [`PrecomputedEmbedder`] serves vectors produced elsewhere, keyed by image
//!   reference or text. Deployments with a separate embedding service load its
//!   output from JSON; tests use it as a deterministic embedder.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fastembed::{
    EmbeddingModel, ImageEmbedding, ImageEmbeddingModel, ImageInitOptions, InitOptions,
    TextEmbedding,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::vector::math::normalize_in_place;
use crate::vector::{VectorDimension, VectorError};

/// Maps images and text into one embedding space.
///
/// Implementations must be deterministic for identical input and return
/// unit-length vectors of [`Embedder::dimension`] components.
pub trait Embedder: Send + Sync {
    /// Embed the image found at `image_ref`.
    fn embed_image(&self, image_ref: &str) -> Result<Vec<f32>, VectorError>;

    /// Embed a text query into the image space.
    fn embed_text(&self, text: &str) -> Result<Vec<f32>, VectorError>;

    /// Dimension of the produced vectors.
    #[must_use]
    fn dimension(&self) -> VectorDimension;

    /// Human readable model identifier, reported in stats.
    #[must_use]
    fn model_name(&self) -> &str;
}

/// An image tower and a text tower that share one vector space.
#[derive(Debug, Clone)]
pub struct ModelPair {
    pub name: &'static str,
    pub image: ImageEmbeddingModel,
    pub text: EmbeddingModel,
    pub dimension: usize,
}

/// Parse a model identifier from settings.
pub fn parse_model_pair(name: &str) -> Result<ModelPair, VectorError> {
    match name {
        "ClipVitB32" | "clip-vit-b-32" => Ok(ModelPair {
            name: "ClipVitB32",
            image: ImageEmbeddingModel::ClipVitB32,
            text: EmbeddingModel::ClipVitB32,
            dimension: 512,
        }),
        "NomicEmbedVisionV15" | "nomic-embed-vision-v1.5" => Ok(ModelPair {
            name: "NomicEmbedVisionV15",
            image: ImageEmbeddingModel::NomicEmbedVisionV15,
            text: EmbeddingModel::NomicEmbedTextV15,
            dimension: 768,
        }),
        other => Err(VectorError::EmbeddingFailed(format!(
            "Unknown model '{other}'. Supported: ClipVitB32, NomicEmbedVisionV15"
        ))),
    }
}

/// fastembed-backed image and text embedder.
pub struct ClipEmbedder {
    image_model: Mutex<ImageEmbedding>,
    text_model: Mutex<TextEmbedding>,
    dimension: VectorDimension,
    name: &'static str,
}

impl std::fmt::Debug for ClipEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipEmbedder")
            .field("model", &self.name)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl ClipEmbedder {
    /// Load both towers of `pair`, downloading them into `cache_dir` on first use.
    ///
    /// # Errors
    /// Returns an error if either model fails to initialize or download.
    pub fn new(
        pair: ModelPair,
        cache_dir: impl Into<PathBuf>,
        show_download_progress: bool,
    ) -> Result<Self, VectorError> {
        let cache_dir = cache_dir.into();

        let image_model = ImageEmbedding::try_new(
            ImageInitOptions::new(pair.image.clone())
                .with_cache_dir(cache_dir.clone())
                .with_show_download_progress(show_download_progress),
        )
        .map_err(|e| VectorError::EmbeddingFailed(
            format!("Failed to initialize image model {}: {e}. Ensure you have internet connection for first-time model download", pair.name)
        ))?;

        let text_model = TextEmbedding::try_new(
            InitOptions::new(pair.text.clone())
                .with_cache_dir(cache_dir)
                .with_show_download_progress(show_download_progress),
        )
        .map_err(|e| {
            VectorError::EmbeddingFailed(format!(
                "Failed to initialize text model {}: {e}",
                pair.name
            ))
        })?;

        Ok(Self {
            image_model: Mutex::new(image_model),
            text_model: Mutex::new(text_model),
            dimension: VectorDimension::new(pair.dimension)?,
            name: pair.name,
        })
    }

    fn finish(&self, embeddings: Vec<Vec<f32>>) -> Result<Vec<f32>, VectorError> {
        let mut embedding = embeddings.into_iter().next().ok_or_else(|| {
            VectorError::EmbeddingFailed("Model returned no embedding".to_string())
        })?;
        self.dimension.validate_vector(&embedding)?;
        normalize_in_place(&mut embedding);
        Ok(embedding)
    }
}

impl Embedder for ClipEmbedder {
    fn embed_image(&self, image_ref: &str) -> Result<Vec<f32>, VectorError> {
        if image_ref.starts_with("http://") || image_ref.starts_with("https://") {
            return Err(VectorError::EmbeddingFailed(format!(
                "Remote image '{image_ref}' must be downloaded before embedding"
            )));
        }
        let path = Path::new(image_ref);
        if !path.is_file() {
            return Err(VectorError::EmbeddingFailed(format!(
                "Image not found: {image_ref}"
            )));
        }

        let embeddings = self
            .image_model
            .lock()
            .embed(vec![path], None)
            .map_err(|e| {
                VectorError::EmbeddingFailed(format!("Failed to embed image {image_ref}: {e}"))
            })?;
        self.finish(embeddings)
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>, VectorError> {
        let embeddings = self
            .text_model
            .lock()
            .embed(vec![text], None)
            .map_err(|e| VectorError::EmbeddingFailed(format!("Failed to embed text: {e}")))?;
        self.finish(embeddings)
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn model_name(&self) -> &str {
        self.name
    }
}

/// [`ClipEmbedder`] that loads its models on first use.
///
/// Dimension and model name are known up front, so commands that never embed
/// (stats, remove, compact) do not pay for a model download.
pub struct LazyClipEmbedder {
    pair: ModelPair,
    cache_dir: PathBuf,
    show_download_progress: bool,
    loaded: Mutex<Option<Arc<ClipEmbedder>>>,
}

impl std::fmt::Debug for LazyClipEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyClipEmbedder")
            .field("model", &self.pair.name)
            .field("cache_dir", &self.cache_dir)
            .field("loaded", &self.loaded.lock().is_some())
            .finish()
    }
}

impl LazyClipEmbedder {
    pub fn new(pair: ModelPair, cache_dir: impl Into<PathBuf>, show_download_progress: bool) -> Self {
        Self {
            pair,
            cache_dir: cache_dir.into(),
            show_download_progress,
            loaded: Mutex::new(None),
        }
    }

    fn get(&self) -> Result<Arc<ClipEmbedder>, VectorError> {
        let mut loaded = self.loaded.lock();
        if let Some(embedder) = loaded.as_ref() {
            return Ok(Arc::clone(embedder));
        }
        tracing::info!(target: "stylevec::embedding", "loading model {}", self.pair.name);
        let embedder = Arc::new(ClipEmbedder::new(
            self.pair.clone(),
            self.cache_dir.clone(),
            self.show_download_progress,
        )?);
        *loaded = Some(Arc::clone(&embedder));
        Ok(embedder)
    }
}

impl Embedder for LazyClipEmbedder {
    fn embed_image(&self, image_ref: &str) -> Result<Vec<f32>, VectorError> {
        self.get()?.embed_image(image_ref)
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>, VectorError> {
        self.get()?.embed_text(text)
    }

    fn dimension(&self) -> VectorDimension {
        VectorDimension::new(self.pair.dimension).unwrap_or_default()
    }

    fn model_name(&self) -> &str {
        self.pair.name
    }
}

/// Serialized form of [`PrecomputedEmbedder`].
#[derive(Debug, Default, Serialize, Deserialize)]
struct PrecomputedFile {
    #[serde(default)]
    images: HashMap<String, Vec<f32>>,
    #[serde(default)]
    texts: HashMap<String, Vec<f32>>,
}

/// Serves vectors computed ahead of time.
#[derive(Debug, Clone)]
pub struct PrecomputedEmbedder {
    images: HashMap<String, Vec<f32>>,
    texts: HashMap<String, Vec<f32>>,
    dimension: VectorDimension,
}

impl PrecomputedEmbedder {
    #[must_use]
    pub fn new(dimension: VectorDimension) -> Self {
        Self {
            images: HashMap::new(),
            texts: HashMap::new(),
            dimension,
        }
    }

    /// Load `{"images": {ref: [..]}, "texts": {text: [..]}}` from a JSON file.
    pub fn from_json_file(path: &Path, dimension: VectorDimension) -> Result<Self, VectorError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            VectorError::EmbeddingFailed(format!(
                "Failed to read precomputed embeddings '{}': {e}",
                path.display()
            ))
        })?;
        let file: PrecomputedFile = serde_json::from_str(&json).map_err(|e| {
            VectorError::EmbeddingFailed(format!(
                "Failed to parse precomputed embeddings '{}': {e}",
                path.display()
            ))
        })?;

        let mut embedder = Self::new(dimension);
        for (image_ref, vector) in file.images {
            embedder.insert_image(image_ref, vector)?;
        }
        for (text, vector) in file.texts {
            embedder.insert_text(text, vector)?;
        }
        Ok(embedder)
    }

    /// Register the vector for an image reference.
    pub fn insert_image(
        &mut self,
        image_ref: impl Into<String>,
        mut vector: Vec<f32>,
    ) -> Result<(), VectorError> {
        self.dimension.validate_vector(&vector)?;
        normalize_in_place(&mut vector);
        self.images.insert(image_ref.into(), vector);
        Ok(())
    }

    /// Builder-style variant of [`PrecomputedEmbedder::insert_image`].
    pub fn with_image(
        mut self,
        image_ref: impl Into<String>,
        vector: Vec<f32>,
    ) -> Result<Self, VectorError> {
        self.insert_image(image_ref, vector)?;
        Ok(self)
    }

    /// Register the vector for a text query.
    pub fn insert_text(
        &mut self,
        text: impl Into<String>,
        mut vector: Vec<f32>,
    ) -> Result<(), VectorError> {
        self.dimension.validate_vector(&vector)?;
        normalize_in_place(&mut vector);
        self.texts.insert(text.into(), vector);
        Ok(())
    }

    #[must_use]
    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

impl Embedder for PrecomputedEmbedder {
    fn embed_image(&self, image_ref: &str) -> Result<Vec<f32>, VectorError> {
        self.images.get(image_ref).cloned().ok_or_else(|| {
            VectorError::EmbeddingFailed(format!("No precomputed embedding for image {image_ref}"))
        })
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>, VectorError> {
        self.texts.get(text).cloned().ok_or_else(|| {
            VectorError::EmbeddingFailed(format!("No precomputed embedding for text '{text}'"))
        })
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "precomputed"
    }
}
