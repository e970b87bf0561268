//! Configuration module for the wardrobe index.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file (`.stylevec/settings.toml`)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `SV_` and use double underscores
//! to separate nested levels:
//! - `SV_SEARCH__OVERSAMPLE_FACTOR=8` sets `search.oversample_factor`
//! - `SV_INDEX__DIMENSION=768` sets `index.dimension`
//! - `SV_LOGGING__LEVEL=debug` sets `logging.level`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::recommend::CategoryRules;
use crate::storage::SearchTuning;
use crate::vector::{VECTOR_DIMENSION_512, VectorDimension};
use crate::{IndexError, IndexResult};

/// Directory holding the settings file and, by default, the index.
pub const CONFIG_DIR: &str = ".stylevec";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Workspace root directory (where .stylevec is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub outfit: OutfitConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub records: RecordsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct IndexConfig {
    /// Directory holding the index artifacts, relative to the workspace root
    #[serde(default = "default_index_dir")]
    pub dir: PathBuf,

    /// Artifact base name: `<name>.vec` and `<name>.meta.json`
    #[serde(default = "default_index_name")]
    pub name: String,

    /// Embedding dimension; must match the embedding model
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SearchConfig {
    /// Candidates fetched per requested result before filtering
    #[serde(default = "default_oversample_factor")]
    pub oversample_factor: usize,

    /// Candidates fetched when `k * oversample_factor` is zero
    #[serde(default = "default_fallback_candidates")]
    pub fallback_candidates: usize,

    #[serde(default = "default_k")]
    pub default_k: usize,

    #[serde(default = "default_min_similarity")]
    pub default_min_similarity: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OutfitConfig {
    #[serde(default = "default_k_per_category")]
    pub k_per_category: usize,

    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,

    /// Base category -> categories that complete it
    #[serde(default = "default_compatibility")]
    pub compatibility: BTreeMap<String, Vec<String>>,

    /// Targets for base categories missing from the table
    #[serde(default = "default_fallback_targets")]
    pub fallback_targets: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EmbeddingConfig {
    /// Image/text model pair used for embeddings
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Where downloaded models are cached
    #[serde(default = "default_model_cache_dir")]
    pub cache_dir: PathBuf,

    #[serde(default = "default_false")]
    pub show_download_progress: bool,

    /// JSON file of precomputed vectors; replaces the model when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precomputed_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct RecordsConfig {
    /// JSON catalog of item records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_index_dir() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("index")
}
fn default_index_name() -> String {
    "wardrobe".to_string()
}
fn default_dimension() -> usize {
    VECTOR_DIMENSION_512
}
fn default_oversample_factor() -> usize {
    crate::storage::DEFAULT_OVERSAMPLE_FACTOR
}
fn default_fallback_candidates() -> usize {
    crate::storage::DEFAULT_FALLBACK_CANDIDATES
}
fn default_k() -> usize {
    crate::recommend::DEFAULT_K
}
fn default_min_similarity() -> f32 {
    crate::recommend::DEFAULT_MIN_SIMILARITY
}
fn default_k_per_category() -> usize {
    crate::recommend::DEFAULT_K_PER_CATEGORY
}
fn default_compatibility() -> BTreeMap<String, Vec<String>> {
    CategoryRules::default().compatibility().clone()
}
fn default_fallback_targets() -> Vec<String> {
    CategoryRules::default().fallback_targets().to_vec()
}
fn default_embedding_model() -> String {
    "ClipVitB32".to_string()
}
fn default_model_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("stylevec").join("models"))
        .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("models"))
}
fn default_false() -> bool {
    false
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            workspace_root: None,
            index: IndexConfig::default(),
            search: SearchConfig::default(),
            outfit: OutfitConfig::default(),
            embedding: EmbeddingConfig::default(),
            records: RecordsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: default_index_dir(),
            name: default_index_name(),
            dimension: default_dimension(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            oversample_factor: default_oversample_factor(),
            fallback_candidates: default_fallback_candidates(),
            default_k: default_k(),
            default_min_similarity: default_min_similarity(),
        }
    }
}

impl Default for OutfitConfig {
    fn default() -> Self {
        Self {
            k_per_category: default_k_per_category(),
            min_similarity: default_min_similarity(),
            compatibility: default_compatibility(),
            fallback_targets: default_fallback_targets(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            cache_dir: default_model_cache_dir(),
            show_download_progress: default_false(),
            precomputed_path: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Maps `SV_SEARCH__DEFAULT_K` to `search.default_k`.
fn env_provider() -> Env {
    Env::prefixed("SV_").map(|key| {
        key.as_str()
            .to_lowercase()
            .replace("__", ".") // Double underscore becomes dot
            .into()
    })
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        // Try to find the workspace root by looking for .stylevec directory
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("settings.toml"));

        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            .merge(env_provider())
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root();
                }
                settings
            })
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(env_provider())
            .extract()
            .map_err(Box::new)
    }

    /// Find the settings file by looking for a .stylevec directory
    /// from the current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join("settings.toml"))
    }

    /// Get the workspace root directory (where .stylevec is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Resolve a configured path against the workspace root.
    #[must_use]
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.workspace_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Absolute location of the index directory
    #[must_use]
    pub fn index_dir(&self) -> PathBuf {
        self.resolve_path(&self.index.dir)
    }

    /// Check values that would otherwise fail deep inside an operation.
    pub fn validate(&self) -> IndexResult<()> {
        VectorDimension::new(self.index.dimension).map_err(|e| IndexError::Configuration {
            reason: e.to_string(),
        })?;
        if self.index.name.trim().is_empty() {
            return Err(IndexError::Configuration {
                reason: "index.name must not be empty".to_string(),
            });
        }
        for (key, value) in [
            ("search.default_min_similarity", self.search.default_min_similarity),
            ("outfit.min_similarity", self.outfit.min_similarity),
        ] {
            if !(-1.0..=1.0).contains(&value) {
                return Err(IndexError::Configuration {
                    reason: format!("{key} must be within [-1, 1], got {value}"),
                });
            }
        }
        if self.search.default_k == 0 || self.outfit.k_per_category == 0 {
            return Err(IndexError::Configuration {
                reason: "search.default_k and outfit.k_per_category must be at least 1"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// Candidate sizing for the vector store
    #[must_use]
    pub fn search_tuning(&self) -> SearchTuning {
        SearchTuning {
            oversample_factor: self.search.oversample_factor,
            fallback_candidates: self.search.fallback_candidates,
        }
    }

    /// Outfit compatibility rules
    #[must_use]
    pub fn category_rules(&self) -> CategoryRules {
        CategoryRules::new(
            self.outfit.compatibility.clone(),
            self.outfit.fallback_targets.clone(),
        )
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let current_dir = std::env::current_dir()?;
        Self::init_config_file_in(&current_dir, force)
    }

    /// Create a default settings file with helpful comments under `root`
    pub fn init_config_file_in(
        root: &Path,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = root.join(CONFIG_DIR).join("settings.toml");

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = format!(
            r#"# stylevec configuration file

# Version of the configuration schema
version = 1

[index]
# Directory holding the index artifacts (relative to the workspace root)
dir = ".stylevec/index"

# Artifacts are written as <name>.vec and <name>.meta.json
name = "wardrobe"

# Embedding dimension; must match embedding.model (ClipVitB32: 512)
dimension = 512

[search]
# Candidates fetched per requested result before owner/category filters
oversample_factor = 5

# Candidates fetched when k * oversample_factor is zero
fallback_candidates = 100

# Results returned when a request does not say
default_k = 10

# Similarity floor (-1.0 to 1.0) when a request does not set one
default_min_similarity = 0.5

[outfit]
k_per_category = 3
min_similarity = 0.5

# Categories suggested for a base category missing from the table below
fallback_targets = ["top", "bottom", "shoes"]

[outfit.compatibility]
top = ["bottom", "shoes", "outerwear"]
bottom = ["top", "shoes", "outerwear"]
dress = ["shoes", "outerwear"]
outerwear = ["top", "bottom", "shoes"]

[embedding]
# Image/text model pair: ClipVitB32 or NomicEmbedVisionV15
model = "ClipVitB32"

# Where downloaded models are cached
cache_dir = '{}'

show_download_progress = false

# Serve vectors from a JSON file instead of running a model
# precomputed_path = "embeddings.json"

[records]
# JSON catalog of item records: [{{"id", "owner", "category", "image_ref", "name"}}]
# catalog_path = "catalog.json"

[logging]
# Default log filter; RUST_LOG takes precedence
level = "warn"
"#,
            default_model_cache_dir().display()
        );

        std::fs::write(&config_path, template)?;

        Ok(config_path)
    }
}
