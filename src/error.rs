//! Error types for the wardrobe index
//!
//! This module provides structured error types using thiserror for better
//! error handling and actionable error messages.

use std::path::PathBuf;
use thiserror::Error;

use crate::vector::VectorError;

/// Coarse error classes surfaced to the service layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request was malformed; nothing was changed.
    InvalidInput,
    /// The item or its embedding source does not exist.
    NotFound,
    /// Durable storage could not be read or written.
    Unavailable,
    /// A required collaborator is not configured.
    Configuration,
    /// The embedding model failed.
    Embedding,
}

/// Main error type for index and recommendation operations
#[derive(Error, Debug)]
pub enum IndexError {
    /// Validation errors, raised before any mutation
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Item '{item_id}' not found in the index")]
    ItemNotFound { item_id: String },

    #[error("No embedding source for {what}: {reason}")]
    NoEmbeddingSource { what: String, reason: String },

    /// Storage errors
    #[error("Index storage unavailable at '{path}': {source}")]
    Unavailable {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Index appears to be corrupted: {reason}")]
    IndexCorrupted { reason: String },

    /// Configuration errors
    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },

    #[error(transparent)]
    Embedding(VectorError),
}

impl IndexError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn unavailable(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Unavailable {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Coarse class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::ItemNotFound { .. } | Self::NoEmbeddingSource { .. } => ErrorKind::NotFound,
            Self::Unavailable { .. } | Self::IndexCorrupted { .. } => ErrorKind::Unavailable,
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::Embedding(_) => ErrorKind::Embedding,
        }
    }

    /// Get a stable status code for this error type.
    ///
    /// Returns a string identifier that can be used in JSON responses
    /// for programmatic error handling.
    pub fn status_code(&self) -> String {
        match self {
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::ItemNotFound { .. } => "ITEM_NOT_FOUND",
            Self::NoEmbeddingSource { .. } => "NO_EMBEDDING_SOURCE",
            Self::Unavailable { .. } => "STORAGE_UNAVAILABLE",
            Self::IndexCorrupted { .. } => "INDEX_CORRUPTED",
            Self::Configuration { .. } => "CONFIG_ERROR",
            Self::Embedding(_) => "EMBEDDING_FAILED",
        }
        .to_string()
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Unavailable { .. } => vec![
                "Check disk space and permissions in the index directory",
                "The operation was not recorded; retry once storage is writable",
            ],
            Self::IndexCorrupted { .. } => vec![
                "Run 'stylevec reindex' to rebuild the index from the item catalog",
                "Delete the index directory to start from an empty index",
            ],
            Self::Configuration { .. } => vec![
                "Run 'stylevec init' to create a settings file",
                "Set records.catalog_path to enable catalog-backed flows",
            ],
            Self::NoEmbeddingSource { .. } => vec![
                "Make sure the item has an image reference in the catalog",
                "Pass --image-ref when no catalog is configured",
            ],
            Self::Embedding(_) => vec![
                "Check that the image file exists and is a supported format",
                "Ensure the embedding model finished downloading",
            ],
            _ => vec![],
        }
    }
}

impl From<VectorError> for IndexError {
    fn from(err: VectorError) -> Self {
        match err {
            VectorError::DimensionMismatch { .. }
            | VectorError::NonFinite { .. }
            | VectorError::InvalidDimension { .. } => Self::InvalidInput {
                reason: err.to_string(),
            },
            other => Self::Embedding(other),
        }
    }
}

/// Result type alias for index operations
pub type IndexResult<T> = Result<T, IndexError>;
