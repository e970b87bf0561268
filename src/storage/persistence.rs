//! Persistence layer for the wardrobe index
//!
//! An index lives in two companion artifacts under one directory:
//! - `<name>.vec`: the flat vector rows (see [`crate::vector::VectorFile`])
//! - `<name>.meta.json`: the slot tables and bookkeeping
//!
//! Saving writes vectors first, then metadata, each through a temporary file
//! renamed into place. Loading never fails the process: a missing, unreadable
//! or inconsistent snapshot is logged and replaced by an empty index.

use std::collections::BTreeMap;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::storage::{ItemMetadata, MetadataTable};
use crate::vector::{FlatIndex, SlotId, VectorDimension, VectorFile};
use crate::{IndexError, IndexResult};

/// Version of the metadata document layout.
const METADATA_VERSION: u32 = 1;

/// Everything needed to rebuild a store in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSnapshot {
    pub index: FlatIndex,
    pub table: MetadataTable,
}

impl IndexSnapshot {
    #[must_use]
    pub fn empty(dimension: VectorDimension) -> Self {
        Self {
            index: FlatIndex::new(dimension),
            table: MetadataTable::new(),
        }
    }
}

#[derive(Serialize)]
struct MetadataDocumentRef<'a> {
    version: u32,
    dimension: usize,
    slot_count: usize,
    saved_at: u64,
    entries: &'a BTreeMap<SlotId, ItemMetadata>,
    item_slots: &'a BTreeMap<String, SlotId>,
}

#[derive(Deserialize)]
struct MetadataDocument {
    version: u32,
    dimension: usize,
    slot_count: usize,
    #[serde(default)]
    saved_at: u64,
    #[serde(default)]
    entries: BTreeMap<SlotId, ItemMetadata>,
    #[serde(default)]
    item_slots: BTreeMap<String, SlotId>,
}

/// Manages the on-disk artifacts of one index
#[derive(Debug, Clone)]
pub struct IndexPersistence {
    base_path: PathBuf,
    name: String,
    dimension: VectorDimension,
}

impl IndexPersistence {
    /// Create a persistence manager for `<base_path>/<name>.*`
    pub fn new(base_path: impl Into<PathBuf>, name: impl Into<String>, dimension: VectorDimension) -> Self {
        Self {
            base_path: base_path.into(),
            name: name.into(),
            dimension,
        }
    }

    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    #[must_use]
    pub fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    #[must_use]
    pub fn vector_path(&self) -> PathBuf {
        self.base_path.join(format!("{}.vec", self.name))
    }

    #[must_use]
    pub fn metadata_path(&self) -> PathBuf {
        self.base_path.join(format!("{}.meta.json", self.name))
    }

    /// Check if a vector artifact exists
    #[must_use]
    pub fn exists(&self) -> bool {
        self.vector_path().exists()
    }

    /// Write both artifacts.
    #[must_use = "Save errors should be handled to ensure data is persisted"]
    pub fn save(&self, index: &FlatIndex, table: &MetadataTable) -> IndexResult<()> {
        std::fs::create_dir_all(&self.base_path)
            .map_err(|e| IndexError::unavailable(&self.base_path, e))?;

        let vector_path = self.vector_path();
        VectorFile::new(&vector_path)
            .write(index)
            .map_err(|e| IndexError::unavailable(&vector_path, e))?;

        let document = MetadataDocumentRef {
            version: METADATA_VERSION,
            dimension: index.dimension().get(),
            slot_count: index.len(),
            saved_at: Utc::now().timestamp() as u64,
            entries: table.entries(),
            item_slots: table.item_slots(),
        };
        let metadata_path = self.metadata_path();
        self.write_metadata(&document)
            .map_err(|e| IndexError::unavailable(&metadata_path, e))?;

        tracing::debug!(
            target: "stylevec::persistence",
            slots = index.len(),
            live = table.len(),
            path = %self.base_path.display(),
            "index saved"
        );
        Ok(())
    }

    fn write_metadata(&self, document: &MetadataDocumentRef<'_>) -> std::io::Result<()> {
        let mut temp = NamedTempFile::new_in(&self.base_path)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, document)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(self.metadata_path()).map_err(|e| e.error)?;
        Ok(())
    }

    /// Load the snapshot, degrading to an empty index on any problem.
    pub fn load(&self) -> IndexSnapshot {
        match self.try_load() {
            Ok(Some(snapshot)) => {
                tracing::info!(
                    target: "stylevec::persistence",
                    slots = snapshot.index.len(),
                    live = snapshot.table.len(),
                    path = %self.base_path.display(),
                    "loaded index"
                );
                snapshot
            }
            Ok(None) => {
                tracing::info!(
                    target: "stylevec::persistence",
                    path = %self.base_path.display(),
                    "no existing index found, starting fresh"
                );
                IndexSnapshot::empty(self.dimension)
            }
            Err(e) => {
                tracing::warn!(
                    target: "stylevec::persistence",
                    path = %self.base_path.display(),
                    "failed to load index, starting with an empty one: {e}"
                );
                IndexSnapshot::empty(self.dimension)
            }
        }
    }

    /// Load the snapshot strictly.
    ///
    /// Returns `Ok(None)` when no vector artifact exists and an error for
    /// anything that cannot be trusted.
    pub fn try_load(&self) -> IndexResult<Option<IndexSnapshot>> {
        let vector_path = self.vector_path();
        if !vector_path.exists() {
            return Ok(None);
        }

        let index = VectorFile::new(&vector_path)
            .read()
            .map_err(|e| IndexError::IndexCorrupted {
                reason: format!("{}: {e}", vector_path.display()),
            })?;
        if index.dimension() != self.dimension {
            return Err(IndexError::IndexCorrupted {
                reason: format!(
                    "stored dimension {} differs from configured dimension {}",
                    index.dimension(),
                    self.dimension
                ),
            });
        }

        let metadata_path = self.metadata_path();
        let json = std::fs::read_to_string(&metadata_path).map_err(|e| {
            IndexError::IndexCorrupted {
                reason: format!("cannot read {}: {e}", metadata_path.display()),
            }
        })?;
        let document: MetadataDocument =
            serde_json::from_str(&json).map_err(|e| IndexError::IndexCorrupted {
                reason: format!("cannot parse {}: {e}", metadata_path.display()),
            })?;

        if document.version != METADATA_VERSION {
            return Err(IndexError::IndexCorrupted {
                reason: format!(
                    "metadata version {} is not supported (expected {METADATA_VERSION})",
                    document.version
                ),
            });
        }
        if document.dimension != index.dimension().get() || document.slot_count > index.len() {
            return Err(IndexError::IndexCorrupted {
                reason: format!(
                    "metadata describes {} slots of dimension {}, vectors hold {} of dimension {}",
                    document.slot_count,
                    document.dimension,
                    index.len(),
                    index.dimension()
                ),
            });
        }

        let table = MetadataTable::from_parts(document.entries, document.item_slots);
        table
            .validate(document.slot_count)
            .map_err(|reason| IndexError::IndexCorrupted { reason })?;

        // Rows past the metadata's slot count come from a save whose metadata
        // write never landed; nothing references them.
        if index.len() > document.slot_count {
            tracing::warn!(
                target: "stylevec::persistence",
                "{} vector rows have no metadata, keeping them as orphaned slots",
                index.len() - document.slot_count
            );
        }

        tracing::debug!(
            target: "stylevec::persistence",
            saved_at = document.saved_at,
            "metadata snapshot accepted"
        );
        Ok(Some(IndexSnapshot { index, table }))
    }
}
