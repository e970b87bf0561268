//! Item records: the system of record the index is derived from.
//!
//! The index only needs a handful of fields from each record. Records are
//! looked up to find the image to embed for a query item and to rebuild the
//! index from scratch.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{IndexError, IndexResult};

/// One clothing item as known to the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: String,

    #[serde(alias = "user_id")]
    pub owner: String,

    pub category: String,

    #[serde(default, alias = "image_url", skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ItemRecord {
    pub fn new(id: impl Into<String>, owner: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
            category: category.into(),
            image_ref: None,
            name: None,
        }
    }

    #[must_use]
    pub fn with_image_ref(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Read access to item records.
pub trait ItemRecordStore: Send + Sync {
    /// Record with the given id.
    fn fetch_by_id(&self, id: &str) -> IndexResult<Option<ItemRecord>>;

    /// Records for the given ids; unknown ids are left out.
    fn fetch_by_ids(&self, ids: &[String]) -> IndexResult<Vec<ItemRecord>>;

    /// Every record, used to rebuild the index.
    fn fetch_all(&self) -> IndexResult<Vec<ItemRecord>>;
}

/// Records held in memory, ordered by id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    records: BTreeMap<String, ItemRecord>,
}

impl InMemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a record.
    pub fn insert(&mut self, record: ItemRecord) {
        self.records.insert(record.id.clone(), record);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<ItemRecord> for InMemoryRecordStore {
    fn from_iter<I: IntoIterator<Item = ItemRecord>>(iter: I) -> Self {
        let mut store = Self::new();
        for record in iter {
            store.insert(record);
        }
        store
    }
}

impl ItemRecordStore for InMemoryRecordStore {
    fn fetch_by_id(&self, id: &str) -> IndexResult<Option<ItemRecord>> {
        Ok(self.records.get(id).cloned())
    }

    fn fetch_by_ids(&self, ids: &[String]) -> IndexResult<Vec<ItemRecord>> {
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.records.get(id) {
                if !records.iter().any(|r: &ItemRecord| r.id == record.id) {
                    records.push(record.clone());
                }
            }
        }
        Ok(records)
    }

    fn fetch_all(&self) -> IndexResult<Vec<ItemRecord>> {
        Ok(self.records.values().cloned().collect())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    List(Vec<ItemRecord>),
    Wrapped { items: Vec<ItemRecord> },
}

/// Catalog exported to a JSON file.
///
/// Accepts either a bare array of records or `{"items": [...]}`. Relative
/// image references are resolved against the catalog's directory.
#[derive(Debug, Clone)]
pub struct JsonCatalogStore {
    path: PathBuf,
    records: InMemoryRecordStore,
}

impl JsonCatalogStore {
    pub fn open(path: impl Into<PathBuf>) -> IndexResult<Self> {
        let path = path.into();
        let json = std::fs::read_to_string(&path).map_err(|e| IndexError::unavailable(&path, e))?;
        let file: CatalogFile =
            serde_json::from_str(&json).map_err(|e| IndexError::Configuration {
                reason: format!("cannot parse catalog '{}': {e}", path.display()),
            })?;
        let items = match file {
            CatalogFile::List(items) | CatalogFile::Wrapped { items } => items,
        };

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let records = items
            .into_iter()
            .map(|mut record| {
                record.image_ref = record.image_ref.map(|r| resolve_image_ref(base, r));
                record
            })
            .collect::<InMemoryRecordStore>();

        tracing::debug!(
            target: "stylevec::records",
            count = records.len(),
            path = %path.display(),
            "catalog loaded"
        );
        Ok(Self { path, records })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn resolve_image_ref(base: &Path, image_ref: String) -> String {
    if image_ref.contains("://") || Path::new(&image_ref).is_absolute() {
        return image_ref;
    }
    base.join(&image_ref).to_string_lossy().into_owned()
}

impl ItemRecordStore for JsonCatalogStore {
    fn fetch_by_id(&self, id: &str) -> IndexResult<Option<ItemRecord>> {
        self.records.fetch_by_id(id)
    }

    fn fetch_by_ids(&self, ids: &[String]) -> IndexResult<Vec<ItemRecord>> {
        self.records.fetch_by_ids(ids)
    }

    fn fetch_all(&self) -> IndexResult<Vec<ItemRecord>> {
        self.records.fetch_all()
    }
}
