//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::Rng;
use rand::rngs::StdRng;
use stylevec::{
    AppContext, InMemoryRecordStore, IndexPersistence, ItemMetadata, ItemRecord,
    PrecomputedEmbedder, VectorDimension, VectorStore,
};
use tempfile::TempDir;

pub const OWNERS: [&str; 3] = ["u1", "u2", "u3"];
pub const CATEGORIES: [&str; 5] = ["top", "bottom", "shoes", "outerwear", "dress"];

/// An on-disk index in its own temporary directory.
pub struct TestIndex {
    pub dir: TempDir,
    pub dimension: VectorDimension,
}

impl TestIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
            dimension: VectorDimension::new(dimension).expect("Invalid dimension"),
        }
    }

    pub fn index_dir(&self) -> PathBuf {
        self.dir.path().join("index")
    }

    pub fn persistence(&self) -> IndexPersistence {
        IndexPersistence::new(self.index_dir(), "wardrobe", self.dimension)
    }

    /// Opens (or reopens) the store from disk.
    pub fn open(&self) -> VectorStore {
        VectorStore::open(self.persistence())
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// A random vector with components in [-1, 1].
pub fn random_vector(rng: &mut StdRng, dimension: usize) -> Vec<f32> {
    (0..dimension).map(|_| rng.random_range(-1.0..=1.0)).collect()
}

/// Fills a store with `count` random items spread across owners and categories.
pub fn populate(store: &mut VectorStore, rng: &mut StdRng, count: usize) -> Vec<String> {
    let dimension = store.dimension().get();
    (0..count)
        .map(|i| {
            let item_id = format!("item-{i}");
            let owner = OWNERS[rng.random_range(0..OWNERS.len())];
            let category = CATEGORIES[rng.random_range(0..CATEGORIES.len())];
            store
                .add(
                    &random_vector(rng, dimension),
                    ItemMetadata::new(&item_id, owner, category),
                )
                .expect("Failed to add item");
            item_id
        })
        .collect()
}

/// Unit vector along `axis`, slightly tilted towards the next axis.
pub fn near_axis(dimension: usize, axis: usize, tilt: f32) -> Vec<f32> {
    let mut vector = vec![0.0; dimension];
    vector[axis % dimension] = 1.0;
    vector[(axis + 1) % dimension] = tilt;
    vector
}

/// Image reference, owner, category and embedding of the sample wardrobe.
pub const WARDROBE: [(&str, &str, &str, [f32; 4]); 6] = [
    ("t1", "u1", "top", [1.0, 0.0, 0.0, 0.0]),
    ("b1", "u1", "bottom", [0.9, 0.435_889_9, 0.0, 0.0]),
    ("s1", "u1", "shoes", [0.7, 0.0, 0.714_142_8, 0.0]),
    ("s2", "u1", "shoes", [0.2, 0.0, 0.979_795_9, 0.0]),
    ("b2", "u2", "bottom", [1.0, 0.0, 0.0, 0.0]),
    ("t2", "u2", "top", [0.0, 0.0, 0.0, 1.0]),
];

/// Deterministic embedder and catalog for the sample wardrobe.
pub fn wardrobe_parts() -> (PrecomputedEmbedder, InMemoryRecordStore) {
    let mut embedder = PrecomputedEmbedder::new(VectorDimension::new(4).unwrap());
    let mut records = InMemoryRecordStore::new();
    for (id, owner, category, vector) in WARDROBE {
        let image_ref = format!("/wardrobe/{id}.jpg");
        embedder.insert_image(&image_ref, vector.to_vec()).unwrap();
        records.insert(ItemRecord::new(id, owner, category).with_image_ref(image_ref));
    }
    embedder
        .insert_text("strappy sandals", vec![0.1, 0.0, 1.0, 0.0])
        .unwrap();
    (embedder, records)
}

/// In-memory context with the sample wardrobe indexed.
pub fn wardrobe_context() -> AppContext {
    let (embedder, records) = wardrobe_parts();
    let context = AppContext::new(
        VectorStore::in_memory(VectorDimension::new(4).unwrap()),
        Arc::new(embedder),
        Some(Arc::new(records)),
    )
    .expect("Failed to build context");
    let report = context.reindex_from_records().expect("Failed to reindex");
    assert_eq!(report.processed, WARDROBE.len());
    context
}
