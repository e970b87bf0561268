//! Index artifacts survive a reopen and degrade to empty when damaged.

use rand::SeedableRng;
use rand::rngs::StdRng;
use stylevec::vector::VectorFile;
use stylevec::{ItemMetadata, SearchFilter};

use crate::common::{TestIndex, populate, random_vector};

const DIM: usize = 24;

fn any_filter() -> SearchFilter {
    SearchFilter::new().min_similarity(-1.0)
}

#[test]
fn reopened_store_answers_identically() {
    let test_index = TestIndex::new(DIM);
    let mut rng = StdRng::seed_from_u64(99);

    let mut store = test_index.open();
    let ids = populate(&mut store, &mut rng, 40);
    store.remove(&ids[0]).unwrap();
    store.remove(&ids[17]).unwrap();
    store
        .add(
            &random_vector(&mut rng, DIM),
            ItemMetadata::new(&ids[3], "u1", "shoes").with_image_ref("/img/3.jpg"),
        )
        .unwrap();

    let queries: Vec<Vec<f32>> = (0..10).map(|_| random_vector(&mut rng, DIM)).collect();
    let before: Vec<_> = queries
        .iter()
        .map(|q| store.search(q, 8, &any_filter()).unwrap())
        .collect();
    let stats_before = store.stats();
    drop(store);

    let reopened = test_index.open();
    let after: Vec<_> = queries
        .iter()
        .map(|q| reopened.search(q, 8, &any_filter()).unwrap())
        .collect();

    assert_eq!(before, after);
    assert_eq!(reopened.stats(), stats_before);
    assert_eq!(reopened.total_slots(), 41);
    assert_eq!(reopened.len(), 38);
    assert_eq!(
        reopened.get(&ids[3]).unwrap().1.image_ref.as_deref(),
        Some("/img/3.jpg")
    );
}

#[test]
fn slot_counter_continues_after_reopen() {
    let test_index = TestIndex::new(DIM);
    let mut rng = StdRng::seed_from_u64(3);

    let mut store = test_index.open();
    populate(&mut store, &mut rng, 5);
    store.remove("item-4").unwrap();
    drop(store);

    let mut reopened = test_index.open();
    let slot = reopened
        .add(&random_vector(&mut rng, DIM), ItemMetadata::new("late", "u2", "top"))
        .unwrap();
    assert_eq!(slot.get(), 5);
}

#[test]
fn missing_metadata_opens_empty() {
    let test_index = TestIndex::new(DIM);
    let mut rng = StdRng::seed_from_u64(21);

    let mut store = test_index.open();
    populate(&mut store, &mut rng, 6);
    drop(store);

    std::fs::remove_file(test_index.persistence().metadata_path()).unwrap();

    let reopened = test_index.open();
    assert!(reopened.is_empty());
    assert_eq!(reopened.total_slots(), 0);
    assert!(
        reopened
            .search(&random_vector(&mut rng, DIM), 5, &any_filter())
            .unwrap()
            .is_empty()
    );
}

#[test]
fn corrupt_metadata_opens_empty() {
    let test_index = TestIndex::new(DIM);
    let mut rng = StdRng::seed_from_u64(22);

    let mut store = test_index.open();
    populate(&mut store, &mut rng, 6);
    drop(store);

    std::fs::write(test_index.persistence().metadata_path(), b"{ not json").unwrap();

    let reopened = test_index.open();
    assert!(reopened.is_empty());
    assert!(test_index.persistence().try_load().is_err());
}

#[test]
fn vector_rows_without_metadata_keep_committed_items() {
    let test_index = TestIndex::new(DIM);
    let mut rng = StdRng::seed_from_u64(24);

    let mut store = test_index.open();
    store
        .add(&random_vector(&mut rng, DIM), ItemMetadata::new("a", "u1", "top"))
        .unwrap();
    store
        .add(&random_vector(&mut rng, DIM), ItemMetadata::new("b", "u1", "shoes"))
        .unwrap();
    drop(store);

    // A save that wrote the vector file but not the metadata.
    let vector_file = VectorFile::new(test_index.persistence().vector_path());
    let mut index = vector_file.read().unwrap();
    index.push(&random_vector(&mut rng, DIM)).unwrap();
    vector_file.write(&index).unwrap();

    let mut reopened = test_index.open();
    assert_eq!(reopened.len(), 2);
    assert!(reopened.contains("a"));
    assert!(reopened.contains("b"));
    assert_eq!(reopened.total_slots(), 3);
    assert_eq!(reopened.stats().orphaned_slots, 1);

    let slot = reopened
        .add(&random_vector(&mut rng, DIM), ItemMetadata::new("c", "u2", "top"))
        .unwrap();
    assert_eq!(slot.get(), 3);
}

#[test]
fn truncated_vector_file_opens_empty() {
    let test_index = TestIndex::new(DIM);
    let mut rng = StdRng::seed_from_u64(23);

    let mut store = test_index.open();
    populate(&mut store, &mut rng, 6);
    drop(store);

    let vector_path = test_index.persistence().vector_path();
    let bytes = std::fs::read(&vector_path).unwrap();
    std::fs::write(&vector_path, &bytes[..bytes.len() - 7]).unwrap();

    assert!(test_index.open().is_empty());
}

#[test]
fn compaction_preserves_live_results() {
    let test_index = TestIndex::new(DIM);
    let mut rng = StdRng::seed_from_u64(31);

    let mut store = test_index.open();
    let ids = populate(&mut store, &mut rng, 30);
    for id in ids.iter().step_by(3) {
        store.remove(id).unwrap();
    }

    let queries: Vec<Vec<f32>> = (0..10).map(|_| random_vector(&mut rng, DIM)).collect();
    let summarize = |hits: Vec<stylevec::SearchHit>| -> Vec<(String, f32)> {
        hits.into_iter()
            .map(|h| (h.metadata.item_id, h.similarity))
            .collect()
    };
    let before: Vec<_> = queries
        .iter()
        .map(|q| summarize(store.search(q, 6, &any_filter()).unwrap()))
        .collect();

    let report = store.compact().unwrap();
    assert_eq!(report.slots_before, 30);
    assert_eq!(report.slots_after, 20);
    assert_eq!(report.reclaimed, 10);

    let after: Vec<_> = queries
        .iter()
        .map(|q| summarize(store.search(q, 6, &any_filter()).unwrap()))
        .collect();
    assert_eq!(before, after);
    drop(store);

    // The compacted layout is what got persisted.
    let reopened = test_index.open();
    assert_eq!(reopened.total_slots(), 20);
    assert_eq!(reopened.stats().orphaned_slots, 0);
    let reopened_results: Vec<_> = queries
        .iter()
        .map(|q| summarize(reopened.search(q, 6, &any_filter()).unwrap()))
        .collect();
    assert_eq!(before, reopened_results);
}

#[test]
fn failed_save_leaves_store_unchanged() {
    let test_index = TestIndex::new(DIM);
    let mut rng = StdRng::seed_from_u64(41);

    // A regular file where the index directory should go makes every save fail.
    std::fs::write(test_index.index_dir(), b"occupied").unwrap();
    let mut store = test_index.open();
    assert!(store.is_empty());

    let result = store.add(
        &random_vector(&mut rng, DIM),
        ItemMetadata::new("a", "u1", "top"),
    );
    assert!(result.is_err());
    assert!(store.is_empty());
    assert_eq!(store.total_slots(), 0);
    assert!(!store.contains("a"));
}
