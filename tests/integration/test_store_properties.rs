//! Behavioural properties of the vector store.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stylevec::vector::math::{inner_product, l2_norm, normalized};
use stylevec::{ItemMetadata, SearchFilter, VectorDimension, VectorStore};

use crate::common::{CATEGORIES, OWNERS, populate, random_vector};

const DIM: usize = 16;

fn store() -> VectorStore {
    VectorStore::in_memory(VectorDimension::new(DIM).unwrap())
}

#[test]
fn normalization_is_idempotent_and_self_similar() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..50 {
        let vector = random_vector(&mut rng, DIM);
        let once = normalized(&vector);
        let twice = normalized(&once);

        assert!((l2_norm(&once) - 1.0).abs() < 1e-5);
        for (a, b) in once.iter().zip(&twice) {
            assert!((a - b).abs() < 1e-6);
        }
        assert!((inner_product(&once, &once) - 1.0).abs() < 1e-5);
    }
}

#[test]
fn added_item_is_found_by_its_own_vector() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut store = store();
    populate(&mut store, &mut rng, 30);

    let vector = random_vector(&mut rng, DIM);
    let slot = store
        .add(&vector, ItemMetadata::new("probe", "u9", "hat"))
        .unwrap();

    let (found_slot, metadata) = store.get("probe").unwrap();
    assert_eq!(found_slot, slot);
    assert_eq!(metadata.owner, "u9");

    let hits = store
        .search(&vector, 1, &SearchFilter::new().min_similarity(-1.0))
        .unwrap();
    assert_eq!(hits[0].metadata.item_id, "probe");
    assert!((hits[0].similarity - 1.0).abs() < 1e-4);
}

#[test]
fn re_add_supersedes_without_growing_live_count() {
    let mut rng = StdRng::seed_from_u64(13);
    let mut store = store();
    populate(&mut store, &mut rng, 10);
    let live_before = store.len();
    let slots_before = store.total_slots();

    let new_vector = random_vector(&mut rng, DIM);
    let slot = store
        .add(&new_vector, ItemMetadata::new("item-3", "u1", "shoes"))
        .unwrap();

    assert_eq!(store.len(), live_before);
    assert_eq!(store.total_slots(), slots_before + 1);
    assert_eq!(store.get("item-3").unwrap().0, slot);
    assert_eq!(store.get("item-3").unwrap().1.category, "shoes");

    // Only the new vector answers for the item.
    let hits = store
        .search(&new_vector, 50, &SearchFilter::new().min_similarity(-1.0))
        .unwrap();
    assert_eq!(
        hits.iter()
            .filter(|h| h.metadata.item_id == "item-3")
            .count(),
        1
    );
    assert_eq!(hits[0].slot, slot);
}

#[test]
fn removal_is_terminal() {
    let mut rng = StdRng::seed_from_u64(17);
    let mut store = store();
    let ids = populate(&mut store, &mut rng, 20);

    assert!(store.remove(&ids[5]).unwrap());
    assert!(!store.remove(&ids[5]).unwrap());
    assert!(!store.contains(&ids[5]));

    for _ in 0..20 {
        let hits = store
            .search(
                &random_vector(&mut rng, DIM),
                20,
                &SearchFilter::new().min_similarity(-1.0),
            )
            .unwrap();
        assert!(hits.iter().all(|h| h.metadata.item_id != ids[5]));
    }
}

#[test]
fn every_result_satisfies_every_filter() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut store = store();
    let ids = populate(&mut store, &mut rng, 200);

    for _ in 0..200 {
        let mut filter = SearchFilter::new().min_similarity(rng.random_range(-0.5..0.5));
        if rng.random::<bool>() {
            filter = filter.owner(OWNERS[rng.random_range(0..OWNERS.len())]);
        }
        if rng.random::<bool>() {
            let count = rng.random_range(1..=3);
            let categories: Vec<&str> = (0..count)
                .map(|_| CATEGORIES[rng.random_range(0..CATEGORIES.len())])
                .collect();
            filter = filter.categories(categories);
        }
        if rng.random::<bool>() {
            filter = filter.exclude(ids[rng.random_range(0..ids.len())].clone());
        }
        let k = rng.random_range(1..=15);

        let hits = store
            .search(&random_vector(&mut rng, DIM), k, &filter)
            .unwrap();

        assert!(hits.len() <= k);
        assert!(hits.windows(2).all(|w| w[0].similarity >= w[1].similarity));
        let mut seen = std::collections::HashSet::new();
        for hit in &hits {
            assert!(seen.insert(hit.metadata.item_id.clone()), "duplicate item");
            assert!(hit.similarity >= filter.min_similarity);
            if let Some(owner) = &filter.owner {
                assert_eq!(&hit.metadata.owner, owner);
            }
            if let Some(categories) = &filter.categories {
                assert!(categories.contains(&hit.metadata.category));
            }
            if let Some(excluded) = &filter.exclude_item_id {
                assert_ne!(&hit.metadata.item_id, excluded);
            }
        }
    }
}

#[test]
fn result_count_never_exceeds_k_or_live_items() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut store = store();
    populate(&mut store, &mut rng, 12);

    for k in [1, 3, 12, 40] {
        let hits = store
            .search(
                &random_vector(&mut rng, DIM),
                k,
                &SearchFilter::new().min_similarity(-1.0),
            )
            .unwrap();
        assert_eq!(hits.len(), k.min(12));
    }
}

#[test]
fn near_orthogonal_wardrobe_ranks_by_similarity() {
    let mut store = VectorStore::in_memory(VectorDimension::new(4).unwrap());
    store
        .add(&[1.0, 0.0, 0.0, 0.0], ItemMetadata::new("x", "u1", "top"))
        .unwrap();
    store
        .add(&[0.8, 0.6, 0.0, 0.0], ItemMetadata::new("y", "u1", "bottom"))
        .unwrap();
    store
        .add(&[0.6, 0.0, 0.8, 0.0], ItemMetadata::new("z", "u1", "shoes"))
        .unwrap();

    let filter = SearchFilter::new().owner("u1").exclude("x").min_similarity(0.0);
    let hits = store.search(&[1.0, 0.0, 0.0, 0.0], 10, &filter).unwrap();

    let ids: Vec<&str> = hits.iter().map(|h| h.metadata.item_id.as_str()).collect();
    assert_eq!(ids, vec!["y", "z"]);
    assert!((hits[0].similarity - 0.8).abs() < 1e-5);
    assert!((hits[1].similarity - 0.6).abs() < 1e-5);
}

#[test]
fn empty_store_searches_and_reports_zero() {
    let store = store();
    let hits = store
        .search(&vec![0.5; DIM], 5, &SearchFilter::new().owner("u1"))
        .unwrap();
    assert!(hits.is_empty());

    let stats = store.stats();
    assert_eq!(stats.live_items, 0);
    assert_eq!(stats.total_slots, 0);
    assert_eq!(stats.unique_owners, 0);
    assert!(stats.categories.is_empty());
}

#[test]
fn tight_oversampling_can_under_fill() {
    // Filters run after candidate selection; with oversample 1 the three
    // nearest rows all belong to u2, so u1 gets nothing back.
    let mut store = VectorStore::in_memory(VectorDimension::new(2).unwrap()).with_tuning(
        stylevec::SearchTuning {
            oversample_factor: 1,
            fallback_candidates: 100,
        },
    );
    for i in 0..3 {
        store
            .add(&[1.0, 0.01 * i as f32], ItemMetadata::new(format!("b{i}"), "u2", "top"))
            .unwrap();
    }
    store
        .add(&[0.0, 1.0], ItemMetadata::new("a", "u1", "top"))
        .unwrap();

    let filter = SearchFilter::new().owner("u1").min_similarity(-1.0);
    assert!(store.search(&[1.0, 0.0], 3, &filter).unwrap().is_empty());
    assert_eq!(store.search(&[1.0, 0.0], 4, &filter).unwrap().len(), 1);
}
