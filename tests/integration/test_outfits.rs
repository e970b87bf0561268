//! Outfit completion around base items.

use std::collections::BTreeMap;
use std::sync::Arc;

use stylevec::{AppContext, ErrorKind, ItemRecord, VectorDimension, VectorStore};

use crate::common::{wardrobe_context, wardrobe_parts};

/// Sample wardrobe plus catalog records whose images cannot be embedded.
fn context_with_unembeddable_records() -> AppContext {
    let (embedder, mut records) = wardrobe_parts();
    records.insert(
        ItemRecord::new("mystery", "u1", "dress").with_image_ref("/wardrobe/missing.jpg"),
    );
    records.insert(ItemRecord::new("bare", "u1", "dress"));

    let context = AppContext::new(
        VectorStore::in_memory(VectorDimension::new(4).unwrap()),
        Arc::new(embedder),
        Some(Arc::new(records)),
    )
    .unwrap();
    let report = context.reindex_from_records().unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 1);
    context
}

fn summary(outfit: &BTreeMap<String, Vec<stylevec::SearchHit>>) -> BTreeMap<&str, Vec<&str>> {
    outfit
        .iter()
        .map(|(category, hits)| {
            (
                category.as_str(),
                hits.iter().map(|h| h.metadata.item_id.as_str()).collect(),
            )
        })
        .collect()
}

#[test]
fn outfit_fills_missing_categories() {
    let context = wardrobe_context();
    let outfit = context
        .recommend_outfit(&["t1".to_string()], "u1", 3)
        .unwrap();

    let expected: BTreeMap<&str, Vec<&str>> = [
        ("bottom", vec!["b1"]),
        ("outerwear", vec![]),
        ("shoes", vec!["s1"]),
    ]
    .into_iter()
    .collect();
    assert_eq!(summary(&outfit), expected);
}

#[test]
fn base_categories_never_appear() {
    let context = wardrobe_context();
    let outfit = context
        .recommend_outfit(&["t1".to_string(), "b1".to_string()], "u1", 5)
        .unwrap();

    assert!(!outfit.contains_key("top"));
    assert!(!outfit.contains_key("bottom"));
    for (category, hits) in &outfit {
        for hit in hits {
            assert_eq!(&hit.metadata.category, category);
            assert_eq!(hit.metadata.owner, "u1");
            assert!(hit.similarity >= 0.5);
        }
    }
}

#[test]
fn base_items_from_another_owner_shape_the_style() {
    let context = wardrobe_context();
    let outfit = context
        .recommend_outfit(&["b2".to_string()], "u1", 2)
        .unwrap();

    assert_eq!(summary(&outfit)["top"], vec!["t1"]);
    assert_eq!(summary(&outfit)["shoes"], vec!["s1"]);
}

#[test]
fn per_category_results_are_bounded() {
    let context = wardrobe_context();
    let outfit = context
        .recommend_outfit(&["b1".to_string()], "u1", 1)
        .unwrap();
    assert!(outfit.values().all(|hits| hits.len() <= 1));
}

#[test]
fn unknown_base_items_are_not_found() {
    let context = wardrobe_context();
    let err = context
        .recommend_outfit(&["ghost".to_string()], "u1", 3)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn invalid_outfit_requests_are_rejected() {
    let context = wardrobe_context();
    for (ids, owner, k) in [
        (vec![], "u1", 3),
        (vec!["t1".to_string()], "", 3),
        (vec!["t1".to_string()], "u1", 0),
    ] {
        let err = context.recommend_outfit(&ids, owner, k).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}

#[test]
fn outfits_need_a_record_store() {
    let (embedder, _) = wardrobe_parts();
    let context = AppContext::new(
        VectorStore::in_memory(VectorDimension::new(4).unwrap()),
        Arc::new(embedder),
        None,
    )
    .unwrap();
    let err = context
        .recommend_outfit(&["t1".to_string()], "u1", 3)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn unembeddable_base_items_are_skipped() {
    let context = context_with_unembeddable_records();

    let mixed = context
        .recommend_outfit(
            &["t1".to_string(), "mystery".to_string(), "bare".to_string()],
            "u1",
            3,
        )
        .unwrap();
    let alone = context
        .recommend_outfit(&["t1".to_string()], "u1", 3)
        .unwrap();

    // Only t1 shapes the style; dress adds no targets beyond top's.
    assert_eq!(mixed, alone);
    assert_eq!(summary(&mixed)["bottom"], vec!["b1"]);
    assert!((mixed["bottom"][0].similarity - 0.9).abs() < 1e-4);
}

#[test]
fn no_embeddable_base_item_is_not_found() {
    let context = context_with_unembeddable_records();
    let err = context
        .recommend_outfit(&["mystery".to_string(), "bare".to_string()], "u1", 3)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
