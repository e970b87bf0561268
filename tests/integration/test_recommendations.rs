//! Item recommendations and text search through the application context.

use std::sync::Arc;

use stylevec::{
    AppContext, ErrorKind, ItemUpload, RecommendRequest, TextQuery, VectorDimension, VectorStore,
};

use crate::common::{wardrobe_context, wardrobe_parts};

fn ids(hits: &[stylevec::SearchHit]) -> Vec<&str> {
    hits.iter().map(|h| h.metadata.item_id.as_str()).collect()
}

#[test]
fn recommends_owner_items_by_similarity() {
    let context = wardrobe_context();

    let hits = context
        .recommend(&RecommendRequest::new("t1", "u1").min_similarity(0.0))
        .unwrap();

    assert_eq!(ids(&hits), vec!["b1", "s1", "s2"]);
    assert!((hits[0].similarity - 0.9).abs() < 1e-4);
    assert!((hits[1].similarity - 0.7).abs() < 1e-4);
    assert!((hits[2].similarity - 0.2).abs() < 1e-4);
}

#[test]
fn default_floor_drops_weak_matches() {
    let context = wardrobe_context();
    let hits = context.recommend(&RecommendRequest::new("t1", "u1")).unwrap();
    assert_eq!(ids(&hits), vec!["b1", "s1"]);
}

#[test]
fn target_categories_restrict_results() {
    let context = wardrobe_context();
    let hits = context
        .recommend(
            &RecommendRequest::new("t1", "u1")
                .target_categories(["shoes"])
                .min_similarity(0.0)
                .k(1),
        )
        .unwrap();
    assert_eq!(ids(&hits), vec!["s1"]);
}

#[test]
fn other_owners_items_are_never_recommended() {
    let context = wardrobe_context();
    let hits = context
        .recommend(&RecommendRequest::new("b2", "u1").min_similarity(-1.0))
        .unwrap();
    assert!(hits.iter().all(|h| h.metadata.owner == "u1"));
    assert_eq!(hits[0].metadata.item_id, "t1");
}

#[test]
fn unknown_item_is_not_found() {
    let context = wardrobe_context();
    let err = context
        .recommend(&RecommendRequest::new("ghost", "u1"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn request_image_is_used_without_catalog() {
    let (embedder, _) = wardrobe_parts();
    let context = AppContext::new(
        VectorStore::in_memory(VectorDimension::new(4).unwrap()),
        Arc::new(embedder),
        None,
    )
    .unwrap();
    for (id, owner, category) in [("b1", "u1", "bottom"), ("s1", "u1", "shoes")] {
        context
            .ingest(ItemUpload::new(id, owner, category, format!("/wardrobe/{id}.jpg")))
            .unwrap();
    }

    let hits = context
        .recommend(&RecommendRequest::new("new-top", "u1").image_ref("/wardrobe/t1.jpg"))
        .unwrap();
    assert_eq!(ids(&hits), vec!["b1", "s1"]);

    let err = context
        .recommend(&RecommendRequest::new("new-top", "u1"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn invalid_requests_are_rejected() {
    let context = wardrobe_context();
    let invalid = [
        RecommendRequest::new("", "u1"),
        RecommendRequest::new("t1", " "),
        RecommendRequest::new("t1", "u1").k(0),
        RecommendRequest::new("t1", "u1").min_similarity(1.5),
        RecommendRequest::new("t1", "u1").min_similarity(f32::NAN),
        RecommendRequest::new("t1", "u1").target_categories(Vec::<String>::new()),
    ];
    for request in &invalid {
        let err = context.recommend(request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput, "{request:?}");
    }
}

#[test]
fn text_search_ranks_by_description() {
    let context = wardrobe_context();
    let mut query = TextQuery::new("strappy sandals");
    query.owner = Some("u1".to_string());
    query.categories = Some(vec!["shoes".to_string()]);

    let hits = context.search_by_text(&query).unwrap();
    assert_eq!(ids(&hits), vec!["s2", "s1"]);

    let unknown = context.search_by_text(&TextQuery::new("velvet cape")).unwrap_err();
    assert_eq!(unknown.kind(), ErrorKind::Embedding);
}

#[test]
fn ingest_then_remove_round_trip() {
    let context = wardrobe_context();

    let outcome = context
        .ingest(
            ItemUpload::new("t1", "u1", "top", "/wardrobe/t2.jpg").with_name("Linen shirt"),
        )
        .unwrap();
    assert_eq!(outcome.metadata.name, "Linen shirt");
    assert_eq!(outcome.dimension, 4);

    let stats = context.stats();
    assert_eq!(stats.index.live_items, 6);
    assert_eq!(stats.index.orphaned_slots, 1);
    assert!(stats.records_configured);

    assert!(context.remove("t1").unwrap());
    assert!(!context.remove("t1").unwrap());
    let hits = context
        .recommend(&RecommendRequest::new("b1", "u1").min_similarity(-1.0))
        .unwrap();
    assert!(hits.iter().all(|h| h.metadata.item_id != "t1"));

    let report = context.compact().unwrap();
    assert_eq!(report.reclaimed, 2);
    assert_eq!(context.stats().index.total_slots, 5);
}

#[test]
fn embedder_dimension_must_match_store() {
    let (embedder, _) = wardrobe_parts();
    let err = AppContext::new(
        VectorStore::in_memory(VectorDimension::new(8).unwrap()),
        Arc::new(embedder),
        None,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}
