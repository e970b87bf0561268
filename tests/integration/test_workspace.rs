//! A configured workspace: settings file, catalog, precomputed embeddings.

use std::path::{Path, PathBuf};

use serde_json::json;
use stylevec::{AppContext, RecommendRequest, Settings};
use tempfile::TempDir;

use crate::common::WARDROBE;

fn write_workspace(root: &Path) -> Settings {
    let config_path = Settings::init_config_file_in(root, false).unwrap();
    assert!(Settings::init_config_file_in(root, false).is_err());

    let mut images = serde_json::Map::new();
    let mut items = Vec::new();
    for (id, owner, category, vector) in WARDROBE {
        let relative = format!("images/{id}.jpg");
        let absolute = root.join(&relative).to_string_lossy().into_owned();
        images.insert(absolute, json!(vector));
        items.push(json!({
            "id": id,
            "owner": owner,
            "category": category,
            "image_ref": relative,
        }));
    }
    items.push(json!({"id": "no-image", "owner": "u1", "category": "hat"}));

    std::fs::write(
        root.join("embeddings.json"),
        serde_json::to_vec(&json!({ "images": images })).unwrap(),
    )
    .unwrap();
    std::fs::write(
        root.join("catalog.json"),
        serde_json::to_vec(&json!({ "items": items })).unwrap(),
    )
    .unwrap();

    let mut settings = Settings::load_from(&config_path).unwrap();
    settings.workspace_root = Some(root.to_path_buf());
    settings.index.dimension = 4;
    settings.embedding.precomputed_path = Some(PathBuf::from("embeddings.json"));
    settings.records.catalog_path = Some(PathBuf::from("catalog.json"));
    settings
}

#[test]
fn template_loads_with_defaults() {
    let dir = TempDir::new().unwrap();
    let path = Settings::init_config_file_in(dir.path(), false).unwrap();
    let settings = Settings::load_from(&path).unwrap();

    assert_eq!(settings.index.name, "wardrobe");
    assert_eq!(settings.index.dimension, 512);
    assert_eq!(settings.search.oversample_factor, 5);
    assert_eq!(settings.outfit.k_per_category, 3);
    assert!(settings.validate().is_ok());

    assert!(Settings::init_config_file_in(dir.path(), true).is_ok());
}

#[test]
fn workspace_reindexes_and_reopens() {
    let dir = TempDir::new().unwrap();
    let settings = write_workspace(dir.path());

    let context = AppContext::from_settings(&settings).unwrap();
    let report = context.reindex_from_records().unwrap();
    assert_eq!(report.total, WARDROBE.len() + 1);
    assert_eq!(report.processed, WARDROBE.len());
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);

    let request = RecommendRequest::new("t1", "u1").min_similarity(0.0);
    let before = context.recommend(&request).unwrap();
    let stats_before = context.stats();
    assert!(stats_before.records_configured);
    drop(context);

    assert!(settings.index_dir().join("wardrobe.vec").exists());
    assert!(settings.index_dir().join("wardrobe.meta.json").exists());

    let reopened = AppContext::from_settings(&settings).unwrap();
    assert_eq!(reopened.recommend(&request).unwrap(), before);
    assert_eq!(reopened.stats().index, stats_before.index);
}

#[test]
fn dimension_mismatch_is_a_configuration_error() {
    let dir = TempDir::new().unwrap();
    let mut settings = write_workspace(dir.path());
    settings.index.dimension = 8;

    let err = AppContext::from_settings(&settings).unwrap_err();
    assert_eq!(err.kind(), stylevec::ErrorKind::Configuration);
}
