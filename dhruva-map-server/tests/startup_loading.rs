//! Startup map loading.
//!
//! The daemon loads every configured map before serving anything; one bad
//! map must abort the whole startup.
//!
//! Run with: `cargo test --test startup_loading`

mod common;

use dhruva_map_server::error::{DescriptorError, RasterizeError};
use dhruva_map_server::{Error, MapSource, load_all};
use tempfile::TempDir;

use common::write_free_map;

#[test]
fn test_all_sources_load_in_order() {
    let dir = TempDir::new().unwrap();
    let sources = vec![
        MapSource::yaml(write_free_map(dir.path(), "kitchen", 3)),
        MapSource::yaml(write_free_map(dir.path(), "hall", 4)),
    ];

    let entries = load_all(&sources, "map").unwrap();
    let ids: Vec<_> = entries.iter().map(|e| e.id()).collect();
    assert_eq!(ids, vec!["kitchen", "hall"]);
    assert_eq!(entries[1].grid().width(), 4);
    assert!(entries.iter().all(|e| e.frame_id() == "map"));
}

#[test]
fn test_missing_descriptor_aborts_startup() {
    let dir = TempDir::new().unwrap();
    let sources = vec![
        MapSource::yaml(write_free_map(dir.path(), "kitchen", 3)),
        MapSource::yaml(dir.path().join("garage.yaml")),
    ];

    let err = load_all(&sources, "map").unwrap_err();
    assert!(matches!(err, Error::Descriptor(DescriptorError::Io { .. })));
}

#[test]
fn test_corrupt_image_aborts_startup() {
    let dir = TempDir::new().unwrap();
    let good = write_free_map(dir.path(), "kitchen", 3);
    let bad = write_free_map(dir.path(), "hall", 3);
    std::fs::write(dir.path().join("hall.png"), b"not an image").unwrap();

    let err = load_all(&[MapSource::yaml(good), MapSource::yaml(bad)], "map").unwrap_err();
    assert!(matches!(err, Error::Rasterize(RasterizeError::Image { .. })));
}

#[test]
fn test_empty_source_list_is_config_error() {
    let err = load_all(&[], "map").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}
