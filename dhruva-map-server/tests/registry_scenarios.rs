//! Registry behaviour tests.
//!
//! Exercises the registry through the public API, with maps coming either
//! from in-memory grids or from image fixtures on disk:
//! - Load/replace semantics and event counts
//! - Switch success and failure
//! - Concurrent serve while switching
//! - The kitchen/hall end-to-end scenario
//!
//! Run with: `cargo test --test registry_scenarios`

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::Receiver;
use dhruva_map_server::registry::ChannelSink;
use dhruva_map_server::{MapRegistry, RegistryError, RegistryEvent, SwitchOutcome};
use tempfile::TempDir;

use common::{BLACK, GRAY, WHITE, is_consistent, load, uniform_entry, write_free_map, write_map};

fn registry_with_events() -> (MapRegistry, Receiver<RegistryEvent>) {
    let (sink, rx) = ChannelSink::unbounded();
    (MapRegistry::with_sink(Arc::new(sink)), rx)
}

fn count_events(rx: &Receiver<RegistryEvent>) -> (usize, usize) {
    rx.try_iter().fold((0, 0), |(meta, switched), event| match event {
        RegistryEvent::MetadataChanged(_) => (meta + 1, switched),
        RegistryEvent::MapSwitched(_) => (meta, switched + 1),
    })
}

// ============================================================================
// Load semantics
// ============================================================================

#[test]
fn test_distinct_loads_keep_latest_entries() {
    let registry = MapRegistry::new();
    let ids = ["a", "b", "c", "d"];
    for (i, id) in ids.iter().enumerate() {
        registry.load(*id, uniform_entry(id, 2 + i as u32, 2, 0));
    }
    // Replace "b" with different content
    registry.load("b", uniform_entry("b", 7, 7, 100));

    assert_eq!(registry.ids(), vec!["a", "b", "c", "d"]);
    for (i, id) in ids.iter().enumerate() {
        let entry = registry.get(id).unwrap();
        let expected_width = if *id == "b" { 7 } else { 2 + i as u32 };
        assert_eq!(entry.grid().width(), expected_width, "map {}", id);
    }
    assert_eq!(registry.active_id().as_deref(), Some("a"));
}

#[test]
fn test_reload_active_emits_single_metadata_event() {
    let (registry, rx) = registry_with_events();
    registry.load("kitchen", uniform_entry("kitchen", 3, 3, 0));
    assert_eq!(count_events(&rx), (1, 1));

    registry.load("kitchen", uniform_entry("kitchen", 6, 6, 100));
    assert_eq!(count_events(&rx), (1, 1));

    let served = registry.serve().unwrap();
    assert_eq!(served.id(), "kitchen");
    assert_eq!(served.grid().width(), 6);
    assert!(served.grid().cells().iter().all(|&c| c == 100));
}

#[test]
fn test_loading_inactive_map_is_silent() {
    let (registry, rx) = registry_with_events();
    registry.load("kitchen", uniform_entry("kitchen", 3, 3, 0));
    count_events(&rx);

    registry.load("hall", uniform_entry("hall", 4, 4, 0));
    registry.load("hall", uniform_entry("hall", 5, 5, 0));
    assert_eq!(count_events(&rx), (0, 0));
}

// ============================================================================
// Switch semantics
// ============================================================================

#[test]
fn test_switch_to_missing_id_changes_nothing() {
    let (registry, rx) = registry_with_events();
    registry.load("kitchen", uniform_entry("kitchen", 3, 3, 0));
    count_events(&rx);
    let before = registry.serve().unwrap();

    assert_eq!(
        registry.switch_active("garage"),
        Err(RegistryError::NotFound("garage".to_string()))
    );

    let after = registry.serve().unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(registry.active_id().as_deref(), Some("kitchen"));
    assert_eq!(count_events(&rx), (0, 0));
}

#[test]
fn test_switch_to_present_id_emits_one_switch() {
    let (registry, rx) = registry_with_events();
    registry.load("kitchen", uniform_entry("kitchen", 3, 3, 0));
    registry.load("hall", uniform_entry("hall", 4, 4, 100));
    count_events(&rx);

    let outcome = registry.switch_active("hall").unwrap();
    assert!(outcome.changed());
    assert_eq!(count_events(&rx), (1, 1));

    let served = registry.serve().unwrap();
    assert_eq!(served.id(), "hall");
    assert_eq!(served.grid().cells().len(), 16);

    // Switching back to the original also works; both maps stay resident
    registry.switch_active("kitchen").unwrap();
    assert_eq!(registry.serve().unwrap().id(), "kitchen");
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_switch_to_active_id_is_noop() {
    let (registry, rx) = registry_with_events();
    registry.load("kitchen", uniform_entry("kitchen", 3, 3, 0));
    count_events(&rx);

    assert_eq!(
        registry.switch_active("kitchen"),
        Ok(SwitchOutcome::AlreadyActive)
    );
    assert_eq!(count_events(&rx), (0, 0));
}

#[test]
fn test_serve_before_and_after_first_load() {
    let registry = MapRegistry::new();
    assert_eq!(registry.serve().unwrap_err(), RegistryError::Unavailable);

    registry.load("only", uniform_entry("only", 2, 2, 0));
    assert_eq!(registry.serve().unwrap().id(), "only");
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_concurrent_serve_never_observes_mixed_content() {
    let registry = Arc::new(MapRegistry::new());
    registry.load("A", uniform_entry("A", 3, 3, 0));
    registry.load("B", uniform_entry("B", 4, 4, 100));

    let stop = Arc::new(AtomicBool::new(false));

    let switcher = {
        let registry = Arc::clone(&registry);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut switches = 0u32;
            while !stop.load(Ordering::Relaxed) {
                let target = if switches % 2 == 0 { "B" } else { "A" };
                registry.switch_active(target).unwrap();
                switches += 1;
            }
            switches
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let mut seen = (0u32, 0u32);
                for _ in 0..20_000 {
                    let entry = registry.serve().unwrap();
                    assert!(is_consistent(&entry));
                    match entry.id() {
                        "A" => {
                            assert_eq!(entry.grid().width(), 3);
                            assert!(entry.grid().cells().iter().all(|&c| c == 0));
                            seen.0 += 1;
                        }
                        "B" => {
                            assert_eq!(entry.grid().width(), 4);
                            assert!(entry.grid().cells().iter().all(|&c| c == 100));
                            seen.1 += 1;
                        }
                        other => panic!("unexpected map {}", other),
                    }
                }
                seen
            })
        })
        .collect();

    for reader in readers {
        let (a, b) = reader.join().unwrap();
        assert_eq!(a + b, 20_000);
    }
    stop.store(true, Ordering::Relaxed);
    assert!(switcher.join().unwrap() > 0);
}

// ============================================================================
// End-to-end with image fixtures
// ============================================================================

#[test]
fn test_kitchen_hall_scenario() {
    let dir = TempDir::new().unwrap();
    let kitchen_yaml = write_free_map(dir.path(), "kitchen", 3);
    let hall_yaml = write_free_map(dir.path(), "hall", 4);

    let registry = MapRegistry::new();

    let kitchen = load(&kitchen_yaml);
    assert_eq!(kitchen.id(), "kitchen");
    registry.load(kitchen.id().to_string(), kitchen);

    let served = registry.serve().unwrap();
    assert_eq!((served.grid().width(), served.grid().height()), (3, 3));
    assert_eq!(served.grid().resolution(), 0.05);

    assert!(matches!(
        registry.switch_active("hall"),
        Err(RegistryError::NotFound(_))
    ));
    assert_eq!(registry.serve().unwrap().id(), "kitchen");

    let hall = load(&hall_yaml);
    registry.load("hall", hall);
    registry.switch_active("hall").unwrap();

    let served = registry.serve().unwrap();
    assert_eq!(served.id(), "hall");
    assert_eq!((served.grid().width(), served.grid().height()), (4, 4));
}

#[test]
fn test_fixture_rasterization_through_registry() {
    let dir = TempDir::new().unwrap();
    // Top row black, middle row gray, bottom row white
    let yaml = write_map(dir.path(), "striped", 2, 3, |_, y| match y {
        0 => BLACK,
        1 => GRAY,
        _ => WHITE,
    });

    let registry = MapRegistry::new();
    let entry = load(&yaml);
    registry.load(entry.id().to_string(), entry);

    let served = registry.serve().unwrap();
    let grid = served.grid();
    // Grid row 0 is the bottom of the image
    assert_eq!(grid.cells(), &[0, 0, -1, -1, 100, 100]);
    assert_eq!(grid.origin().x, -1.0);
    assert_eq!(grid.origin().y, -2.0);

    let meta = served.metadata();
    assert_eq!(meta.map_id, "striped");
    assert_eq!(meta.frame_id, "map");
    assert!(meta.load_time_us > 0);
}
