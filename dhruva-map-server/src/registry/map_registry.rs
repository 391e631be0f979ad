//! Multi-map registry with an atomically switchable active map.
//!
//! # State machine
//!
//! ```text
//!            load(id)                       switch_active(x), x loaded
//!   Empty ───────────────► Active(id) ◄────────────────────────────────┐
//!   serve() fails          serve() ok  ─────────────────────────────────┘
//!                          load(id) again: content replaced, stays Active(id)
//!                          switch_active(x), x unknown: NotFound, no change
//! ```
//!
//! # Concurrency
//!
//! Readable state (entries + active id) lives in one immutable snapshot
//! behind an [`ArcSwap`]. `serve`/`get` load the snapshot without locking,
//! so they never wait on a switch and always see a consistent
//! (active id, entry) pair. Writers serialize on a mutex, build the next
//! snapshot and swap it in. Entries are immutable `Arc`s, so a served
//! snapshot stays valid for as long as the caller holds it.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::events::{MapSwitch, NotificationSink, NullSink};
use crate::error::RegistryError;
use crate::map::MapEntry;

/// Registry shared between the gateway, publisher and startup code.
pub type SharedRegistry = Arc<MapRegistry>;

/// Result of a successful [`MapRegistry::switch_active`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Active map changed from `previous`.
    Switched {
        /// Id that was active before the switch.
        previous: String,
    },
    /// Requested id was already active; nothing changed, nothing emitted.
    AlreadyActive,
}

impl SwitchOutcome {
    /// Whether the active map actually changed.
    pub fn changed(&self) -> bool {
        matches!(self, SwitchOutcome::Switched { .. })
    }
}

/// Summary information about a loaded map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSummary {
    /// Unique map identifier.
    pub map_id: String,
    /// Grid width in cells.
    pub width: u32,
    /// Grid height in cells.
    pub height: u32,
    /// Meters per cell.
    pub resolution: f64,
    /// Coordinate frame label.
    pub frame_id: String,
    /// Grid load time (microseconds since epoch).
    pub load_time_us: u64,
    /// Whether this map is currently active.
    pub is_active: bool,
}

/// Immutable registry contents.
#[derive(Debug, Default, Clone)]
struct Snapshot {
    entries: HashMap<String, Arc<MapEntry>>,
    /// Always a key of `entries` once set.
    active_id: Option<String>,
}

/// Process-wide map store.
pub struct MapRegistry {
    state: ArcSwap<Snapshot>,
    /// Serializes `load` and `switch_active`; never taken by readers.
    write_lock: Mutex<()>,
    sink: Arc<dyn NotificationSink>,
}

impl Default for MapRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MapRegistry {
    /// Empty registry that discards notifications.
    pub fn new() -> Self {
        Self::with_sink(Arc::new(NullSink))
    }

    /// Empty registry publishing notifications to `sink`.
    pub fn with_sink(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            state: ArcSwap::from_pointee(Snapshot::default()),
            write_lock: Mutex::new(()),
            sink,
        }
    }

    /// Insert or replace the entry for `id`.
    ///
    /// The first map loaded into an empty registry becomes active. A
    /// duplicate id silently replaces the previous entry. Notifications are
    /// emitted when the load changes what "active" means: first load, or
    /// reload of the active id.
    ///
    /// The stored entry always carries `id`; an entry built under another
    /// name is re-keyed.
    pub fn load(&self, id: impl Into<String>, entry: MapEntry) {
        let id = id.into();
        let entry = if entry.id() == id {
            entry
        } else {
            log::warn!("Map [{}] loaded under id [{}], re-keying", entry.id(), id);
            entry.with_id(id.clone())
        };
        let entry = Arc::new(entry);

        let _guard = self.write_lock.lock();
        let current = self.state.load_full();

        let mut next = Snapshot::clone(&current);
        let replaced = next.entries.insert(id.clone(), Arc::clone(&entry)).is_some();

        let previous = match &next.active_id {
            None => {
                next.active_id = Some(id.clone());
                Some(None)
            }
            Some(active) if *active == id => Some(Some(id.clone())),
            Some(_) => None,
        };
        self.state.store(Arc::new(next));

        log::info!(
            "{} map [{}] ({}x{} @ {:.3} m/cell)",
            if replaced { "Reloaded" } else { "Loaded" },
            id,
            entry.grid().width(),
            entry.grid().height(),
            entry.grid().resolution()
        );

        if let Some(previous) = previous {
            if previous.is_none() {
                log::info!("map[{}] is active", id);
            }
            self.emit(MapSwitch { previous, entry });
        }
    }

    /// Make `id` the active map.
    ///
    /// Unknown ids leave the registry unchanged and return
    /// [`RegistryError::NotFound`]. Switching to the already active id is a
    /// no-op. Serves already in flight finish with the snapshot they read.
    pub fn switch_active(&self, id: &str) -> Result<SwitchOutcome, RegistryError> {
        let _guard = self.write_lock.lock();
        let current = self.state.load_full();

        let Some(entry) = current.entries.get(id).cloned() else {
            log::warn!("Cannot switch to map [{}]: not loaded", id);
            return Err(RegistryError::NotFound(id.to_string()));
        };

        // Non-empty entries always have an active id
        let previous = current.active_id.clone().unwrap_or_default();
        if previous == id {
            log::debug!("map[{}] is already active", id);
            return Ok(SwitchOutcome::AlreadyActive);
        }

        let mut next = Snapshot::clone(&current);
        next.active_id = Some(id.to_string());
        self.state.store(Arc::new(next));

        log::info!("map[{}] is available (was [{}])", id, previous);
        self.emit(MapSwitch {
            previous: Some(previous.clone()),
            entry,
        });

        Ok(SwitchOutcome::Switched { previous })
    }

    /// The currently active entry.
    ///
    /// Fails with [`RegistryError::Unavailable`] until a map is loaded.
    /// Never blocks.
    pub fn serve(&self) -> Result<Arc<MapEntry>, RegistryError> {
        let snapshot = self.state.load();
        snapshot
            .active_id
            .as_ref()
            .and_then(|id| snapshot.entries.get(id))
            .cloned()
            .ok_or(RegistryError::Unavailable)
    }

    /// Look up an entry by id without affecting the active map.
    pub fn get(&self, id: &str) -> Option<Arc<MapEntry>> {
        self.state.load().entries.get(id).cloned()
    }

    /// Id of the active map, if any.
    pub fn active_id(&self) -> Option<String> {
        self.state.load().active_id.clone()
    }

    /// All loaded ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.load().entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Summaries of every loaded map, sorted by id.
    pub fn list(&self) -> Vec<MapSummary> {
        let snapshot = self.state.load();
        let mut maps: Vec<MapSummary> = snapshot
            .entries
            .values()
            .map(|entry| MapSummary {
                map_id: entry.id().to_string(),
                width: entry.grid().width(),
                height: entry.grid().height(),
                resolution: entry.grid().resolution(),
                frame_id: entry.frame_id().to_string(),
                load_time_us: entry.grid().load_time_us(),
                is_active: snapshot.active_id.as_deref() == Some(entry.id()),
            })
            .collect();
        maps.sort_by(|a, b| a.map_id.cmp(&b.map_id));
        maps
    }

    /// Number of loaded maps.
    pub fn len(&self) -> usize {
        self.state.load().entries.len()
    }

    /// Whether no map has been loaded.
    pub fn is_empty(&self) -> bool {
        self.state.load().entries.is_empty()
    }

    /// Announce a new active entry. Called with the write lock held.
    fn emit(&self, switch: MapSwitch) {
        self.sink.metadata_changed(&switch.entry.metadata());
        self.sink.map_switched(&switch);
    }
}

impl std::fmt::Debug for MapRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.state.load();
        f.debug_struct("MapRegistry")
            .field("maps", &snapshot.entries.len())
            .field("active_id", &snapshot.active_id)
            .finish()
    }
}
