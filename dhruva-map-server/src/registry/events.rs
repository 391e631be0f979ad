//! Registry notifications.
//!
//! The registry only decides *what* is announced and *when*; delivery is the
//! sink's business. Sinks are called while the registry's writer lock is
//! held, so they must not call back into registry writers and should return
//! quickly (hand off to a channel for anything slow).

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::map::{MapEntry, MapMetaData};

/// Active map change: stop publishing `previous`, start publishing `entry`.
#[derive(Debug, Clone)]
pub struct MapSwitch {
    /// Previously active id (`None` on the first load).
    ///
    /// Equal to `entry.id()` when the active map was reloaded in place.
    pub previous: Option<String>,
    /// Newly active entry.
    pub entry: Arc<MapEntry>,
}

impl MapSwitch {
    /// Previous id, if it names a different map than the new entry.
    pub fn deactivated(&self) -> Option<&str> {
        self.previous
            .as_deref()
            .filter(|previous| *previous != self.entry.id())
    }
}

/// Events emitted by [`super::MapRegistry`].
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    /// Active map metadata changed.
    MetadataChanged(MapMetaData),
    /// Active map switched (or reloaded in place).
    MapSwitched(MapSwitch),
}

/// Receiver of registry notifications.
pub trait NotificationSink: Send + Sync {
    /// Active map metadata changed.
    fn metadata_changed(&self, metadata: &MapMetaData);

    /// Publication should move from `switch.previous` to `switch.entry`.
    fn map_switched(&self, switch: &MapSwitch);
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn metadata_changed(&self, _metadata: &MapMetaData) {}

    fn map_switched(&self, _switch: &MapSwitch) {}
}

/// Sink that logs every event at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn metadata_changed(&self, metadata: &MapMetaData) {
        log::info!(
            "Active map metadata: [{}] {} X {} @ {:.3} m/cell",
            metadata.map_id,
            metadata.width,
            metadata.height,
            metadata.resolution
        );
    }

    fn map_switched(&self, switch: &MapSwitch) {
        match (switch.deactivated(), &switch.previous) {
            (Some(previous), _) => {
                log::info!("Active map switched [{}] -> [{}]", previous, switch.entry.id())
            }
            (None, Some(_)) => log::info!("Active map [{}] reloaded", switch.entry.id()),
            (None, None) => log::info!("Active map [{}] published", switch.entry.id()),
        }
    }
}

/// Sink forwarding events into a crossbeam channel.
///
/// Never blocks: on a bounded channel that is full the event is dropped and
/// a warning logged.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<RegistryEvent>,
}

impl ChannelSink {
    /// Wrap an existing sender.
    pub fn new(tx: Sender<RegistryEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink and the receiving end of an unbounded channel.
    pub fn unbounded() -> (Self, Receiver<RegistryEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(tx), rx)
    }

    fn send(&self, event: RegistryEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => log::warn!("Registry event channel full, event dropped"),
            Err(TrySendError::Disconnected(_)) => {
                log::debug!("Registry event receiver gone, event dropped")
            }
        }
    }
}

impl NotificationSink for ChannelSink {
    fn metadata_changed(&self, metadata: &MapMetaData) {
        self.send(RegistryEvent::MetadataChanged(metadata.clone()));
    }

    fn map_switched(&self, switch: &MapSwitch) {
        self.send(RegistryEvent::MapSwitched(switch.clone()));
    }
}

/// Sink forwarding to several sinks in order.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a downstream sink.
    pub fn with(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl NotificationSink for FanoutSink {
    fn metadata_changed(&self, metadata: &MapMetaData) {
        for sink in &self.sinks {
            sink.metadata_changed(metadata);
        }
    }

    fn map_switched(&self, switch: &MapSwitch) {
        for sink in &self.sinks {
            sink.map_switched(switch);
        }
    }
}

impl std::fmt::Debug for FanoutSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Pose2D;
    use crate::map::GridArtifact;

    fn entry(id: &str) -> Arc<MapEntry> {
        let grid = GridArtifact::new(1, 1, 0.05, Pose2D::identity(), vec![0]).unwrap();
        Arc::new(MapEntry::new(id, "map", grid))
    }

    #[test]
    fn test_deactivated_skips_reload_in_place() {
        let switch = MapSwitch {
            previous: Some("kitchen".to_string()),
            entry: entry("kitchen"),
        };
        assert_eq!(switch.deactivated(), None);

        let switch = MapSwitch {
            previous: Some("kitchen".to_string()),
            entry: entry("hall"),
        };
        assert_eq!(switch.deactivated(), Some("kitchen"));
    }

    #[test]
    fn test_channel_sink_forwards_in_order() {
        let (sink, rx) = ChannelSink::unbounded();
        let e = entry("hall");
        sink.metadata_changed(&e.metadata());
        sink.map_switched(&MapSwitch {
            previous: None,
            entry: e,
        });

        assert!(matches!(rx.try_recv(), Ok(RegistryEvent::MetadataChanged(m)) if m.map_id == "hall"));
        assert!(matches!(rx.try_recv(), Ok(RegistryEvent::MapSwitched(s)) if s.previous.is_none()));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_does_not_block_when_full() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let sink = ChannelSink::new(tx);
        let e = entry("hall");
        sink.metadata_changed(&e.metadata());
        sink.metadata_changed(&e.metadata());
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let (a, rx_a) = ChannelSink::unbounded();
        let (b, rx_b) = ChannelSink::unbounded();
        let fanout = FanoutSink::new().with(Arc::new(a)).with(Arc::new(b));
        assert_eq!(fanout.len(), 2);

        fanout.metadata_changed(&entry("hall").metadata());
        assert_eq!(rx_a.len(), 1);
        assert_eq!(rx_b.len(), 1);
    }

    #[test]
    fn test_log_sink_alongside_channel() {
        let (channel, rx) = ChannelSink::unbounded();
        let fanout = FanoutSink::new()
            .with(Arc::new(LogSink))
            .with(Arc::new(channel));

        let e = entry("hall");
        fanout.metadata_changed(&e.metadata());
        for previous in [None, Some("hall".to_string()), Some("kitchen".to_string())] {
            fanout.map_switched(&MapSwitch {
                previous,
                entry: Arc::clone(&e),
            });
        }

        // Logging does not swallow events for later sinks
        assert_eq!(rx.len(), 4);
    }
}
