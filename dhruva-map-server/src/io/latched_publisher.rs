//! Latched TCP map publisher.
//!
//! Subscribers connect and receive framed [`Published`] messages. The last
//! metadata and map frames are latched and replayed to every new subscriber,
//! so a late joiner immediately gets the active map.
//!
//! Registry notifications are handed to a dedicated publisher thread through
//! a channel; the registry's writer lock is never held across socket I/O.
//!
//! ```text
//! MapRegistry ──► ChannelSink ──► publisher thread ──► subscribers
//!                                   │ latch: metadata, map
//!                                   └ accept: replay latch to newcomer
//! ```

use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::Mutex;

use super::messages::{OccupancyGridMsg, Published};
use super::wire::write_frame;
use crate::config::PublisherConfig;
use crate::error::{Error, Result, WireError};
use crate::map::MapMetaData;
use crate::registry::{ChannelSink, MapSwitch, NotificationSink, RegistryEvent};

/// How long the publisher thread waits for an event before polling accept.
const EVENT_POLL: Duration = Duration::from_millis(10);

/// Subscribers that cannot take a frame within this time are dropped.
const WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Latched publisher; register it as the registry's notification sink.
pub struct LatchedPublisher {
    sink: ChannelSink,
    local_addr: SocketAddr,
    /// Taken by [`LatchedPublisher::join`]; the publisher is shared with the registry.
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl LatchedPublisher {
    /// Bind the listener and start the publisher thread.
    ///
    /// The thread stops when `running` is cleared.
    pub fn spawn(config: &PublisherConfig, running: Arc<AtomicBool>) -> Result<Self> {
        let listener = TcpListener::bind(&config.bind_address).map_err(|e| {
            Error::Other(format!(
                "Failed to bind publisher to {}: {}",
                config.bind_address, e
            ))
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let (sink, events) = ChannelSink::unbounded();
        let thread = thread::Builder::new()
            .name("map-publisher".to_string())
            .spawn(move || PublisherLoop::new(listener, events, running).run())?;

        log::info!("Latched map publisher listening on {}", local_addr);

        Ok(Self {
            sink,
            local_addr,
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Address actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the publisher thread to exit.
    ///
    /// Returns promptly only after the running flag has been cleared.
    pub fn join(&self) {
        let handle = self.thread.lock().take();
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            log::error!("Publisher thread panicked");
        }
    }
}

impl NotificationSink for LatchedPublisher {
    fn metadata_changed(&self, metadata: &MapMetaData) {
        self.sink.metadata_changed(metadata);
    }

    fn map_switched(&self, switch: &MapSwitch) {
        self.sink.map_switched(switch);
    }
}

/// State owned by the publisher thread.
struct PublisherLoop {
    listener: TcpListener,
    events: Receiver<RegistryEvent>,
    running: Arc<AtomicBool>,
    subscribers: Vec<(SocketAddr, TcpStream)>,
    latched_metadata: Option<Vec<u8>>,
    latched_map: Option<Vec<u8>>,
}

impl PublisherLoop {
    fn new(
        listener: TcpListener,
        events: Receiver<RegistryEvent>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            listener,
            events,
            running,
            subscribers: Vec::new(),
            latched_metadata: None,
            latched_map: None,
        }
    }

    fn run(mut self) {
        let mut published = 0u64;

        while self.running.load(Ordering::Relaxed) {
            self.accept_pending();

            match self.events.recv_timeout(EVENT_POLL) {
                Ok(event) => match self.publish(event) {
                    Ok(()) => published += 1,
                    Err(e) => log::error!("Failed to encode map frame: {}", e),
                },
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    log::debug!("Publisher sink dropped, exiting");
                    break;
                }
            }
        }

        log::info!(
            "Latched map publisher exiting ({} events published)",
            published
        );
    }

    /// Accept every pending subscriber and replay the latch to it.
    fn accept_pending(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((mut stream, addr)) => {
                    if let Err(e) = stream
                        .set_nonblocking(false)
                        .and_then(|()| stream.set_write_timeout(Some(WRITE_TIMEOUT)))
                    {
                        log::warn!("Failed to configure subscriber {}: {}", addr, e);
                        continue;
                    }

                    let replay = [&self.latched_metadata, &self.latched_map];
                    let delivered = replay
                        .into_iter()
                        .flatten()
                        .try_for_each(|frame| stream.write_all(frame));
                    match delivered {
                        Ok(()) => {
                            log::info!("Map subscriber connected: {}", addr);
                            self.subscribers.push((addr, stream));
                        }
                        Err(e) => log::warn!("Dropping subscriber {} during replay: {}", addr, e),
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => return,
                Err(e) => {
                    log::error!("Publisher accept error: {}", e);
                    return;
                }
            }
        }
    }

    fn publish(&mut self, event: RegistryEvent) -> std::result::Result<(), WireError> {
        match event {
            RegistryEvent::MetadataChanged(metadata) => {
                let frame = encode(&Published::Metadata(metadata))?;
                self.broadcast(&frame);
                self.latched_metadata = Some(frame);
            }
            RegistryEvent::MapSwitched(switch) => {
                if let Some(previous) = switch.deactivated() {
                    let frame = encode(&Published::MapDeactivated {
                        map_id: previous.to_string(),
                    })?;
                    self.broadcast(&frame);
                }

                let frame = encode(&Published::Map(OccupancyGridMsg::from_entry(&switch.entry)))?;
                self.broadcast(&frame);
                self.latched_map = Some(frame);
                log::info!("Publishing map [{}]", switch.entry.id());
            }
        }
        Ok(())
    }

    /// Send a frame to every subscriber, dropping the ones that fail.
    fn broadcast(&mut self, frame: &[u8]) {
        self.subscribers.retain_mut(|(addr, stream)| match stream.write_all(frame) {
            Ok(()) => true,
            Err(e) => {
                log::info!("Map subscriber {} dropped: {}", addr, e);
                false
            }
        });
    }
}

fn encode(msg: &Published) -> std::result::Result<Vec<u8>, WireError> {
    let mut frame = Vec::new();
    write_frame(&mut frame, msg)?;
    Ok(frame)
}
