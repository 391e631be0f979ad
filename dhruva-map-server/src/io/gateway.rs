//! TCP request gateway.
//!
//! Clients connect and exchange framed JSON request/response pairs
//! (see [`super::wire`]). Each client is served by its own thread.
//!
//! # Connection Lifecycle
//!
//! ```text
//! 1. Client connects to the gateway port (default 5560)
//! 2. Accept thread spawns a session thread for the client
//! 3. Session loop: read request → query registry → write response
//! 4. Malformed request: `bad_request` error response, connection stays open
//! 5. I/O error, oversized frame or shutdown: connection closed
//! ```
//!
//! Read timeouts let every session poll the shutdown flag between requests.
//! A request that arrives slowly is waited for until it is complete.

use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::messages::{ErrorKind, OccupancyGridMsg, Request, Response};
use super::wire::{poll_frame, write_frame};
use crate::config::GatewayConfig;
use crate::error::{Error, RegistryError, Result, WireError};
use crate::registry::{MapRegistry, SharedRegistry, SwitchOutcome};

/// Sleep between non-blocking accept polls.
const ACCEPT_POLL: Duration = Duration::from_millis(10);

/// Initial capacity for the request read buffer (requests are small).
const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Answer one request against the registry.
pub fn handle_request(registry: &MapRegistry, request: Request) -> Response {
    match request {
        Request::GetMap => match registry.serve() {
            Ok(entry) => Response::Map(OccupancyGridMsg::from_entry(&entry)),
            Err(e) => e.into(),
        },
        Request::GetMapById { map_id } => match registry.get(&map_id) {
            Some(entry) => Response::Map(OccupancyGridMsg::from_entry(&entry)),
            None => RegistryError::NotFound(map_id).into(),
        },
        Request::SelectMap { map_id } => match registry.switch_active(&map_id) {
            Ok(outcome) => {
                match &outcome {
                    SwitchOutcome::Switched { previous } => {
                        log::info!("Selected map [{}] (was [{}])", map_id, previous)
                    }
                    SwitchOutcome::AlreadyActive => {
                        log::info!("Selected map [{}] (already active)", map_id)
                    }
                }
                Response::Selected {
                    map_id,
                    changed: outcome.changed(),
                }
            }
            Err(e) => {
                log::warn!("Select map failed: {}", e);
                e.into()
            }
        },
        Request::ListMaps => Response::MapList {
            active_map_id: registry.active_id(),
            maps: registry.list(),
        },
    }
}

/// Running request gateway.
pub struct RequestGateway {
    local_addr: SocketAddr,
    accept_thread: Option<JoinHandle<()>>,
}

impl RequestGateway {
    /// Bind the listener and start the accept thread.
    ///
    /// The gateway stops when `running` is cleared.
    pub fn spawn(
        config: &GatewayConfig,
        registry: SharedRegistry,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(&config.bind_address).map_err(|e| {
            Error::Other(format!(
                "Failed to bind gateway to {}: {}",
                config.bind_address, e
            ))
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let session_config = config.clone();
        let accept_thread = thread::Builder::new()
            .name("map-gateway".to_string())
            .spawn(move || accept_loop(listener, registry, session_config, running))?;

        log::info!("Request gateway listening on {}", local_addr);

        Ok(Self {
            local_addr,
            accept_thread: Some(accept_thread),
        })
    }

    /// Address actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the accept thread and all sessions to finish.
    ///
    /// Returns promptly only after the running flag has been cleared.
    pub fn join(mut self) {
        if let Some(handle) = self.accept_thread.take()
            && handle.join().is_err()
        {
            log::error!("Gateway accept thread panicked");
        }
    }
}

fn accept_loop(
    listener: TcpListener,
    registry: SharedRegistry,
    config: GatewayConfig,
    running: Arc<AtomicBool>,
) {
    let mut sessions: Vec<JoinHandle<()>> = Vec::new();

    while running.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, addr)) => {
                if let Err(e) = stream.set_nonblocking(false) {
                    log::warn!("Failed to set blocking mode for client {}: {}", addr, e);
                    continue;
                }
                log::info!("Gateway client connected: {}", addr);

                let session = ClientSession {
                    registry: Arc::clone(&registry),
                    running: Arc::clone(&running),
                    max_frame_bytes: config.max_frame_bytes,
                    read_timeout: Duration::from_millis(config.read_timeout_ms.max(1)),
                };
                match thread::Builder::new()
                    .name("map-client".to_string())
                    .spawn(move || {
                        if let Err(e) = session.run(stream) {
                            log::error!("Gateway client {} error: {}", addr, e);
                        }
                        log::info!("Gateway client disconnected: {}", addr);
                    }) {
                    Ok(handle) => sessions.push(handle),
                    Err(e) => log::error!("Failed to spawn session for {}: {}", addr, e),
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                sessions.retain(|handle| !handle.is_finished());
                thread::sleep(ACCEPT_POLL);
            }
            Err(e) => {
                log::error!("Gateway accept error: {}", e);
                thread::sleep(ACCEPT_POLL);
            }
        }
    }

    log::info!("Request gateway stopping ({} open sessions)", sessions.len());
    for handle in sessions {
        let _ = handle.join();
    }
}

/// One connected client.
struct ClientSession {
    registry: SharedRegistry,
    running: Arc<AtomicBool>,
    max_frame_bytes: usize,
    read_timeout: Duration,
}

impl ClientSession {
    fn run(self, mut stream: TcpStream) -> std::result::Result<(), WireError> {
        stream.set_read_timeout(Some(self.read_timeout))?;
        let mut buf = Vec::with_capacity(INITIAL_BUFFER_CAPACITY);

        let result = loop {
            if !self.running.load(Ordering::Relaxed) {
                break Ok(());
            }

            let running = &self.running;
            let request = poll_frame::<_, Request>(
                &mut stream,
                &mut buf,
                self.max_frame_bytes,
                || running.load(Ordering::Relaxed),
            );
            let response = match request {
                Ok(Some(request)) => {
                    log::debug!("Gateway request: {:?}", request);
                    handle_request(&self.registry, request)
                }
                Ok(None) => continue,
                // Only reachable mid-frame once shutdown has started
                Err(e) if e.is_timeout() => break Ok(()),
                Err(e) if e.is_disconnect() => break Ok(()),
                Err(WireError::Serialization(e)) => {
                    log::debug!("Malformed gateway request: {}", e);
                    Response::error(ErrorKind::BadRequest, e.to_string())
                }
                Err(e) => break Err(e),
            };

            if let Err(e) = write_frame(&mut stream, &response) {
                break if e.is_disconnect() { Ok(()) } else { Err(e) };
            }
        };

        let _ = stream.shutdown(Shutdown::Both);
        result
    }
}
