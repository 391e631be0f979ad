//! dhruva-map-server daemon
//!
//! Loads every configured map, serves the active one over TCP and publishes
//! it (latched) to subscribers.
//!
//! # Usage
//!
//! ```bash
//! # Maps from the config file
//! dhruva-map-server --config map_server.toml
//!
//! # Maps from the command line (first becomes active)
//! dhruva-map-server /srv/maps/kitchen.yaml /srv/maps/hall.yaml
//! ```
//!
//! Any map that fails to load aborts startup with exit code 1.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use clap::Parser;

use dhruva_map_server::io::{LatchedPublisher, RequestGateway};
use dhruva_map_server::registry::{FanoutSink, LogSink};
use dhruva_map_server::{Config, Error, MapRegistry, MapSource, NotificationSink, Result, load_all};

/// Multi-map occupancy grid server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Map YAML files, appended after the maps listed in the config
    #[arg(value_name = "MAP_SOURCE")]
    maps: Vec<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Err(e) = run(args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    log::info!("DhruvaMapServer v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => {
            log::info!("Using config: {}", path.display());
            Config::load(path)?
        }
        None => Config::default(),
    }
    .with_maps(args.maps.into_iter().map(MapSource::yaml));

    // All maps are loaded before anything is served
    let entries = load_all(&config.maps, &config.frame_id)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let publisher = if config.publisher.enabled {
        Some(Arc::new(LatchedPublisher::spawn(
            &config.publisher,
            Arc::clone(&running),
        )?))
    } else {
        log::info!("Latched publisher disabled");
        None
    };

    let mut sinks = FanoutSink::new().with(Arc::new(LogSink));
    if let Some(publisher) = &publisher {
        sinks = sinks.with(Arc::clone(publisher) as Arc<dyn NotificationSink>);
    }
    let registry = Arc::new(MapRegistry::with_sink(Arc::new(sinks)));
    for entry in entries {
        registry.load(entry.id().to_string(), entry);
    }
    log::info!(
        "{} map(s) loaded, active map [{}]",
        registry.len(),
        registry.active_id().unwrap_or_default()
    );

    let gateway = RequestGateway::spawn(
        &config.gateway,
        Arc::clone(&registry),
        Arc::clone(&running),
    )?;

    log::info!("DhruvaMapServer running. Press Ctrl-C to stop.");
    while running.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(100));
    }

    log::info!("Shutting down...");
    gateway.join();
    if let Some(publisher) = publisher {
        publisher.join();
    }

    log::info!("DhruvaMapServer stopped");
    Ok(())
}
