//! Proximity watcher binary for the Minyan proximity core.
//!
//! Wires the watcher to concrete adapters: the remote event API over
//! HTTP, a replayed location track standing in for the device, and a
//! dispatcher that logs notifications. Runs until Ctrl-C or until the
//! track is exhausted.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `minyan-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Open the ledger's key-value store
//! 4. Build the ledger and the collaborators
//! 5. Run a foreground check at the current location
//! 6. Start the watcher
//! 7. Wait for Ctrl-C or the end of the track, then stop

mod error;
mod http_events;
mod log_dispatcher;
mod replay_location;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use minyan_core::{
    LocationProvider, ProximityWatcher, StorageBackend, StorageConfig, WatcherConfig,
    WatcherServices,
};
use minyan_ledger::NotificationLedger;
use minyan_store::{DragonflyStore, FileStore, KeyValueStore, MemoryStore};
use minyan_types::WatcherState;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::http_events::HttpEventService;
use crate::log_dispatcher::LogDispatcher;
use crate::replay_location::ReplayLocationProvider;

/// Configuration file looked up in the working directory.
const CONFIG_PATH: &str = "minyan-config.yaml";

/// How often `main` polls the watcher for the end of the track.
const STATE_POLL: Duration = Duration::from_millis(500);

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, storage or the location track
/// cannot be loaded.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration (before logging: it carries the log level).
    let (config, from_file) = load_config()?;

    // 2. Initialize structured logging. RUST_LOG wins over the config.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(from_file, "minyan-engine starting");
    info!(
        enabled = config.proximity.enabled,
        radius_m = config.proximity.radius_meters,
        min_interval_ms = config.sampling.min_interval_ms,
        min_distance_m = config.sampling.min_distance_m,
        api = %config.api.base_url,
        "Configuration loaded"
    );

    // 3. Open the store.
    let store = open_store(&config.storage).await?;

    // 4. Ledger and collaborators.
    let ledger = NotificationLedger::new(
        store,
        config.ledger.storage_key.clone(),
        config.ledger.retention(),
    );

    let replay = Arc::new(ReplayLocationProvider::from_file(
        &config.replay.track_path,
        Duration::from_millis(config.replay.interval_ms),
    )?);
    if replay.is_empty() {
        warn!("location track is empty, the watcher will stop immediately");
    }
    info!(fixes = replay.len(), interval_ms = config.replay.interval_ms, "Replay provider ready");

    let services = WatcherServices {
        events: Arc::new(HttpEventService::new(&config.api)?),
        location: Arc::clone(&replay) as Arc<dyn LocationProvider>,
        current_location: replay,
        notifier: Arc::new(LogDispatcher),
    };
    let watcher = ProximityWatcher::new(services, ledger, config.sampling);

    // 5. Foreground check.
    if let Some(report) = watcher.check_current_location().await {
        info!(
            candidates = report.candidates,
            notified = report.notified.len(),
            "Foreground check finished"
        );
    }

    // 6. Start watching.
    if !watcher.start(config.proximity).await {
        info!("Proximity watcher not started, exiting");
        return Ok(());
    }

    // 7. Run until interrupted or the track ends.
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "failed to listen for Ctrl-C");
            }
            info!("Interrupt received");
        }
        () = wait_until_stopped(&watcher) => {
            info!("Location track exhausted");
        }
    }

    watcher.stop().await;
    info!("minyan-engine shutdown complete");
    Ok(())
}

/// Load `minyan-config.yaml`, or defaults when it is absent.
///
/// Returns the config and whether it came from the file.
fn load_config() -> Result<(WatcherConfig, bool), EngineError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        Ok((WatcherConfig::from_file(config_path)?, true))
    } else {
        let mut config = WatcherConfig::default();
        config.apply_env_overrides();
        Ok((config, false))
    }
}

/// Open the configured key-value backend.
async fn open_store(config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>, EngineError> {
    let store: Arc<dyn KeyValueStore> = match config.backend {
        StorageBackend::Memory => {
            info!("Ledger kept in memory only");
            Arc::new(MemoryStore::new())
        }
        StorageBackend::File => {
            let store = FileStore::open(config.path.clone()).await?;
            info!(path = %store.root().display(), "Ledger stored on disk");
            Arc::new(store)
        }
        StorageBackend::Dragonfly => {
            let store = DragonflyStore::connect(&config.dragonfly_url, &config.key_prefix).await?;
            info!(url = %config.dragonfly_url, "Ledger stored in Dragonfly");
            Arc::new(store)
        }
    };
    Ok(store)
}

/// Resolve once the watcher has stopped on its own.
async fn wait_until_stopped(watcher: &ProximityWatcher) {
    let mut poll = tokio::time::interval(STATE_POLL);
    loop {
        poll.tick().await;
        if watcher.state().await == WatcherState::Stopped {
            return;
        }
    }
}
