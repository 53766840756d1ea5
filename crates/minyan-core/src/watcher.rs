//! The proximity watcher state machine.
//!
//! A [`ProximityWatcher`] owns at most one location subscription. While
//! running, a spawned task drains the subscription's sample channel and
//! runs one check per sample, strictly one after another. Foreground
//! checks ([`ProximityWatcher::check_now`]) go through the same ledger
//! lock, so no two checks ever overlap.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use minyan_ledger::NotificationLedger;
use minyan_types::{GeoPoint, PermissionStatus, ProximityConfig, SamplingPolicy, WatcherState};

use crate::check::{CheckReport, check_nearby_events};
use crate::services::{SubscriptionHandle, WatcherServices};

/// State shared between the watcher handle and its sample task.
#[derive(Debug)]
struct Shared {
    services: WatcherServices,
    /// Held for the whole duration of a check.
    ledger: Mutex<NotificationLedger>,
    config: RwLock<ProximityConfig>,
}

impl Shared {
    async fn check(&self, point: GeoPoint) -> CheckReport {
        let mut ledger = self.ledger.lock().await;
        ledger.ensure_loaded().await;
        let config = *self.config.read().await;
        check_nearby_events(&self.services, &mut ledger, &config, point).await
    }
}

/// A live subscription and the task consuming it.
#[derive(Debug)]
struct ActiveWatch {
    handle: SubscriptionHandle,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Watches the device location and notifies about nearby minyanim.
///
/// Constructed explicitly by the caller; several independent watchers can
/// coexist (each with its own ledger), which is what the tests do.
#[derive(Debug)]
pub struct ProximityWatcher {
    shared: Arc<Shared>,
    sampling: SamplingPolicy,
    active: Mutex<Option<ActiveWatch>>,
}

impl ProximityWatcher {
    /// Create a stopped watcher with the default proximity config.
    pub fn new(services: WatcherServices, ledger: NotificationLedger, sampling: SamplingPolicy) -> Self {
        Self {
            shared: Arc::new(Shared {
                services,
                ledger: Mutex::new(ledger),
                config: RwLock::new(ProximityConfig::default()),
            }),
            sampling,
            active: Mutex::new(None),
        }
    }

    /// Start watching with `config`.
    ///
    /// Returns `false` and stays stopped when `config` is disabled, when
    /// location permission is denied, or when no subscription can be
    /// opened. Calling `start` on a running watcher only replaces the
    /// config and returns `true`; calling it with a disabled config stops
    /// the watcher.
    pub async fn start(&self, config: ProximityConfig) -> bool {
        let mut active = self.active.lock().await;

        if !config.enabled {
            *self.shared.config.write().await = config;
            if let Some(watch) = active.take() {
                self.halt(watch).await;
                info!("proximity watcher stopped by disabled config");
            }
            debug!("proximity disabled, not starting");
            return false;
        }

        if active.as_ref().is_some_and(|watch| !watch.task.is_finished()) {
            *self.shared.config.write().await = config;
            info!(radius_m = config.radius_meters, "proximity watcher already running, config updated");
            return true;
        }

        // A previous stream ended on its own; release its subscription.
        if let Some(stale) = active.take() {
            self.shared.services.location.unsubscribe(stale.handle).await;
        }

        match self.shared.services.location.request_permission().await {
            Ok(PermissionStatus::Granted) => {}
            Ok(PermissionStatus::Denied) => {
                info!("location permission denied, proximity watcher not started");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "location permission request failed");
                return false;
            }
        }

        self.shared.ledger.lock().await.ensure_loaded().await;
        *self.shared.config.write().await = config;

        let subscription = match self.shared.services.location.subscribe(self.sampling).await {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!(error = %e, "location subscription failed, proximity watcher not started");
                return false;
            }
        };

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(watch_samples(
            Arc::clone(&self.shared),
            subscription.samples,
            stop_rx,
        ));
        *active = Some(ActiveWatch {
            handle: subscription.handle,
            stop: stop_tx,
            task,
        });

        info!(
            radius_m = config.radius_meters,
            min_interval_ms = self.sampling.min_interval_ms,
            min_distance_m = self.sampling.min_distance_m,
            "proximity watcher started"
        );
        true
    }

    /// Cancel the subscription and return to [`WatcherState::Stopped`].
    ///
    /// A check already in flight is allowed to finish. Calling `stop` on a
    /// stopped watcher does nothing.
    pub async fn stop(&self) {
        let mut active = self.active.lock().await;
        if let Some(watch) = active.take() {
            self.halt(watch).await;
            info!("proximity watcher stopped");
        }
    }

    async fn halt(&self, watch: ActiveWatch) {
        self.shared.services.location.unsubscribe(watch.handle).await;
        // The task may already have exited if its stream closed.
        let _ = watch.stop.send(());
    }

    /// Replace the active config; a disabled config stops the watcher.
    pub async fn update_config(&self, config: ProximityConfig) {
        *self.shared.config.write().await = config;
        info!(enabled = config.enabled, radius_m = config.radius_meters, "proximity config updated");
        if !config.enabled {
            self.stop().await;
        }
    }

    /// The config checks currently use.
    pub async fn config(&self) -> ProximityConfig {
        *self.shared.config.read().await
    }

    /// The sampling policy passed to every subscription.
    pub const fn sampling(&self) -> SamplingPolicy {
        self.sampling
    }

    /// Running while a sample task is alive.
    pub async fn state(&self) -> WatcherState {
        match self.active.lock().await.as_ref() {
            Some(watch) if !watch.task.is_finished() => WatcherState::Running,
            _ => WatcherState::Stopped,
        }
    }

    /// Run one check at `point` now, whatever the watcher state.
    pub async fn check_now(&self, point: GeoPoint) -> CheckReport {
        self.shared.check(point).await
    }

    /// Run one check at the position reported by the current-location
    /// provider. Returns `None` if no position is available.
    pub async fn check_current_location(&self) -> Option<CheckReport> {
        match self.shared.services.current_location.current_location().await {
            Ok(point) => Some(self.check_now(point).await),
            Err(e) => {
                warn!(error = %e, "current location unavailable, skipping foreground check");
                None
            }
        }
    }
}

/// Drain `samples` one at a time until stopped or the stream closes.
async fn watch_samples(
    shared: Arc<Shared>,
    mut samples: mpsc::Receiver<GeoPoint>,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            _ = &mut stop => {
                debug!("sample task received stop signal");
                break;
            }
            sample = samples.recv() => {
                let Some(point) = sample else {
                    info!("location stream closed, proximity watcher stopping");
                    break;
                };
                let report = shared.check(point).await;
                debug!(
                    latitude = point.latitude,
                    longitude = point.longitude,
                    candidates = report.candidates,
                    notified = report.notified.len(),
                    "proximity check finished"
                );
            }
        }
    }
}
