//! Location provider that replays a recorded track.
//!
//! The track is a text file with one `latitude,longitude` pair per line.
//! Blank lines, `#` comments and a `latitude,longitude` header are
//! ignored. Raw fixes are played back one every `interval`; the sampling
//! policy then decides which of them reach the subscriber, as a device
//! location service would.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use minyan_core::{
    CurrentLocationProvider, LocationProvider, LocationSubscription, ServiceError,
    SubscriptionHandle,
};
use minyan_geo::{checked_point, distance_m};
use minyan_types::{GeoPoint, PermissionStatus, SamplingPolicy};

use crate::error::EngineError;

/// Capacity of each subscription's sample channel.
const SAMPLE_BUFFER: usize = 16;

// ---------------------------------------------------------------------------
// Track parsing
// ---------------------------------------------------------------------------

/// Parse a track file's contents into validated points.
///
/// # Errors
///
/// Returns [`EngineError::Track`] for the first malformed or out-of-range line.
pub fn parse_track(contents: &str) -> Result<Vec<GeoPoint>, EngineError> {
    let mut points = Vec::new();
    for (index, raw) in contents.lines().enumerate() {
        let line_no = index.saturating_add(1);
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || is_header(line) {
            continue;
        }
        let track_error = |message: String| EngineError::Track {
            line: line_no,
            message,
        };
        let (lat, lng) = line
            .split_once(',')
            .ok_or_else(|| track_error(format!("expected `latitude,longitude`, got `{line}`")))?;
        let latitude: f64 = lat
            .trim()
            .parse()
            .map_err(|e| track_error(format!("bad latitude `{}`: {e}", lat.trim())))?;
        let longitude: f64 = lng
            .trim()
            .parse()
            .map_err(|e| track_error(format!("bad longitude `{}`: {e}", lng.trim())))?;
        let point = checked_point(latitude, longitude).map_err(|e| track_error(e.to_string()))?;
        points.push(point);
    }
    Ok(points)
}

fn is_header(line: &str) -> bool {
    line.replace(' ', "").eq_ignore_ascii_case("latitude,longitude")
}

// ---------------------------------------------------------------------------
// Sampling gate
// ---------------------------------------------------------------------------

/// Thins raw fixes down to what a [`SamplingPolicy`] allows.
///
/// The first fix always passes. After that a fix passes only when both the
/// minimum interval has elapsed and the minimum displacement is reached,
/// measured from the last fix that passed.
#[derive(Debug, Clone)]
pub struct SampleGate {
    policy: SamplingPolicy,
    last: Option<(u64, GeoPoint)>,
}

impl SampleGate {
    /// A gate that has not admitted anything yet.
    pub const fn new(policy: SamplingPolicy) -> Self {
        Self { policy, last: None }
    }

    /// Decide on a fix taken `at_ms` after the start of the track.
    pub fn admit(&mut self, at_ms: u64, point: GeoPoint) -> bool {
        let admitted = match self.last {
            None => true,
            Some((last_ms, last_point)) => {
                at_ms.saturating_sub(last_ms) >= self.policy.min_interval_ms
                    && distance_m(last_point, point) >= self.policy.min_distance_m
            }
        };
        if admitted {
            self.last = Some((at_ms, point));
        }
        admitted
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Replays a recorded track as the device location.
#[derive(Debug)]
pub struct ReplayLocationProvider {
    track: Arc<Vec<GeoPoint>>,
    interval: Duration,
    /// Most recent fix delivered to any subscriber.
    last_fix: Arc<RwLock<Option<GeoPoint>>>,
    tasks: Mutex<HashMap<u64, JoinHandle<()>>>,
    next_handle: AtomicU64,
}

impl ReplayLocationProvider {
    /// Replay `track`, one raw fix every `interval`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ZeroReplayInterval`] if `interval` is zero.
    pub fn new(track: Vec<GeoPoint>, interval: Duration) -> Result<Self, EngineError> {
        if interval.is_zero() {
            return Err(EngineError::ZeroReplayInterval);
        }
        Ok(Self {
            track: Arc::new(track),
            interval,
            last_fix: Arc::new(RwLock::new(None)),
            tasks: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        })
    }

    /// Load and replay the track file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ZeroReplayInterval`] if `interval` is zero,
    /// [`EngineError::Io`] if the file cannot be read, or
    /// [`EngineError::Track`] if a line is malformed.
    pub fn from_file(path: &Path, interval: Duration) -> Result<Self, EngineError> {
        if interval.is_zero() {
            return Err(EngineError::ZeroReplayInterval);
        }
        let contents = std::fs::read_to_string(path)?;
        let track = parse_track(&contents)?;
        info!(path = %path.display(), fixes = track.len(), "location track loaded");
        Self::new(track, interval)
    }

    /// Number of raw fixes in the track.
    pub fn len(&self) -> usize {
        self.track.len()
    }

    /// Whether the track has no fixes.
    pub fn is_empty(&self) -> bool {
        self.track.is_empty()
    }
}

#[async_trait]
impl LocationProvider for ReplayLocationProvider {
    async fn request_permission(&self) -> Result<PermissionStatus, ServiceError> {
        Ok(PermissionStatus::Granted)
    }

    async fn subscribe(
        &self,
        policy: SamplingPolicy,
    ) -> Result<LocationSubscription, ServiceError> {
        let (tx, rx) = mpsc::channel(SAMPLE_BUFFER);
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        let task = tokio::spawn(replay(
            Arc::clone(&self.track),
            self.interval,
            SampleGate::new(policy),
            Arc::clone(&self.last_fix),
            tx,
        ));
        self.tasks.lock().await.insert(handle, task);
        debug!(handle, "replay subscription opened");
        Ok(LocationSubscription {
            handle: SubscriptionHandle(handle),
            samples: rx,
        })
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) {
        if let Some(task) = self.tasks.lock().await.remove(&handle.0) {
            task.abort();
            debug!(handle = handle.0, "replay subscription closed");
        }
    }
}

#[async_trait]
impl CurrentLocationProvider for ReplayLocationProvider {
    async fn current_location(&self) -> Result<GeoPoint, ServiceError> {
        if let Some(point) = *self.last_fix.read().await {
            return Ok(point);
        }
        self.track
            .first()
            .copied()
            .ok_or_else(|| ServiceError::Location("location track is empty".to_owned()))
    }
}

/// Play `track` into `tx`, then close the stream.
async fn replay(
    track: Arc<Vec<GeoPoint>>,
    interval: Duration,
    mut gate: SampleGate,
    last_fix: Arc<RwLock<Option<GeoPoint>>>,
    tx: mpsc::Sender<GeoPoint>,
) {
    let step_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
    let mut ticker = tokio::time::interval(interval);
    let mut at_ms: u64 = 0;

    for &point in track.iter() {
        ticker.tick().await;
        if gate.admit(at_ms, point) {
            *last_fix.write().await = Some(point);
            if tx.send(point).await.is_err() {
                return;
            }
        }
        at_ms = at_ms.saturating_add(step_ms);
    }
    info!("location track finished");
}
