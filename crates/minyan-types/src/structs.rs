//! Core data model: coordinates, events, clusters, ledger records and the
//! watcher's runtime settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::EventId;

/// Events with between 1 and this many free places are flagged urgent.
pub const URGENT_MAX_SPOTS_REMAINING: u32 = 3;

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// A WGS84 coordinate in decimal degrees.
///
/// Range checking happens at ingestion (see `minyan_geo::validate`); a
/// `GeoPoint` that reaches the geometry code is assumed to be well formed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GeoPoint {
    /// Latitude in degrees, positive north.
    pub latitude: f64,
    /// Longitude in degrees, positive east.
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a point from latitude and longitude in degrees.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A minyan gathering as returned by the event service.
///
/// The core never mutates events; it only reads their position, start
/// time and attendance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MinyanEvent {
    /// Service-issued identifier.
    pub id: EventId,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Start instant.
    pub date: DateTime<Utc>,
    /// Number of participants the organiser is looking for.
    pub capacity: u32,
    /// Number of participants already registered.
    pub current_count: u32,
}

impl MinyanEvent {
    /// The event's position.
    pub const fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Free places left, zero when the event is full or overbooked.
    pub const fn spots_remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.current_count)
    }

    /// Whether the event is close to reaching its quorum.
    pub const fn is_urgent(&self) -> bool {
        let remaining = self.spots_remaining();
        remaining >= 1 && remaining <= URGENT_MAX_SPOTS_REMAINING
    }
}

// ---------------------------------------------------------------------------
// Clusters
// ---------------------------------------------------------------------------

/// Grid cell coordinates: `floor(lat / cell)` and `floor(lng / cell)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SectorId {
    /// Row index along the latitude axis.
    pub lat_index: i64,
    /// Column index along the longitude axis.
    pub lng_index: i64,
}

impl core::fmt::Display for SectorId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "sector_{}_{}", self.lat_index, self.lng_index)
    }
}

/// A map-level aggregate of the events sharing one grid cell.
///
/// `center` is the midpoint of the cell, never a member's position, so a
/// single-event cluster does not disclose where the event actually is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Cluster {
    /// The grid cell this cluster was built from.
    pub id: SectorId,
    /// Grid-snapped display center.
    pub center: GeoPoint,
    /// Member events, in input order.
    pub members: Vec<MinyanEvent>,
    /// Display radius in meters; encloses every member.
    pub radius_m: f64,
    /// Whether any member is urgent (see [`MinyanEvent::is_urgent`]).
    pub has_urgent: bool,
}

impl Cluster {
    /// Number of member events.
    pub fn count(&self) -> usize {
        self.members.len()
    }
}

// ---------------------------------------------------------------------------
// Dedup ledger
// ---------------------------------------------------------------------------

/// One entry of the notification dedup ledger.
///
/// Persisted as a JSON array of these records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifiedRecord {
    /// The event a notification was sent for.
    pub event_id: EventId,
    /// When the notification was sent, in Unix milliseconds.
    pub notified_at_epoch_ms: i64,
    /// Start instant of the event, used for pruning.
    pub event_date: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Watcher settings
// ---------------------------------------------------------------------------

/// Caller-supplied proximity settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ProximityConfig {
    /// Whether proximity notifications are wanted at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Events farther than this are never notified.
    #[serde(default = "default_radius_meters")]
    pub radius_meters: f64,
}

impl ProximityConfig {
    /// Create a config with the given switch and radius.
    pub const fn new(enabled: bool, radius_meters: f64) -> Self {
        Self {
            enabled,
            radius_meters,
        }
    }

    /// The radius in kilometers, as the event query expects it.
    pub fn radius_km(&self) -> f64 {
        self.radius_meters / 1000.0
    }
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self::new(true, default_radius_meters())
    }
}

/// How often the location subsystem should deliver samples.
///
/// A sample is delivered only once both thresholds are exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingPolicy {
    /// Minimum time between two samples, in milliseconds.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    /// Minimum displacement between two samples, in meters.
    #[serde(default = "default_min_distance_m")]
    pub min_distance_m: f64,
}

impl SamplingPolicy {
    /// The minimum interval as a [`core::time::Duration`].
    pub const fn min_interval(&self) -> core::time::Duration {
        core::time::Duration::from_millis(self.min_interval_ms)
    }
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
            min_distance_m: default_min_distance_m(),
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_radius_meters() -> f64 {
    500.0
}

const fn default_min_interval_ms() -> u64 {
    5 * 60 * 1000
}

const fn default_min_distance_m() -> f64 {
    100.0
}
