//! External collaborators consumed by the watcher.
//!
//! The core never talks to the network, the location hardware or the
//! notification transport directly. Each of those is a trait object held
//! in [`WatcherServices`], so the binary wires real adapters and tests
//! wire recording mocks.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use minyan_types::{GeoPoint, MinyanEvent, PermissionStatus, SamplingPolicy};

/// Errors reported by collaborators.
///
/// None of these escape the watcher: they are logged and absorbed.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A remote call failed in transit or returned an error status.
    #[error("network error: {0}")]
    Network(String),

    /// The collaborator is not available right now.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// A local notification could not be handed to the transport.
    #[error("notification dispatch failed: {0}")]
    Dispatch(String),

    /// The location subsystem refused or failed a request.
    #[error("location error: {0}")]
    Location(String),
}

// ---------------------------------------------------------------------------
// Event query
// ---------------------------------------------------------------------------

/// The remote event service.
#[async_trait]
pub trait EventQueryService: Send + Sync {
    /// Events within `radius_km` of `point` starting in `[on_or_after, before)`.
    ///
    /// The radius filter is advisory; callers re-check distances locally.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Network`] when the query cannot be completed.
    async fn list_nearby(
        &self,
        point: GeoPoint,
        radius_km: f64,
        on_or_after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Vec<MinyanEvent>, ServiceError>;

    /// Report the device's current position to the service.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Network`] when the report cannot be delivered.
    async fn report_location(&self, point: GeoPoint) -> Result<(), ServiceError>;
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// Opaque identifier of a live location subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// A live location subscription: its handle and the sample stream.
///
/// The stream ends when the provider drops its sender, which the watcher
/// treats as the subscription going away.
#[derive(Debug)]
pub struct LocationSubscription {
    /// Handle to pass back to [`LocationProvider::unsubscribe`].
    pub handle: SubscriptionHandle,
    /// Location samples, already thinned by the sampling policy.
    pub samples: mpsc::Receiver<GeoPoint>,
}

/// The device location subsystem.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Ask for permission to receive location updates.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Location`] if the prompt itself fails.
    async fn request_permission(&self) -> Result<PermissionStatus, ServiceError>;

    /// Open a subscription delivering samples according to `policy`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Location`] if the subscription cannot be opened.
    async fn subscribe(&self, policy: SamplingPolicy)
    -> Result<LocationSubscription, ServiceError>;

    /// Cancel a subscription. Unknown handles are ignored.
    async fn unsubscribe(&self, handle: SubscriptionHandle);
}

/// One-shot access to the current position, used by foreground checks.
#[async_trait]
pub trait CurrentLocationProvider: Send + Sync {
    /// The device's current position.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Location`] if no fix is available.
    async fn current_location(&self) -> Result<GeoPoint, ServiceError>;
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// A local notification ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalNotification {
    /// Title line.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Key-value payload handed to the app when the notification is opened.
    pub data: BTreeMap<String, String>,
}

/// The local notification transport. Fire-and-forget.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Hand a notification to the transport.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Dispatch`] if the transport rejects it.
    async fn send_local(&self, notification: LocalNotification) -> Result<(), ServiceError>;
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// Every collaborator the watcher needs, shared behind `Arc`s.
#[derive(Clone)]
pub struct WatcherServices {
    /// Remote event service.
    pub events: Arc<dyn EventQueryService>,
    /// Location subscription source.
    pub location: Arc<dyn LocationProvider>,
    /// One-shot position source for foreground checks.
    pub current_location: Arc<dyn CurrentLocationProvider>,
    /// Local notification transport.
    pub notifier: Arc<dyn NotificationDispatcher>,
}

impl std::fmt::Debug for WatcherServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherServices").finish_non_exhaustive()
    }
}
