//! Recording mock collaborators shared by the watcher and check tests.

#![allow(dead_code, clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::mpsc;

use minyan_core::{
    CurrentLocationProvider, EventQueryService, LocalNotification, LocationProvider,
    LocationSubscription, NotificationDispatcher, ServiceError, SubscriptionHandle,
    WatcherServices,
};
use minyan_ledger::NotificationLedger;
use minyan_store::{KeyValueStore, MemoryStore};
use minyan_types::{EventId, GeoPoint, MinyanEvent, PermissionStatus, SamplingPolicy};

/// Place de l'Hôtel de Ville, Paris.
pub const HERE: GeoPoint = GeoPoint::new(48.8566, 2.3522);

/// About 133 m north-east of [`HERE`].
pub const NEAR: GeoPoint = GeoPoint::new(48.8576, 2.3532);

/// About 3.7 km north of [`HERE`].
pub const FAR: GeoPoint = GeoPoint::new(48.89, 2.35);

/// An event at `point` starting `hours` after `now`.
pub fn event_at(point: GeoPoint, now: DateTime<Utc>, hours: i64) -> MinyanEvent {
    MinyanEvent {
        id: EventId::new(),
        latitude: point.latitude,
        longitude: point.longitude,
        date: now + TimeDelta::hours(hours),
        capacity: 10,
        current_count: 4,
    }
}

/// An event at `point` starting three hours from the real clock.
pub fn upcoming_at(point: GeoPoint) -> MinyanEvent {
    event_at(point, Utc::now(), 3)
}

// ---------------------------------------------------------------------------
// Event service
// ---------------------------------------------------------------------------

/// A query recorded by [`MockEvents`].
#[derive(Debug, Clone, Copy)]
pub struct RecordedQuery {
    pub point: GeoPoint,
    pub radius_km: f64,
    pub on_or_after: DateTime<Utc>,
    pub before: DateTime<Utc>,
}

#[derive(Default)]
pub struct MockEvents {
    pub events: Mutex<Vec<MinyanEvent>>,
    pub queries: Mutex<Vec<RecordedQuery>>,
    pub reports: Mutex<Vec<GeoPoint>>,
    pub fail_query: AtomicBool,
    pub fail_report: AtomicBool,
    pub delay_ms: AtomicU64,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockEvents {
    pub fn with_events(events: Vec<MinyanEvent>) -> Self {
        let mock = Self::default();
        *mock.events.lock().unwrap() = events;
        mock
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn report_count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }
}

#[async_trait]
impl EventQueryService for MockEvents {
    async fn list_nearby(
        &self,
        point: GeoPoint,
        radius_km: f64,
        on_or_after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Vec<MinyanEvent>, ServiceError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        self.queries.lock().unwrap().push(RecordedQuery {
            point,
            radius_km,
            on_or_after,
            before,
        });
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_query.load(Ordering::SeqCst) {
            return Err(ServiceError::Network("connection refused".to_owned()));
        }
        Ok(self.events.lock().unwrap().clone())
    }

    async fn report_location(&self, point: GeoPoint) -> Result<(), ServiceError> {
        if self.fail_report.load(Ordering::SeqCst) {
            return Err(ServiceError::Network("timeout".to_owned()));
        }
        self.reports.lock().unwrap().push(point);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

pub struct MockLocation {
    pub permission: Mutex<PermissionStatus>,
    pub policies: Mutex<Vec<SamplingPolicy>>,
    pub unsubscribed: Mutex<Vec<SubscriptionHandle>>,
    sender: Mutex<Option<mpsc::Sender<GeoPoint>>>,
    next_handle: AtomicU64,
}

impl MockLocation {
    pub fn granting() -> Self {
        Self::with_permission(PermissionStatus::Granted)
    }

    pub fn denying() -> Self {
        Self::with_permission(PermissionStatus::Denied)
    }

    fn with_permission(permission: PermissionStatus) -> Self {
        Self {
            permission: Mutex::new(permission),
            policies: Mutex::new(Vec::new()),
            unsubscribed: Mutex::new(Vec::new()),
            sender: Mutex::new(None),
            next_handle: AtomicU64::new(1),
        }
    }

    pub fn subscribe_count(&self) -> usize {
        self.policies.lock().unwrap().len()
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.unsubscribed.lock().unwrap().len()
    }

    /// Push a sample into the live subscription. Returns `false` if none.
    pub async fn emit(&self, point: GeoPoint) -> bool {
        let sender = self.sender.lock().unwrap().clone();
        match sender {
            Some(sender) => sender.send(point).await.is_ok(),
            None => false,
        }
    }

    /// End the live subscription's stream.
    pub fn close(&self) {
        self.sender.lock().unwrap().take();
    }
}

#[async_trait]
impl LocationProvider for MockLocation {
    async fn request_permission(&self) -> Result<PermissionStatus, ServiceError> {
        Ok(*self.permission.lock().unwrap())
    }

    async fn subscribe(
        &self,
        policy: SamplingPolicy,
    ) -> Result<LocationSubscription, ServiceError> {
        let (tx, rx) = mpsc::channel(16);
        *self.sender.lock().unwrap() = Some(tx);
        self.policies.lock().unwrap().push(policy);
        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        Ok(LocationSubscription {
            handle,
            samples: rx,
        })
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.unsubscribed.lock().unwrap().push(handle);
        self.sender.lock().unwrap().take();
    }
}

/// Current-location source returning a fixed point, or failing when `None`.
pub struct FixedLocation(pub Option<GeoPoint>);

#[async_trait]
impl CurrentLocationProvider for FixedLocation {
    async fn current_location(&self) -> Result<GeoPoint, ServiceError> {
        self.0
            .ok_or_else(|| ServiceError::Location("no fix".to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockNotifier {
    pub sent: Mutex<Vec<LocalNotification>>,
    /// Number of upcoming sends to reject.
    pub fail_next: AtomicUsize,
}

impl MockNotifier {
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// `eventId` payloads of every accepted notification, in order.
    pub fn sent_ids(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|n| n.data.get("eventId").cloned())
            .collect()
    }
}

#[async_trait]
impl NotificationDispatcher for MockNotifier {
    async fn send_local(&self, notification: LocalNotification) -> Result<(), ServiceError> {
        let rejected = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if rejected {
            return Err(ServiceError::Dispatch("transport offline".to_owned()));
        }
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// All mocks plus the store, with a [`WatcherServices`] built from them.
pub struct Harness {
    pub events: Arc<MockEvents>,
    pub location: Arc<MockLocation>,
    pub notifier: Arc<MockNotifier>,
    pub store: Arc<MemoryStore>,
    pub services: WatcherServices,
}

impl Harness {
    pub fn new(events: Vec<MinyanEvent>) -> Self {
        Self::build(events, MockLocation::granting(), Some(HERE))
    }

    pub fn build(
        events: Vec<MinyanEvent>,
        location: MockLocation,
        current: Option<GeoPoint>,
    ) -> Self {
        let events = Arc::new(MockEvents::with_events(events));
        let location = Arc::new(location);
        let notifier = Arc::new(MockNotifier::default());
        let services = WatcherServices {
            events: Arc::clone(&events) as Arc<dyn EventQueryService>,
            location: Arc::clone(&location) as Arc<dyn LocationProvider>,
            current_location: Arc::new(FixedLocation(current)),
            notifier: Arc::clone(&notifier) as Arc<dyn NotificationDispatcher>,
        };
        Self {
            events,
            location,
            notifier,
            store: Arc::new(MemoryStore::new()),
            services,
        }
    }

    /// A fresh ledger over the harness store.
    pub fn ledger(&self) -> NotificationLedger {
        NotificationLedger::with_defaults(Arc::clone(&self.store) as Arc<dyn KeyValueStore>)
    }
}

/// Poll `condition` for up to two seconds.
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
