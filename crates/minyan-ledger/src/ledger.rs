//! The notification dedup ledger.
//!
//! [`NotificationLedger`] remembers which events already produced a
//! proximity notification so the watcher sends at most one per event.
//!
//! # Design
//!
//! - **Owned state**: records live in the ledger, loaded once per watcher
//!   start and rewritten in full on every mutation.
//! - **Self-healing load**: expired records are pruned on load and the
//!   pruned set is written back immediately.
//! - **Never fatal**: storage failures are logged and absorbed. A ledger
//!   that cannot read starts empty, which can cause a duplicate
//!   notification but never stops the watcher.
//! - **No blind overwrite**: after a failed read nothing is written until
//!   the stored set has been read back and merged, so an outage never
//!   erases records that were persisted before it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use minyan_store::KeyValueStore;
use minyan_types::{EventId, MinyanEvent, NotifiedRecord};

use crate::LedgerError;
use crate::retention::RetentionPolicy;

/// Storage key used when none is configured.
pub const DEFAULT_STORAGE_KEY: &str = "notified_minyan_events";

/// Persisted record of the events that already triggered a notification.
pub struct NotificationLedger {
    /// Backing key-value store.
    store: Arc<dyn KeyValueStore>,
    /// Key holding the JSON array of records.
    key: String,
    /// Pruning rule.
    retention: RetentionPolicy,
    /// Live records, in insertion order.
    records: Vec<NotifiedRecord>,
    /// Whether [`load`](Self::load) has run in this process.
    loaded: bool,
    /// The last read of the store failed; writes wait for a successful one.
    unread: bool,
}

impl core::fmt::Debug for NotificationLedger {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NotificationLedger")
            .field("key", &self.key)
            .field("retention", &self.retention)
            .field("records", &self.records.len())
            .field("loaded", &self.loaded)
            .field("unread", &self.unread)
            .finish_non_exhaustive()
    }
}

impl NotificationLedger {
    /// Create an unloaded ledger persisting under `key` in `store`.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        key: impl Into<String>,
        retention: RetentionPolicy,
    ) -> Self {
        Self {
            store,
            key: key.into(),
            retention,
            records: Vec::new(),
            loaded: false,
            unread: false,
        }
    }

    /// Create a ledger with the default key and 24 h retention.
    pub fn with_defaults(store: Arc<dyn KeyValueStore>) -> Self {
        Self::new(store, DEFAULT_STORAGE_KEY, RetentionPolicy::default())
    }

    /// Return whether the ledger has been loaded from storage.
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Return the number of live records.
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    /// Return whether the ledger holds no records.
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The live records, oldest first.
    pub fn records(&self) -> &[NotifiedRecord] {
        &self.records
    }

    /// Load persisted records, prune expired ones, and write the pruned
    /// set back.
    pub async fn load(&mut self) {
        self.load_at(Utc::now()).await;
    }

    /// [`load`](Self::load) with an explicit clock reading.
    pub async fn load_at(&mut self, now: DateTime<Utc>) {
        self.loaded = true;
        self.unread = false;

        let stored = match self.read().await {
            Ok(records) => records,
            Err(LedgerError::Serialization(e)) => {
                // Unreadable contents are replaced by the empty set below.
                warn!(key = %self.key, error = %e, "Notification ledger is corrupt, resetting");
                Vec::new()
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to load notification ledger");
                self.records = Vec::new();
                self.unread = true;
                return;
            }
        };

        let stored_count = stored.len();
        self.records = self.retention.retain_live(stored, now);
        debug!(
            key = %self.key,
            kept = self.records.len(),
            pruned = stored_count.saturating_sub(self.records.len()),
            "Notification ledger loaded"
        );

        self.persist().await;
    }

    /// Load the ledger unless it was already loaded in this process.
    pub async fn ensure_loaded(&mut self) {
        if !self.loaded {
            self.load().await;
        }
    }

    /// Whether a notification was already sent for `event_id`.
    pub fn was_notified(&self, event_id: EventId) -> bool {
        self.records.iter().any(|r| r.event_id == event_id)
    }

    /// Record that a notification was sent for `event` and persist.
    pub async fn mark_notified(&mut self, event: &MinyanEvent) {
        self.mark_notified_at(event, Utc::now()).await;
    }

    /// [`mark_notified`](Self::mark_notified) with an explicit clock reading.
    ///
    /// Expired records already in the ledger are dropped before the
    /// rewrite so the persisted set stays bounded over long sessions. The
    /// new record itself is always kept until the next load, even for an
    /// event that starts at `now`.
    pub async fn mark_notified_at(&mut self, event: &MinyanEvent, now: DateTime<Utc>) {
        if self.was_notified(event.id) {
            debug!(event_id = %event.id, "Event already in notification ledger");
            return;
        }

        let earlier = core::mem::take(&mut self.records);
        self.records = self.retention.retain_live(earlier, now);
        self.records.push(NotifiedRecord {
            event_id: event.id,
            notified_at_epoch_ms: now.timestamp_millis(),
            event_date: event.date,
        });

        if self.unread {
            self.recover(now).await;
        }
        self.persist().await;
    }

    /// Forget every record and persist the empty set.
    pub async fn clear(&mut self) {
        self.records.clear();
        self.unread = false;
        self.persist().await;
    }

    /// Retry the read that failed at load and merge its live records
    /// ahead of the in-memory ones.
    async fn recover(&mut self, now: DateTime<Utc>) {
        match self.read().await {
            Ok(stored) => {
                let mut merged = self.retention.retain_live(stored, now);
                merged.retain(|record| !self.was_notified(record.event_id));
                let recovered = merged.len();
                merged.append(&mut self.records);
                self.records = merged;
                self.unread = false;
                debug!(key = %self.key, recovered, "Notification ledger recovered");
            }
            Err(LedgerError::Serialization(e)) => {
                warn!(key = %self.key, error = %e, "Notification ledger is corrupt, resetting");
                self.unread = false;
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Notification ledger still unreadable");
            }
        }
    }

    async fn read(&self) -> Result<Vec<NotifiedRecord>, LedgerError> {
        match self.store.get(&self.key).await? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    async fn write(&self) -> Result<(), LedgerError> {
        let json = serde_json::to_string(&self.records)?;
        self.store.set(&self.key, &json).await?;
        Ok(())
    }

    /// Write the records, logging instead of failing.
    async fn persist(&self) {
        if self.unread {
            debug!(key = %self.key, "Store unreadable, keeping notification ledger in memory");
            return;
        }
        if let Err(e) = self.write().await {
            warn!(key = %self.key, error = %e, "Failed to persist notification ledger");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{TimeDelta, TimeZone};
    use minyan_store::{MemoryStore, StoreError};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 14, 12, 0, 0).unwrap()
    }

    fn event_in(hours: i64) -> MinyanEvent {
        MinyanEvent {
            id: EventId::new(),
            latitude: 48.8566,
            longitude: 2.3522,
            date: now() + TimeDelta::hours(hours),
            capacity: 10,
            current_count: 4,
        }
    }

    fn memory() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new())
    }

    async fn stored(store: &MemoryStore) -> Vec<NotifiedRecord> {
        let json = store.get(DEFAULT_STORAGE_KEY).await.unwrap().unwrap();
        serde_json::from_str(&json).unwrap()
    }

    /// A store whose every call fails, counting the attempts.
    #[derive(Default)]
    struct BrokenStore {
        writes: AtomicUsize,
    }

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Config(format!("offline: {key}")))
        }

        async fn set(&self, key: &str, _value: &str) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Config(format!("offline: {key}")))
        }
    }

    /// Delegates to a memory store but fails the first `failing_reads` reads.
    struct FlakyStore {
        inner: Arc<MemoryStore>,
        failing_reads: AtomicUsize,
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            let failing = self
                .failing_reads
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(StoreError::Config(format!("timeout: {key}")));
            }
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.inner.set(key, value).await
        }
    }

    #[tokio::test]
    async fn new_ledger_is_empty_and_unloaded() {
        let ledger = NotificationLedger::with_defaults(memory());
        assert!(ledger.is_empty());
        assert!(!ledger.is_loaded());
    }

    #[tokio::test]
    async fn mark_then_was_notified() {
        let store = memory();
        let mut ledger = NotificationLedger::with_defaults(store.clone());
        ledger.load_at(now()).await;

        let event = event_in(3);
        assert!(!ledger.was_notified(event.id));
        ledger.mark_notified_at(&event, now()).await;
        assert!(ledger.was_notified(event.id));

        let persisted = stored(&store).await;
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted.first().map(|r| r.event_id), Some(event.id));
    }

    #[tokio::test]
    async fn marking_twice_keeps_one_record() {
        let mut ledger = NotificationLedger::with_defaults(memory());
        ledger.load_at(now()).await;
        let event = event_in(3);
        ledger.mark_notified_at(&event, now()).await;
        ledger.mark_notified_at(&event, now()).await;
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn records_survive_a_reload() {
        let store = memory();
        let event = event_in(3);
        {
            let mut ledger = NotificationLedger::with_defaults(store.clone());
            ledger.load_at(now()).await;
            ledger.mark_notified_at(&event, now()).await;
        }
        let mut reloaded = NotificationLedger::with_defaults(store);
        reloaded.load_at(now() + TimeDelta::hours(1)).await;
        assert!(reloaded.was_notified(event.id));
    }

    #[tokio::test]
    async fn load_prunes_and_rewrites() {
        let store = memory();
        let stale = event_in(30);
        let started = event_in(2);
        let live = event_in(40);
        {
            let mut ledger = NotificationLedger::with_defaults(store.clone());
            ledger.load_at(now()).await;
            ledger.mark_notified_at(&stale, now()).await;
            ledger.mark_notified_at(&started, now()).await;
            ledger.mark_notified_at(&live, now() + TimeDelta::hours(5)).await;
        }

        // 25 h later: `stale` was notified more than 24 h ago and
        // `started` has begun; only `live` remains.
        let later = now() + TimeDelta::hours(25);
        let mut ledger = NotificationLedger::with_defaults(store.clone());
        ledger.load_at(later).await;

        assert!(!ledger.was_notified(stale.id));
        assert!(!ledger.was_notified(started.id));
        assert!(ledger.was_notified(live.id));
        assert_eq!(stored(&store).await.len(), 1);
    }

    #[tokio::test]
    async fn corrupt_contents_are_reset() {
        let store = memory();
        store.set(DEFAULT_STORAGE_KEY, "{not json").await.unwrap();

        let mut ledger = NotificationLedger::with_defaults(store.clone());
        ledger.load_at(now()).await;

        assert!(ledger.is_loaded());
        assert!(ledger.is_empty());
        assert!(stored(&store).await.is_empty());
    }

    #[tokio::test]
    async fn unavailable_store_degrades_to_in_memory() {
        let store = Arc::new(BrokenStore::default());
        let mut ledger = NotificationLedger::with_defaults(store.clone());
        ledger.load_at(now()).await;

        // A failed read is not followed by a rewrite.
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
        assert!(ledger.is_loaded());

        let event = event_in(3);
        ledger.mark_notified_at(&event, now()).await;
        assert!(ledger.was_notified(event.id));
        // Still unreadable, so nothing is overwritten.
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn outage_at_load_does_not_erase_stored_records() {
        let inner = memory();
        let earlier = event_in(5);
        {
            let mut ledger = NotificationLedger::with_defaults(inner.clone());
            ledger.load_at(now()).await;
            ledger.mark_notified_at(&earlier, now()).await;
        }

        let store = Arc::new(FlakyStore {
            inner: inner.clone(),
            failing_reads: AtomicUsize::new(1),
        });
        let mut ledger = NotificationLedger::with_defaults(store);
        ledger.load_at(now()).await;
        assert!(!ledger.was_notified(earlier.id));

        let later = event_in(3);
        ledger.mark_notified_at(&later, now()).await;

        assert!(ledger.was_notified(earlier.id));
        assert!(ledger.was_notified(later.id));
        let ids: Vec<EventId> = stored(&inner).await.iter().map(|r| r.event_id).collect();
        assert_eq!(ids, vec![earlier.id, later.id]);
    }

    #[tokio::test]
    async fn event_starting_now_stays_marked() {
        let mut ledger = NotificationLedger::with_defaults(memory());
        ledger.load_at(now()).await;

        let event = event_in(0);
        ledger.mark_notified_at(&event, now()).await;
        assert!(ledger.was_notified(event.id));

        // A later mark prunes it along with other expired records.
        ledger.mark_notified_at(&event_in(3), now() + TimeDelta::minutes(1)).await;
        assert!(!ledger.was_notified(event.id));
    }

    #[tokio::test]
    async fn ensure_loaded_runs_once() {
        let store = memory();
        let mut ledger = NotificationLedger::with_defaults(store.clone());
        ledger.ensure_loaded().await;
        assert!(ledger.is_loaded());

        let mut event = event_in(3);
        event.date = Utc::now() + TimeDelta::hours(3);
        ledger.mark_notified(&event).await;
        ledger.ensure_loaded().await;
        assert!(ledger.was_notified(event.id));
    }

    #[tokio::test]
    async fn clear_empties_storage() {
        let store = memory();
        let mut ledger = NotificationLedger::with_defaults(store.clone());
        ledger.load_at(now()).await;
        ledger.mark_notified_at(&event_in(3), now()).await;

        ledger.clear().await;
        assert!(ledger.is_empty());
        assert!(stored(&store).await.is_empty());
    }

    #[tokio::test]
    async fn custom_key_and_retention() {
        let store = memory();
        let mut ledger =
            NotificationLedger::new(store.clone(), "alt_key", RetentionPolicy::from_hours(1));
        ledger.load_at(now()).await;
        ledger.mark_notified_at(&event_in(5), now()).await;

        assert!(store.get("alt_key").await.unwrap().is_some());
        assert!(store.get(DEFAULT_STORAGE_KEY).await.unwrap().is_none());

        let mut reloaded =
            NotificationLedger::new(store, "alt_key", RetentionPolicy::from_hours(1));
        reloaded.load_at(now() + TimeDelta::hours(2)).await;
        assert!(reloaded.is_empty());
    }
}
