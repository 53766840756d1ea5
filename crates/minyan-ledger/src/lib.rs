//! Dedup ledger for proximity notifications.
//!
//! The watcher consults this ledger before notifying and records every
//! notification it sends, guaranteeing at most one notification per event
//! per retention window.
//!
//! # Architecture
//!
//! - [`ledger`] -- The [`NotificationLedger`]: owned record set, persisted
//!   as a JSON array through a [`KeyValueStore`].
//! - [`retention`] -- The [`RetentionPolicy`] deciding which records are
//!   still live.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use chrono::{TimeDelta, Utc};
//! use minyan_ledger::NotificationLedger;
//! use minyan_store::MemoryStore;
//! use minyan_types::{EventId, MinyanEvent};
//!
//! # async fn demo() {
//! let mut ledger = NotificationLedger::with_defaults(Arc::new(MemoryStore::new()));
//! ledger.load().await;
//!
//! let event = MinyanEvent {
//!     id: EventId::new(),
//!     latitude: 48.8566,
//!     longitude: 2.3522,
//!     date: Utc::now() + TimeDelta::hours(2),
//!     capacity: 10,
//!     current_count: 7,
//! };
//! ledger.mark_notified(&event).await;
//! assert!(ledger.was_notified(event.id));
//! # }
//! ```
//!
//! [`KeyValueStore`]: minyan_store::KeyValueStore

pub mod ledger;
pub mod retention;

// Re-export primary types at crate root.
pub use ledger::{DEFAULT_STORAGE_KEY, NotificationLedger};
pub use retention::{DEFAULT_MAX_AGE_HOURS, RetentionPolicy};

use minyan_store::StoreError;

/// Errors that can occur while reading or writing the ledger.
///
/// These never escape the public API; the ledger logs and absorbs them.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The backing store failed.
    #[error("ledger storage error: {0}")]
    Store(#[from] StoreError),

    /// The persisted records could not be encoded or decoded.
    #[error("ledger serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
