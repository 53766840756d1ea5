//! Key-value storage for the Minyan proximity core.
//!
//! The dedup ledger only needs `get`/`set` on string values. This crate
//! defines that seam as [`KeyValueStore`] and ships three backends:
//!
//! ```text
//! NotificationLedger
//!     |
//!     +-- KeyValueStore --> MemoryStore     (tests, persistence off)
//!                       --> FileStore       (one file per key, atomic rename)
//!                       --> DragonflyStore  (Redis protocol via fred)
//! ```
//!
//! # Modules
//!
//! - [`memory`] -- In-process map
//! - [`file`] -- State directory on disk
//! - [`dragonfly`] -- `Dragonfly`/Redis
//! - [`error`] -- Shared error type

pub mod dragonfly;
pub mod error;
pub mod file;
pub mod memory;

use async_trait::async_trait;

// Re-export primary types for convenience.
pub use dragonfly::DragonflyStore;
pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;

/// String key-value persistence.
///
/// Implementations must be safe to share across tasks. A single process is
/// assumed to be the only writer for any key.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value at `key`, or `None` if it was never written.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the value at `key`.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}
