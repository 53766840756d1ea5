//! Process-local store, lost on exit.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::KeyValueStore;
use crate::error::StoreError;

/// A [`KeyValueStore`] backed by a map in memory.
///
/// Used in tests and when persistence is switched off in the config.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}
