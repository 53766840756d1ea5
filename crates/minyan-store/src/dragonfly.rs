//! `Dragonfly` (Redis-compatible) backend.
//!
//! Useful when the watcher runs as a server-side companion and its state
//! directory is ephemeral. Values are stored as plain strings under the
//! caller's key, optionally namespaced with a prefix.

use async_trait::async_trait;
use fred::prelude::*;

use crate::KeyValueStore;
use crate::error::StoreError;

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
#[derive(Clone)]
pub struct DragonflyStore {
    client: Client,
    prefix: String,
}

impl DragonflyStore {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`. Every key is stored
    /// as `{prefix}{key}`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the URL cannot be parsed.
    /// Returns [`StoreError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str, prefix: &str) -> Result<Self, StoreError> {
        let config = Config::from_url(url)
            .map_err(|e| StoreError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!(prefix, "Connected to Dragonfly");
        Ok(Self {
            client,
            prefix: prefix.to_owned(),
        })
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }
}

#[async_trait]
impl KeyValueStore for DragonflyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value: Option<String> = self.client.get(self.namespaced(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _: () = self
            .client
            .set(self.namespaced(key), value, None, None, false)
            .await?;
        Ok(())
    }
}
