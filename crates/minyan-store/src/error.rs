//! Error types for the storage layer.
//!
//! All backends report failures through [`StoreError`], wrapping the
//! underlying I/O or [`fred`] error.

/// Errors that can occur while reading or writing a key.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A `Dragonfly`/Redis operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// The key cannot be used by this backend.
    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
