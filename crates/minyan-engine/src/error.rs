//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure that can abort startup. Once the
//! watcher runs, errors are absorbed inside it and never reach `main`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: minyan_core::ConfigError,
    },

    /// The ledger's backing store could not be opened.
    #[error("storage error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: minyan_store::StoreError,
    },

    /// The location track could not be read.
    #[error("failed to read location track: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A line of the location track is malformed.
    #[error("location track line {line}: {message}")]
    Track {
        /// 1-based line number.
        line: usize,
        /// What is wrong with it.
        message: String,
    },

    /// The replay interval is zero.
    #[error("replay interval must be at least 1 ms")]
    ZeroReplayInterval,

    /// The HTTP client could not be built.
    #[error("HTTP client error: {message}")]
    Http {
        /// Description of the failure.
        message: String,
    },
}
