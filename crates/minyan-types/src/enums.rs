//! Enumeration types for the proximity watcher.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Lifecycle state of a proximity watcher.
///
/// A watcher starts `Stopped`, moves to `Running` on a successful
/// `start()`, and returns to `Stopped` on `stop()` or when its
/// configuration is updated with `enabled = false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum WatcherState {
    /// No location subscription is active.
    #[default]
    Stopped,
    /// A location subscription is active and samples are being checked.
    Running,
}

/// Outcome of asking the platform for location permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PermissionStatus {
    /// The user granted access to the device location.
    Granted,
    /// The user refused, or the platform could not ask.
    Denied,
}

impl PermissionStatus {
    /// Whether location access may be used.
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}
