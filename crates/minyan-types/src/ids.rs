//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Events are owned by the remote event service, which hands out UUIDs.
//! Wrapping them keeps event ids from being mixed up with any other UUID
//! flowing through the watcher (subscription handles, request ids).

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Unique identifier for a minyan event, as issued by the event service.
///
/// Serializes as the bare UUID string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EventId(pub Uuid);

impl EventId {
    /// A fresh time-ordered (v7) id, for tests and local fixtures.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// The wrapped [`Uuid`].
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for EventId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for EventId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<EventId> for Uuid {
    fn from(id: EventId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_serializes_as_bare_uuid() {
        let id = EventId::new();
        let json = serde_json::to_string(&id).ok();
        assert_eq!(json, Some(format!("\"{}\"", id.into_inner())));
    }

    #[test]
    fn id_roundtrip_serde() {
        let original = EventId::new();
        let json = serde_json::to_string(&original).unwrap_or_default();
        let restored: Result<EventId, _> = serde_json::from_str(&json);
        assert_eq!(restored.ok(), Some(original));
    }

    #[test]
    fn id_converts_to_and_from_uuid() {
        let raw = Uuid::now_v7();
        let id = EventId::from(raw);
        assert_eq!(Uuid::from(id), raw);
        assert_eq!(id.into_inner(), raw);
    }

    #[test]
    fn id_display_matches_uuid() {
        let id = EventId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }
}
