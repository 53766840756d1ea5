//! Shared type definitions for the Minyan proximity core.
//!
//! This crate is the single source of truth for the data model used by the
//! geometry, ledger and watcher crates. Types consumed by the map renderer
//! flow to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for entity identifiers
//! - [`enums`] -- Watcher lifecycle and permission enums
//! - [`structs`] -- Coordinates, events, clusters, ledger records, settings

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{PermissionStatus, WatcherState};
pub use ids::EventId;
pub use structs::{
    Cluster, GeoPoint, MinyanEvent, NotifiedRecord, ProximityConfig, SamplingPolicy, SectorId,
    URGENT_MAX_SPOTS_REMAINING,
};
