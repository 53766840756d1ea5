//! Great-circle distance and privacy-preserving grid clustering.
//!
//! This crate holds the pure geometry of the proximity core. Nothing here
//! performs I/O or keeps state between calls.
//!
//! # Modules
//!
//! - [`distance`] -- Haversine distance in meters.
//! - [`grid`] -- Fixed lat/lng grid, sector ids, and zoom-driven cell sizing.
//! - [`cluster`] -- One [`Cluster`] per occupied grid cell, centered on the
//!   cell midpoint.
//! - [`validate`] -- Range checks for coordinates entering the system.
//! - [`error`] -- [`GeoError`] for rejected input.
//!
//! [`Cluster`]: minyan_types::Cluster

pub mod cluster;
pub mod distance;
pub mod error;
pub mod grid;
pub mod validate;

// Re-export primary items at crate root.
pub use cluster::{cluster_events, cluster_for_span};
pub use distance::{EARTH_RADIUS_M, distance_m};
pub use error::GeoError;
pub use grid::{GridSize, KM_PER_DEGREE};
pub use validate::{checked_point, validate_event};
