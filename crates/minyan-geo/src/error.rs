//! Error types for the `minyan-geo` crate.
//!
//! Distance and clustering are total over well-formed input and never fail.
//! These errors are only produced by the ingestion validators and by
//! [`GridSize::from_km`](crate::grid::GridSize::from_km).

/// Errors raised when untrusted input does not describe a usable geometry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeoError {
    /// Latitude outside `[-90, 90]` or not a finite number.
    #[error("latitude out of range: {0}")]
    InvalidLatitude(f64),

    /// Longitude outside `[-180, 180]` or not a finite number.
    #[error("longitude out of range: {0}")]
    InvalidLongitude(f64),

    /// Grid cell size that is zero, negative or not finite.
    #[error("grid cell size must be a positive number of kilometers, got {0}")]
    InvalidGridSize(f64),
}
