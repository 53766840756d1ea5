//! Coordinate checks applied where data enters the system.
//!
//! The geometry functions assume well-formed coordinates. Anything read
//! from the network or from disk goes through these checks first.

use minyan_types::{GeoPoint, MinyanEvent};

use crate::error::GeoError;

/// Build a [`GeoPoint`], rejecting out-of-range or non-finite values.
///
/// # Errors
///
/// Returns [`GeoError::InvalidLatitude`] or [`GeoError::InvalidLongitude`].
pub fn checked_point(latitude: f64, longitude: f64) -> Result<GeoPoint, GeoError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(GeoError::InvalidLatitude(latitude));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(GeoError::InvalidLongitude(longitude));
    }
    Ok(GeoPoint::new(latitude, longitude))
}

/// Check the position of an event received from the event service.
///
/// # Errors
///
/// Same as [`checked_point`].
pub fn validate_event(event: &MinyanEvent) -> Result<(), GeoError> {
    checked_point(event.latitude, event.longitude).map(|_| ())
}
