//! Fixed-size lat/lng grid used to quantize event positions.
//!
//! Cell boundaries depend only on the cell size, so the same event always
//! lands in the same cell regardless of which other events are on the map.
//! The map layer picks the cell size from its current zoom via
//! [`GridSize::for_visible_span`].

use minyan_types::{GeoPoint, SectorId};

use crate::error::GeoError;

/// Kilometers per degree used to convert cell sizes to degrees.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Visible latitude span thresholds (degrees) and the cell size (km) used
/// below each threshold. Spans at or above the last threshold use
/// [`GridSize::WIDEST`].
const SPAN_TABLE: [(f64, GridSize); 4] = [
    (0.02, GridSize { km: 0.5 }),
    (0.05, GridSize { km: 1.0 }),
    (0.10, GridSize { km: 2.0 }),
    (0.30, GridSize { km: 3.0 }),
];

/// Edge length of a square grid cell.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct GridSize {
    km: f64,
}

impl GridSize {
    /// Cell size used for the most zoomed-out views.
    pub const WIDEST: Self = Self { km: 5.0 };

    /// Build a grid size from a cell edge in kilometers.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidGridSize`] unless `km` is finite and
    /// strictly positive.
    pub fn from_km(km: f64) -> Result<Self, GeoError> {
        if km.is_finite() && km > 0.0 {
            Ok(Self { km })
        } else {
            Err(GeoError::InvalidGridSize(km))
        }
    }

    /// Pick the cell size for a map showing `span_deg` degrees of latitude.
    ///
    /// | visible span | cell |
    /// |---|---|
    /// | < 0.02 | 0.5 km |
    /// | < 0.05 | 1 km |
    /// | < 0.10 | 2 km |
    /// | < 0.30 | 3 km |
    /// | otherwise | 5 km |
    pub fn for_visible_span(span_deg: f64) -> Self {
        SPAN_TABLE
            .iter()
            .find(|(threshold, _)| span_deg < *threshold)
            .map_or(Self::WIDEST, |&(_, size)| size)
    }

    /// Cell edge in kilometers.
    pub const fn km(self) -> f64 {
        self.km
    }

    /// Cell edge in degrees.
    pub fn degrees(self) -> f64 {
        self.km / KM_PER_DEGREE
    }

    /// The cell containing `point`.
    #[allow(clippy::cast_possible_truncation)] // Cell indices of valid coordinates fit in i64.
    pub fn sector_of(self, point: GeoPoint) -> SectorId {
        let cell = self.degrees();
        SectorId {
            lat_index: (point.latitude / cell).floor() as i64,
            lng_index: (point.longitude / cell).floor() as i64,
        }
    }

    /// Geometric midpoint of `sector`.
    #[allow(clippy::cast_precision_loss)] // Indices are far below 2^52.
    pub fn sector_center(self, sector: SectorId) -> GeoPoint {
        let cell = self.degrees();
        let half = cell / 2.0;
        GeoPoint::new(
            (sector.lat_index as f64).mul_add(cell, half),
            (sector.lng_index as f64).mul_add(cell, half),
        )
    }
}
