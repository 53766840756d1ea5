//! Privacy-preserving clustering of events for the map.
//!
//! Events are bucketed by grid cell ([`GridSize::sector_of`]); each
//! non-empty cell becomes one [`Cluster`]. The displayed center is the cell
//! midpoint rather than the members' centroid, so repeated queries never
//! converge on a real event position, even for a cell holding one event.
//!
//! Output is deterministic: clusters are ordered by sector and members keep
//! their input order, so shuffling the input changes member order inside a
//! cluster but never which cluster an event belongs to or where it is drawn.

use std::collections::BTreeMap;

use minyan_types::{Cluster, MinyanEvent, SectorId};

use crate::distance::distance_m;
use crate::grid::GridSize;

/// Margin applied to the farthest member distance.
pub const RADIUS_MARGIN: f64 = 1.2;

/// Minimum radius, as a fraction of the cell edge.
pub const MIN_RADIUS_CELL_FRACTION: f64 = 0.3;

/// Group `events` into one cluster per occupied grid cell.
///
/// Every event appears in exactly one cluster. An empty slice yields an
/// empty list.
pub fn cluster_events(events: &[MinyanEvent], grid: GridSize) -> Vec<Cluster> {
    let mut sectors: BTreeMap<SectorId, Vec<MinyanEvent>> = BTreeMap::new();
    for event in events {
        sectors
            .entry(grid.sector_of(event.position()))
            .or_default()
            .push(event.clone());
    }

    sectors
        .into_iter()
        .map(|(sector, members)| build_cluster(sector, members, grid))
        .collect()
}

/// Cluster `events` with the cell size matching a visible latitude span.
pub fn cluster_for_span(events: &[MinyanEvent], span_deg: f64) -> Vec<Cluster> {
    cluster_events(events, GridSize::for_visible_span(span_deg))
}

fn build_cluster(sector: SectorId, members: Vec<MinyanEvent>, grid: GridSize) -> Cluster {
    let center = grid.sector_center(sector);

    let farthest_m = members
        .iter()
        .map(|event| distance_m(center, event.position()))
        .fold(0.0_f64, f64::max);
    let floor_m = grid.km() * MIN_RADIUS_CELL_FRACTION * 1000.0;
    let radius_m = (farthest_m * RADIUS_MARGIN).max(floor_m);

    let has_urgent = members.iter().any(MinyanEvent::is_urgent);

    Cluster {
        id: sector,
        center,
        members,
        radius_m,
        has_urgent,
    }
}
