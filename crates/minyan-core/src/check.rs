//! One proximity check: report, query, filter, notify, record.

use chrono::{DateTime, Local, TimeZone, Utc};
use tracing::{debug, info, warn};

use minyan_geo::distance_m;
use minyan_ledger::NotificationLedger;
use minyan_types::{EventId, GeoPoint, ProximityConfig};

use crate::format::proximity_notification;
use crate::services::WatcherServices;
use crate::window::today_window;

/// How the event query went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// The service answered.
    Completed,
    /// The service failed; nothing was filtered or sent.
    Failed(String),
}

/// What a single check did, for logging and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    /// The point the check ran for.
    pub point: GeoPoint,
    /// Whether the location report reached the service.
    pub location_reported: bool,
    /// Outcome of the event query.
    pub query: QueryOutcome,
    /// Number of events the query returned.
    pub candidates: usize,
    /// Events notified by this check, in query order.
    pub notified: Vec<EventId>,
    /// Events skipped because the ledger already holds them.
    pub already_notified: usize,
    /// Events skipped because they lie outside the radius.
    pub out_of_range: usize,
    /// Events whose notification failed; they stay unmarked.
    pub dispatch_failures: Vec<EventId>,
}

impl CheckReport {
    const fn new(point: GeoPoint) -> Self {
        Self {
            point,
            location_reported: false,
            query: QueryOutcome::Completed,
            candidates: 0,
            notified: Vec::new(),
            already_notified: 0,
            out_of_range: 0,
            dispatch_failures: Vec::new(),
        }
    }
}

/// Run a check at `point` against today's events in the host's zone.
///
/// The caller must hold exclusive access to `ledger` for the whole call;
/// that exclusivity is what keeps two checks from notifying the same event.
pub async fn check_nearby_events(
    services: &WatcherServices,
    ledger: &mut NotificationLedger,
    config: &ProximityConfig,
    point: GeoPoint,
) -> CheckReport {
    check_nearby_events_in(services, ledger, config, point, Utc::now(), &Local).await
}

/// [`check_nearby_events`] with an explicit clock and zone.
///
/// Never fails: network and dispatch errors are logged and reflected in
/// the returned [`CheckReport`].
pub async fn check_nearby_events_in<Tz>(
    services: &WatcherServices,
    ledger: &mut NotificationLedger,
    config: &ProximityConfig,
    point: GeoPoint,
    now: DateTime<Utc>,
    tz: &Tz,
) -> CheckReport
where
    Tz: TimeZone + Sync,
    Tz::Offset: std::fmt::Display + Send + Sync,
{
    let mut report = CheckReport::new(point);

    match services.events.report_location(point).await {
        Ok(()) => report.location_reported = true,
        Err(e) => warn!(error = %e, "location report failed, continuing"),
    }

    let window = today_window(now, tz);
    let events = match services
        .events
        .list_nearby(point, config.radius_km(), window.on_or_after, window.before)
        .await
    {
        Ok(events) => events,
        Err(e) => {
            warn!(error = %e, "nearby event query failed, skipping check");
            report.query = QueryOutcome::Failed(e.to_string());
            return report;
        }
    };
    report.candidates = events.len();

    for event in &events {
        if ledger.was_notified(event.id) {
            debug!(event_id = %event.id, "already notified");
            report.already_notified = report.already_notified.saturating_add(1);
            continue;
        }

        let distance = distance_m(point, event.position());
        if distance > config.radius_meters {
            debug!(
                event_id = %event.id,
                distance_m = distance,
                radius_m = config.radius_meters,
                "outside radius"
            );
            report.out_of_range = report.out_of_range.saturating_add(1);
            continue;
        }

        let notification = proximity_notification(event, distance, tz);
        match services.notifier.send_local(notification).await {
            Ok(()) => {
                ledger.mark_notified_at(event, now).await;
                info!(event_id = %event.id, distance_m = distance, "proximity notification sent");
                report.notified.push(event.id);
            }
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "notification dispatch failed, will retry");
                report.dispatch_failures.push(event.id);
            }
        }
    }

    report
}
