//! The "today, not yet started" query window.

use chrono::{DateTime, Days, TimeDelta, TimeZone, Utc};

/// Half-open time range `[on_or_after, before)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    /// Inclusive lower bound.
    pub on_or_after: DateTime<Utc>,
    /// Exclusive upper bound.
    pub before: DateTime<Utc>,
}

/// From `now` up to the next midnight in `tz`.
///
/// If that midnight does not exist in `tz` (a DST gap at 00:00), the window
/// falls back to `now + 24h`.
pub fn today_window<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> QueryWindow {
    let fallback = now + TimeDelta::days(1);
    let local_today = now.with_timezone(tz).date_naive();
    let before = local_today
        .checked_add_days(Days::new(1))
        .and_then(|tomorrow| tomorrow.and_hms_opt(0, 0, 0))
        .and_then(|midnight| tz.from_local_datetime(&midnight).earliest())
        .map_or(fallback, |midnight| midnight.with_timezone(&Utc));
    QueryWindow {
        on_or_after: now,
        before,
    }
}
