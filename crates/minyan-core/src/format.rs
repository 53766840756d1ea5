//! Human-readable notification text.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};

use minyan_types::MinyanEvent;

use crate::services::LocalNotification;

/// Title of every proximity notification.
pub const PROXIMITY_TITLE: &str = "Minyan nearby";

/// Value of the `type` data key on proximity notifications.
pub const PROXIMITY_KIND: &str = "minyan_proximity";

/// Meters below 1000 (after rounding), kilometers with one decimal above.
pub fn format_distance(distance_m: f64) -> String {
    if distance_m.round() < 1000.0 {
        format!("{distance_m:.0} m")
    } else {
        format!("{:.1} km", distance_m / 1000.0)
    }
}

/// `HH:MM` of `date` in `tz`.
pub fn format_start_time<Tz>(date: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    date.with_timezone(tz).format("%H:%M").to_string()
}

/// Build the notification sent for `event` seen `distance_m` away.
pub fn proximity_notification<Tz>(event: &MinyanEvent, distance_m: f64, tz: &Tz) -> LocalNotification
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut body = format!(
        "A minyan starts at {}, {} from you.",
        format_start_time(event.date, tz),
        format_distance(distance_m)
    );
    if event.is_urgent() {
        body.push_str(&format!(" {} more needed.", event.spots_remaining()));
    }

    let mut data = BTreeMap::new();
    data.insert("type".to_owned(), PROXIMITY_KIND.to_owned());
    data.insert("eventId".to_owned(), event.id.to_string());

    LocalNotification {
        title: PROXIMITY_TITLE.to_owned(),
        body,
        data,
    }
}
