//! Retention rule for notification records.
//!
//! A record stays in the ledger while both hold:
//!
//! ```text
//! now - notified_at < max_age      (default 24 h)
//! event_date        > now
//! ```
//!
//! Once either fails the event can no longer produce a useful notification
//! (it was announced long ago, or it has already started), so the record
//! is dropped and never re-inserted.

use chrono::{DateTime, TimeDelta, Utc};

use minyan_types::NotifiedRecord;

/// Default maximum age of a record, in hours.
pub const DEFAULT_MAX_AGE_HOURS: u32 = 24;

/// How long notification records are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    max_age: TimeDelta,
}

impl RetentionPolicy {
    /// Keep records for `max_age` after their notification.
    pub const fn new(max_age: TimeDelta) -> Self {
        Self { max_age }
    }

    /// Keep records for `hours` after their notification.
    pub fn from_hours(hours: u32) -> Self {
        Self::new(TimeDelta::hours(i64::from(hours)))
    }

    /// The configured maximum age.
    pub const fn max_age(&self) -> TimeDelta {
        self.max_age
    }

    /// Whether `record` is still retained at `now`.
    pub fn is_live(&self, record: &NotifiedRecord, now: DateTime<Utc>) -> bool {
        let age_ms = now
            .timestamp_millis()
            .saturating_sub(record.notified_at_epoch_ms);
        age_ms < self.max_age.num_milliseconds() && record.event_date > now
    }

    /// Drop every record that is no longer live at `now`.
    pub fn retain_live(
        &self,
        mut records: Vec<NotifiedRecord>,
        now: DateTime<Utc>,
    ) -> Vec<NotifiedRecord> {
        records.retain(|record| self.is_live(record, now));
        records
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::from_hours(DEFAULT_MAX_AGE_HOURS)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use minyan_types::EventId;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 14, 12, 0, 0).unwrap()
    }

    fn record(notified_hours_ago: i64, event_in_hours: i64) -> NotifiedRecord {
        NotifiedRecord {
            event_id: EventId::new(),
            notified_at_epoch_ms: (now() - TimeDelta::hours(notified_hours_ago)).timestamp_millis(),
            event_date: now() + TimeDelta::hours(event_in_hours),
        }
    }

    #[test]
    fn fresh_record_for_future_event_is_live() {
        assert!(RetentionPolicy::default().is_live(&record(1, 2), now()));
    }

    #[test]
    fn record_older_than_a_day_expires() {
        let policy = RetentionPolicy::default();
        assert!(!policy.is_live(&record(24, 2), now()));
        assert!(!policy.is_live(&record(30, 2), now()));
        assert!(policy.is_live(&record(23, 2), now()));
    }

    #[test]
    fn started_event_expires() {
        let policy = RetentionPolicy::default();
        assert!(!policy.is_live(&record(1, 0), now()));
        assert!(!policy.is_live(&record(1, -1), now()));
    }

    #[test]
    fn custom_max_age() {
        let policy = RetentionPolicy::from_hours(2);
        assert!(policy.is_live(&record(1, 5), now()));
        assert!(!policy.is_live(&record(3, 5), now()));
    }

    #[test]
    fn retain_live_keeps_order() {
        let keep_a = record(1, 2);
        let keep_b = record(5, 8);
        let records = vec![keep_a.clone(), record(48, 2), keep_b.clone(), record(1, -3)];
        let kept = RetentionPolicy::default().retain_live(records, now());
        assert_eq!(kept, vec![keep_a, keep_b]);
    }
}
