use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

use crate::models::{AggregateKind, DateRange};

/// Full UTC day: 00:00:00 to 23:59:59
pub fn day_window(day: NaiveDate) -> DateRange {
    let from = day.and_time(NaiveTime::MIN).and_utc();
    DateRange::new(from, from + Duration::seconds(86_399))
}

/// The reference day followed by the `days - 1` days before it, newest first
pub fn trailing_day_windows(reference: DateTime<Utc>, days: u32) -> Vec<(NaiveDate, DateRange)> {
    let today = reference.date_naive();
    (0..days)
        .map(|offset| {
            let day = today - Duration::days(i64::from(offset));
            (day, day_window(day))
        })
        .collect()
}

/// Weeks start on Sunday, the platform's day zero
pub fn start_of_week(day: NaiveDate) -> NaiveDate {
    day - Duration::days(i64::from(day.weekday().num_days_from_sunday()))
}

/// Window for an aggregate: start of today / week / month up to `reference`
pub fn aggregate_window(kind: AggregateKind, reference: DateTime<Utc>) -> DateRange {
    let today = reference.date_naive();
    let start_day = match kind {
        AggregateKind::Daily => today,
        AggregateKind::Weekly => start_of_week(today),
        AggregateKind::Monthly => today.with_day(1).unwrap_or(today),
    };
    DateRange::new(start_day.and_time(NaiveTime::MIN).and_utc(), reference)
}
