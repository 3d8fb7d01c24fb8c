//! Trading-calendar arithmetic used by date resolution.
//!
//! Only weekend structure is modeled here. Market holidays are left to the
//! provider: a holiday simply comes back with zero rows and the resolver
//! steps past it.

use time::{Date, Duration, OffsetDateTime, Weekday};

use crate::ValidationError;

pub fn is_weekend(date: Date) -> bool {
    matches!(date.weekday(), Weekday::Saturday | Weekday::Sunday)
}

pub fn previous_day(date: Date) -> Date {
    date - Duration::days(1)
}

/// Most recent weekday on or before `date`.
pub fn last_weekday_on_or_before(mut date: Date) -> Date {
    while is_weekend(date) {
        date = previous_day(date);
    }
    date
}

/// Most recent Thursday on or before `date` — the default sync anchor.
pub fn last_thursday_on_or_before(date: Date) -> Date {
    let days_back = (i64::from(date.weekday().number_days_from_monday())
        - i64::from(Weekday::Thursday.number_days_from_monday()))
    .rem_euclid(7);
    date - Duration::days(days_back)
}

/// Convert a provider epoch-millisecond timestamp to a UTC calendar date.
///
/// The trading day is stored in UTC terms; no local-timezone conversion.
pub fn date_from_unix_millis(millis: i64) -> Result<Date, ValidationError> {
    let nanos = i128::from(millis) * 1_000_000;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .map(|instant| instant.date())
        .map_err(|_| ValidationError::TimestampOutOfRange { millis })
}
