//! Day and week boundary arithmetic
//!
//! All boundaries use UTC: the daily quota resets at UTC midnight and
//! weeks run Monday 00:00:00 UTC through Sunday 23:59:59 UTC. The same
//! convention applies to the daily gate and the weekly album.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Calendar day (UTC) a timestamp falls on - the daily quota key
pub fn day_key(ts: DateTime<Utc>) -> NaiveDate {
    ts.date_naive()
}

/// Monday of the week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let days_since_monday = date.weekday().num_days_from_monday() as i64;
    date - Duration::days(days_since_monday)
}

/// Week boundaries (Monday through Sunday) for the week containing `date`
pub fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = week_start(date);
    (start, start + Duration::days(6))
}
