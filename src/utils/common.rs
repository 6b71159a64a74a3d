//! Timestamp and calendar-date helpers
//!
//! All persisted instants are integer epoch milliseconds (UTC). Calendar
//! dates are stored as midnight UTC of that day.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Current time as epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Midnight UTC of a calendar date, as epoch milliseconds
pub fn date_to_millis(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

/// Calendar date (UTC) of an epoch-millisecond instant
pub fn millis_to_date(millis: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| dt.date_naive())
}
