//! Calendar-week identifier arithmetic.
//!
//! The identifier format is `YYYY-W{nn}` and partitions every persisted
//! record. The week number uses day-of-year offset by the weekday of
//! January 1st (Sunday = 0), which is what the historical data was keyed
//! with. It is close to, but not the same as, ISO-8601 week numbering;
//! changing the formula would orphan every stored week key.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// Compute the week identifier for a capture date.
pub fn week_id(date: NaiveDate) -> String {
    let year = date.year();
    // NaiveDate::from_ymd_opt only fails on out-of-range input; Jan 1 of a
    // valid year always exists.
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1).expect("Jan 1 is a valid date");

    // Whole days elapsed since the start of the year.
    let days = date.ordinal0();
    let offset = jan1.weekday().num_days_from_sunday();
    let week = (days + offset + 1).div_ceil(7);

    format!("{year}-W{week:02}")
}

/// Week identifier for a capture timestamp.
pub fn week_id_for(timestamp: DateTime<Utc>) -> String {
    week_id(timestamp.date_naive())
}
