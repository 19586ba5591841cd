//! Daily file naming and day boundaries
//!
//! One file per local calendar day, named `YYYYMMDD.<ext>`. The boundary
//! that belongs to a file is the local midnight that starts its day.

use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Utc};

/// Seconds after `day_start` at which the current file is rotated
pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// File name for the local calendar day containing `now`
pub fn day_file_name<Tz: TimeZone>(now: &DateTime<Tz>, extension: &str) -> String {
    format!(
        "{:04}{:02}{:02}.{}",
        now.year(),
        now.month(),
        now.day(),
        extension
    )
}

/// Local midnight (00:00:00) that starts the calendar day containing `now`
///
/// When a DST jump skips midnight the first existing instant of the day is
/// used; when midnight occurs twice the earlier one wins.
pub fn day_start<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let tz = now.timezone();
    let midnight = now.date_naive().and_time(NaiveTime::default());

    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(midnight + chrono::Duration::hours(1)))
                .earliest()
        })
        .map(|start| start.with_timezone(&Utc))
        .unwrap_or_else(|| now.with_timezone(&Utc))
}

/// Whether a file whose day started at `day_start` must be rotated at `now`
pub fn rotation_due<Tz: TimeZone>(day_start: &DateTime<Utc>, now: &DateTime<Tz>) -> bool {
    now.timestamp() - day_start.timestamp() >= SECONDS_PER_DAY
}
