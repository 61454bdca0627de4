use crate::error::CoreError;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

/// Parse an IANA timezone name
pub fn parse_timezone(timezone: &str) -> Result<Tz, CoreError> {
    Tz::from_str(timezone)
        .map_err(|_| CoreError::InvalidTimezone(format!("Invalid timezone: {}", timezone)))
}

/// First instant of `date` in `tz`.
///
/// Days that start inside a DST gap (midnight does not exist) begin at the
/// first valid local time after midnight.
pub fn start_of_day(date: NaiveDate, tz: &Tz) -> DateTime<Tz> {
    let mut time = NaiveTime::MIN;
    for _ in 0..4 {
        if let Some(local) = tz.from_local_datetime(&date.and_time(time)).earliest() {
            return local;
        }
        time = time.overflowing_add_signed(Duration::minutes(30)).0;
    }
    // No zone has a gap this long; treat the date as UTC midnight.
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
        .with_timezone(tz)
}

/// Last millisecond of `date` in `tz`.
pub fn end_of_day(date: NaiveDate, tz: &Tz) -> DateTime<Tz> {
    match date.succ_opt() {
        Some(next) => start_of_day(next, tz) - Duration::milliseconds(1),
        None => start_of_day(date, tz) + Duration::hours(24) - Duration::milliseconds(1),
    }
}

/// Calendar date of an instant as seen in `tz`.
pub fn local_date<Z: TimeZone>(instant: &DateTime<Z>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// `YYYY-MM-DD` key used for day buckets.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
