use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime};
use chrono_english::{parse_date_string, Dialect};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::CoreError;
use crate::models::{DateRangeDescriptor, FixedEnd, LookForwardFrom, RangeOffset, TimeUnit};
use crate::timezone::{end_of_day, start_of_day};

/// Fallback look-back used when a configured start cannot be determined.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 30;

/// A resolved `[start, end]` window; both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl DateWindow {
    /// Window spanning whole days from `start` to `end`.
    pub fn from_dates(start: NaiveDate, end: NaiveDate, tz: &Tz) -> Self {
        Self {
            start: start_of_day(start, tz),
            end: end_of_day(end, tz),
        }
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end.date_naive()
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date() && date <= self.end_date()
    }

    pub fn with_end_date(self, end: NaiveDate) -> Self {
        let tz = self.start.timezone();
        Self {
            start: self.start,
            end: end_of_day(end, &tz),
        }
    }
}

/// Shift `date` by `amount` units (negative goes back). Month arithmetic
/// clamps to the last day of shorter months.
pub fn shift_date(date: NaiveDate, unit: TimeUnit, amount: i64) -> NaiveDate {
    let shifted = match unit {
        TimeUnit::Days => date.checked_add_signed(Duration::days(amount)),
        TimeUnit::Weeks => date.checked_add_signed(Duration::weeks(amount)),
        TimeUnit::Months => shift_months(date, amount),
        TimeUnit::Years => shift_months(date, amount.saturating_mul(12)),
    };
    shifted.unwrap_or(date)
}

fn shift_months(date: NaiveDate, amount: i64) -> Option<NaiveDate> {
    let months = Months::new(u32::try_from(amount.unsigned_abs()).ok()?);
    if amount >= 0 {
        date.checked_add_months(months)
    } else {
        date.checked_sub_months(months)
    }
}

fn offset_from(date: NaiveDate, offset: &RangeOffset, direction: i64) -> NaiveDate {
    shift_date(date, offset.unit, direction * i64::from(offset.value))
}

/// Parse a configured start date. Accepts `YYYY-MM-DD`, RFC 3339 and the
/// natural-language forms understood by `chrono-english`.
pub fn parse_config_date(raw: &str, now: &DateTime<Tz>) -> Result<NaiveDate, CoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::DateParse("empty date".to_string()));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(instant.with_timezone(&now.timezone()).date_naive());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M") {
        return Ok(naive.date());
    }
    parse_date_string(trimmed, *now, Dialect::Uk)
        .map(|dt| dt.date_naive())
        .map_err(|e| CoreError::DateParse(format!("'{}': {}", trimmed, e)))
}

/// Resolve a descriptor against `now`.
///
/// `candidate_dates` is only consulted for [`DateRangeDescriptor::All`]; the
/// window then spans the earliest to the latest candidate. Never fails:
/// unusable configuration falls back to the last thirty days.
pub fn resolve<I>(descriptor: &DateRangeDescriptor, now: DateTime<Tz>, candidate_dates: I) -> DateWindow
where
    I: IntoIterator<Item = NaiveDate>,
{
    let tz = now.timezone();
    let today = now.date_naive();
    let fallback_start = today - Duration::days(DEFAULT_LOOKBACK_DAYS);

    match descriptor {
        DateRangeDescriptor::Back(back) => {
            DateWindow::from_dates(offset_from(today, back, -1), today, &tz)
        }
        DateRangeDescriptor::Forward(forward) => {
            DateWindow::from_dates(today, offset_from(today, forward, 1), &tz)
        }
        DateRangeDescriptor::Custom { back, forward } => DateWindow::from_dates(
            offset_from(today, back, -1),
            offset_from(today, forward, 1),
            &tz,
        ),
        DateRangeDescriptor::FixedStart {
            start_date,
            end_date,
            forward,
            look_forward_from,
        } => {
            let start = parse_config_date(start_date, &now).unwrap_or_else(|err| {
                tracing::debug!(error = %err, "fixed start unusable, looking back {} days", DEFAULT_LOOKBACK_DAYS);
                fallback_start
            });
            let end = match (end_date, forward) {
                (FixedEnd::Forward, Some(offset)) => {
                    let base = match look_forward_from {
                        LookForwardFrom::Now => today,
                        LookForwardFrom::Start => start,
                    };
                    offset_from(base, offset, 1)
                }
                (FixedEnd::Forward, None) => {
                    tracing::debug!("forward end without an offset, ending today");
                    today
                }
                (FixedEnd::Now, _) => today,
            };
            DateWindow::from_dates(start, end.max(start), &tz)
        }
        DateRangeDescriptor::All => {
            let mut bounds: Option<(NaiveDate, NaiveDate)> = None;
            for date in candidate_dates {
                bounds = Some(match bounds {
                    Some((lo, hi)) => (lo.min(date), hi.max(date)),
                    None => (date, date),
                });
            }
            let (start, end) = bounds.unwrap_or((fallback_start, today));
            DateWindow::from_dates(start, end, &tz)
        }
    }
}

/// First day of the bucket containing `date` for the given unit: the ISO
/// week's Monday, the first of the month, or the date itself.
pub fn bucket_start(date: NaiveDate, unit: TimeUnit) -> NaiveDate {
    match unit {
        TimeUnit::Days => date,
        TimeUnit::Weeks => date - Duration::days(i64::from(date.weekday().num_days_from_monday())),
        TimeUnit::Months => date.with_day(1).unwrap_or(date),
        TimeUnit::Years => date.with_ordinal(1).unwrap_or(date),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike, Utc};
    use rstest::rstest;

    fn now() -> DateTime<Tz> {
        Tz::UTC.with_ymd_and_hms(2024, 6, 15, 13, 45, 0).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_back_floors_and_ceils() {
        let window = resolve(
            &DateRangeDescriptor::Back(RangeOffset::new(7, TimeUnit::Days)),
            now(),
            [],
        );
        assert_eq!(window.start_date(), d(2024, 6, 8));
        assert_eq!(window.start.hour(), 0);
        assert_eq!(window.end_date(), d(2024, 6, 15));
        assert_eq!((window.end.hour(), window.end.minute()), (23, 59));
    }

    #[test]
    fn test_forward() {
        let window = resolve(
            &DateRangeDescriptor::Forward(RangeOffset::new(2, TimeUnit::Weeks)),
            now(),
            [],
        );
        assert_eq!(window.start_date(), d(2024, 6, 15));
        assert_eq!(window.end_date(), d(2024, 6, 29));
    }

    #[test]
    fn test_custom() {
        let window = resolve(
            &DateRangeDescriptor::Custom {
                back: RangeOffset::new(1, TimeUnit::Months),
                forward: RangeOffset::new(3, TimeUnit::Days),
            },
            now(),
            [],
        );
        assert_eq!(window.start_date(), d(2024, 5, 15));
        assert_eq!(window.end_date(), d(2024, 6, 18));
    }

    #[rstest]
    #[case(FixedEnd::Now, LookForwardFrom::Now, d(2024, 6, 15))]
    #[case(FixedEnd::Forward, LookForwardFrom::Now, d(2024, 6, 22))]
    #[case(FixedEnd::Forward, LookForwardFrom::Start, d(2024, 1, 8))]
    fn test_fixed_start(
        #[case] end_date: FixedEnd,
        #[case] look_forward_from: LookForwardFrom,
        #[case] expected_end: NaiveDate,
    ) {
        let window = resolve(
            &DateRangeDescriptor::FixedStart {
                start_date: "2024-01-01".to_string(),
                end_date,
                forward: Some(RangeOffset::new(1, TimeUnit::Weeks)),
                look_forward_from,
            },
            now(),
            [],
        );
        assert_eq!(window.start_date(), d(2024, 1, 1));
        assert_eq!(window.end_date(), expected_end);
    }

    #[test]
    fn test_fixed_start_unparsable_falls_back() {
        let window = resolve(
            &DateRangeDescriptor::FixedStart {
                start_date: "not a date at all".to_string(),
                end_date: FixedEnd::Now,
                forward: None,
                look_forward_from: LookForwardFrom::Now,
            },
            now(),
            [],
        );
        assert_eq!(window.start_date(), d(2024, 5, 16));
        assert_eq!(window.end_date(), d(2024, 6, 15));
    }

    #[test]
    fn test_all_uses_candidate_bounds() {
        let window = resolve(
            &DateRangeDescriptor::All,
            now(),
            [d(2024, 3, 2), d(2023, 12, 30), d(2024, 7, 1)],
        );
        assert_eq!(window.start_date(), d(2023, 12, 30));
        assert_eq!(window.end_date(), d(2024, 7, 1));
    }

    #[test]
    fn test_all_without_candidates() {
        let window = resolve(&DateRangeDescriptor::All, now(), []);
        assert_eq!(window.start_date(), d(2024, 5, 16));
        assert_eq!(window.end_date(), d(2024, 6, 15));
    }

    #[test]
    fn test_month_shift_clamps() {
        assert_eq!(shift_date(d(2024, 3, 31), TimeUnit::Months, -1), d(2024, 2, 29));
        assert_eq!(shift_date(d(2024, 2, 29), TimeUnit::Years, 1), d(2025, 2, 28));
    }

    #[test]
    fn test_bucket_start() {
        // 2024-06-15 is a Saturday
        assert_eq!(bucket_start(d(2024, 6, 15), TimeUnit::Weeks), d(2024, 6, 10));
        assert_eq!(bucket_start(d(2024, 6, 15), TimeUnit::Months), d(2024, 6, 1));
    }

    #[test]
    fn test_window_respects_timezone() {
        let tz: Tz = "America/New_York".parse().unwrap();
        let instant = Utc.with_ymd_and_hms(2024, 6, 15, 2, 0, 0).unwrap();
        let window = resolve(
            &DateRangeDescriptor::Back(RangeOffset::new(0, TimeUnit::Days)),
            instant.with_timezone(&tz),
            [],
        );
        // Still the 14th in New York
        assert_eq!(window.start_date(), d(2024, 6, 14));
        assert_eq!(window.end_date(), d(2024, 6, 14));
    }

    #[test]
    fn test_contains_date_is_inclusive() {
        let window = DateWindow::from_dates(d(2024, 1, 1), d(2024, 1, 31), &Tz::UTC);
        assert!(window.contains_date(d(2024, 1, 1)));
        assert!(window.contains_date(d(2024, 1, 31)));
        assert!(!window.contains_date(d(2024, 2, 1)));
    }
}
