//! Calendar feeds: ICS parsing, recurrence expansion and the per-feed holder.
//!
//! A feed is parsed into [`CalendarComponent`]s, which [`expand`] turns into
//! a day-keyed map of [`CalendarEvent`]s. Every logical occurrence appears at
//! most once, no matter how many times the feed repeats it.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::timezone::start_of_day;

pub mod expand;
pub mod feed;
pub mod ics;

pub use expand::{default_bound, expand, CalendarDays};
pub use feed::{CalendarFeed, FeedFetcher, FeedNotice, FileFeedFetcher};
#[cfg(feature = "http")]
pub use feed::HttpFeedFetcher;
pub use ics::parse_calendar;

/// A date or date-time value as written in the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    /// `VALUE=DATE`: an all-day value.
    Date(NaiveDate),
    /// No zone information; read as wall-clock time in the display zone.
    Floating(NaiveDateTime),
    Utc(DateTime<Utc>),
    Zoned { local: NaiveDateTime, tz: Tz },
}

impl EventTime {
    pub fn is_date(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    /// The instant in `tz`. Dates resolve to the start of that day; local
    /// times inside a DST gap are read as UTC.
    pub fn resolve(&self, tz: &Tz) -> DateTime<Tz> {
        match self {
            EventTime::Date(date) => start_of_day(*date, tz),
            EventTime::Floating(local) => local_to_instant(local, tz),
            EventTime::Utc(instant) => instant.with_timezone(tz),
            EventTime::Zoned { local, tz: zone } => local_to_instant(local, zone).with_timezone(tz),
        }
    }

    /// Key identifying one occurrence: `YYYY-MM-DD` for dates, local
    /// `YYYY-MM-DDTHH:MM` otherwise.
    pub fn occurrence_key(&self, tz: &Tz) -> String {
        match self {
            EventTime::Date(date) => date.format("%Y-%m-%d").to_string(),
            other => other.resolve(tz).format("%Y-%m-%dT%H:%M").to_string(),
        }
    }
}

fn local_to_instant(local: &NaiveDateTime, tz: &Tz) -> DateTime<Tz> {
    tz.from_local_datetime(local)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(local))
}

/// One `VEVENT` from a feed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CalendarComponent {
    pub uid: String,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<EventTime>,
    pub end: Option<EventTime>,
    pub duration: Option<chrono::Duration>,
    pub rrule: Option<String>,
    pub recurrence_id: Option<EventTime>,
    pub exdates: Vec<EventTime>,
}

impl CalendarComponent {
    pub fn is_override(&self) -> bool {
        self.recurrence_id.is_some()
    }

    pub fn is_all_day(&self) -> bool {
        self.start.is_some_and(|s| s.is_date())
    }
}

/// One occurrence placed on a day. All-day events carry no times.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub uid: String,
    pub summary: String,
    pub is_all_day: bool,
    pub start_time: Option<DateTime<Tz>>,
    pub end_time: Option<DateTime<Tz>>,
    pub location: Option<String>,
    pub description: Option<String>,
}
