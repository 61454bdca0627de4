use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use icalendar::parser::{read_calendar, unfold, Component, Property};

use super::{CalendarComponent, EventTime};
use crate::error::CoreError;

/// Parse an iCalendar document into its `VEVENT` components.
///
/// Only the properties the expander needs are read. Events without a usable
/// `DTSTART` are skipped; a document that does not open with `VCALENDAR` or
/// that the parser cannot read is rejected as a whole.
pub fn parse_calendar(raw: &str) -> Result<Vec<CalendarComponent>, CoreError> {
    let opening = raw.lines().map(str::trim).find(|line| !line.is_empty());
    if !opening.is_some_and(|line| line.eq_ignore_ascii_case("BEGIN:VCALENDAR")) {
        return Err(CoreError::Feed("missing BEGIN:VCALENDAR".to_string()));
    }

    let unfolded = unfold(raw);
    let calendar = read_calendar(&unfolded)
        .map_err(|err| CoreError::Feed(format!("unreadable calendar: {}", err)))?;

    let mut components = Vec::new();
    collect_events(&calendar.components, &mut components);
    Ok(components)
}

/// Events live directly below `VCALENDAR`; their own children (`VALARM`)
/// and sibling blocks (`VTIMEZONE`, `VTODO`) are ignored.
fn collect_events(blocks: &[Component<'_>], out: &mut Vec<CalendarComponent>) {
    for block in blocks {
        let name = block.name.as_str();
        if name.eq_ignore_ascii_case("VCALENDAR") {
            collect_events(&block.components, out);
        } else if name.eq_ignore_ascii_case("VEVENT") {
            let mut component = CalendarComponent::default();
            for property in &block.properties {
                apply_property(&mut component, property);
            }
            if component.start.is_some() {
                out.push(component);
            } else {
                tracing::debug!(uid = %component.uid, "event without DTSTART skipped");
            }
        }
    }
}

fn apply_property(component: &mut CalendarComponent, property: &Property<'_>) {
    let value = property.val.as_str();
    match property.name.as_str().to_ascii_uppercase().as_str() {
        "UID" => component.uid = value.trim().to_string(),
        "SUMMARY" => component.summary = unescape_text(value),
        "DESCRIPTION" => component.description = non_empty(unescape_text(value)),
        "LOCATION" => component.location = non_empty(unescape_text(value)),
        "DTSTART" => component.start = event_time(property, value),
        "DTEND" => component.end = event_time(property, value),
        "DURATION" => {
            component.duration = parse_duration(value);
            if component.duration.is_none() {
                tracing::debug!(uid = %component.uid, value, "unusable DURATION ignored");
            }
        }
        "RRULE" => component.rrule = non_empty(value.trim().to_string()),
        "RECURRENCE-ID" => component.recurrence_id = event_time(property, value),
        "EXDATE" => component
            .exdates
            .extend(value.split(',').filter_map(|item| event_time(property, item))),
        _ => {}
    }
}

/// Value of parameter `key`, without surrounding quotes.
fn param<'a>(property: &'a Property<'_>, key: &str) -> Option<&'a str> {
    property
        .params
        .iter()
        .find(|param| param.key.as_str().eq_ignore_ascii_case(key))
        .and_then(|param| param.val.as_ref())
        .map(|value| value.as_str().trim().trim_matches('"'))
}

fn event_time(property: &Property<'_>, raw: &str) -> Option<EventTime> {
    let date_only = param(property, "VALUE").is_some_and(|value| value.eq_ignore_ascii_case("DATE"));
    let parsed = parse_event_time(raw, param(property, "TZID"), date_only);
    if parsed.is_none() {
        tracing::debug!(property = property.name.as_str(), value = raw, "unreadable date value");
    }
    parsed
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Read a `DATE` or `DATE-TIME` value. An unknown `TZID` degrades to
/// floating time.
pub fn parse_event_time(raw: &str, tzid: Option<&str>, date_only: bool) -> Option<EventTime> {
    let trimmed = raw.trim();
    if date_only || trimmed.len() == 8 {
        return NaiveDate::parse_from_str(trimmed, "%Y%m%d").ok().map(EventTime::Date);
    }
    if let Some(utc) = trimmed.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S").ok()?;
        return Some(EventTime::Utc(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)));
    }
    let local = NaiveDateTime::parse_from_str(trimmed, "%Y%m%dT%H%M%S").ok()?;
    match tzid.map(|id| id.parse::<Tz>()) {
        Some(Ok(tz)) => Some(EventTime::Zoned { local, tz }),
        Some(Err(_)) => {
            tracing::debug!(tzid = ?tzid, "unknown TZID, reading as floating time");
            Some(EventTime::Floating(local))
        }
        None => Some(EventTime::Floating(local)),
    }
}

/// Parse an RFC 5545 duration such as `P1D`, `PT1H30M` or `P2W`.
///
/// Returns `None` for malformed text and for spans chrono cannot represent.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let trimmed = raw.trim();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let rest = rest.strip_prefix('P')?;

    let mut total = Duration::zero();
    let mut number = String::new();
    let mut in_time = false;
    for ch in rest.chars() {
        match ch {
            '0'..='9' => number.push(ch),
            'T' => in_time = true,
            unit => {
                let value: i64 = number.parse().ok()?;
                number.clear();
                let part = match (unit, in_time) {
                    ('W', false) => Duration::try_weeks(value),
                    ('D', false) => Duration::try_days(value),
                    ('H', true) => Duration::try_hours(value),
                    ('M', true) => Duration::try_minutes(value),
                    ('S', true) => Duration::try_seconds(value),
                    _ => None,
                }?;
                total = total.checked_add(&part)?;
            }
        }
    }
    if !number.is_empty() {
        return None;
    }
    if negative {
        Duration::zero().checked_sub(&total)
    } else {
        Some(total)
    }
}

fn unescape_text(raw: &str) -> String {
    let mut output = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            output.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => output.push('\n'),
            Some(other) => output.push(other),
            None => {}
        }
    }
    output
}
