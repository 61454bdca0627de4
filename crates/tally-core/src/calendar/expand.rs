use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;

use super::{CalendarComponent, CalendarEvent, EventTime};
use crate::error::CoreError;
use crate::models::TimeUnit;
use crate::range::{shift_date, DateWindow};

/// Occurrences keyed by the local day they cover.
pub type CalendarDays = BTreeMap<NaiveDate, Vec<CalendarEvent>>;

/// One year back and two years forward from `now`.
pub fn default_bound(now: DateTime<Tz>) -> DateWindow {
    let today = now.date_naive();
    DateWindow::from_dates(
        shift_date(today, TimeUnit::Years, -1),
        shift_date(today, TimeUnit::Years, 2),
        &now.timezone(),
    )
}

struct Occurrence {
    signature: String,
    start: EventTime,
    end: Option<EventTime>,
}

/// Expand `components` into per-day buckets within `bound`.
///
/// Modified instances (`RECURRENCE-ID`) are placed before their masters so the
/// master's original instance is recognised as already seen and dropped.
pub fn expand(components: &[CalendarComponent], bound: &DateWindow, tz: &Tz) -> CalendarDays {
    let mut days = CalendarDays::new();
    let mut seen: HashSet<String> = HashSet::new();

    let overrides = components.iter().filter(|c| c.is_override());
    let others = components.iter().filter(|c| !c.is_override());
    for component in overrides.chain(others) {
        for occurrence in occurrences(component, bound, tz) {
            if seen.insert(occurrence.signature.clone()) {
                place(&mut days, component, &occurrence, bound, tz);
            } else {
                tracing::trace!(signature = %occurrence.signature, "duplicate occurrence dropped");
            }
        }
    }
    days
}

fn occurrences(component: &CalendarComponent, bound: &DateWindow, tz: &Tz) -> Vec<Occurrence> {
    let Some(start) = component.start else {
        return Vec::new();
    };
    let end = component
        .end
        .or_else(|| component.duration.and_then(|span| add_span(&start, span)));

    if let Some(recurrence_id) = &component.recurrence_id {
        if !overlaps(&start, end.as_ref(), bound, tz) {
            return Vec::new();
        }
        return vec![Occurrence {
            signature: format!("{}:{}", component.uid, recurrence_id.occurrence_key(tz)),
            start,
            end,
        }];
    }

    if let Some(rule) = &component.rrule {
        match recurring_starts(&start, rule, bound, tz) {
            Ok(starts) => {
                let excluded: HashSet<String> = component
                    .exdates
                    .iter()
                    .map(|exdate| exdate.occurrence_key(tz))
                    .collect();
                let span = end.map(|end| span_between(&start, &end));
                return starts
                    .into_iter()
                    .filter_map(|instance| {
                        let key = instance.occurrence_key(tz);
                        if excluded.contains(&key) {
                            return None;
                        }
                        Some(Occurrence {
                            signature: format!("{}:{}", component.uid, key),
                            start: instance,
                            end: span.and_then(|span| add_span(&instance, span)),
                        })
                    })
                    .collect();
            }
            Err(err) => {
                tracing::warn!(uid = %component.uid, error = %err, "recurrence not expanded, showing the first instance only");
            }
        }
    }

    if !overlaps(&start, end.as_ref(), bound, tz) {
        return Vec::new();
    }
    let end_key = end.map(|end| end.occurrence_key(tz)).unwrap_or_default();
    vec![Occurrence {
        signature: format!("{}:{}:{}", component.summary, start.occurrence_key(tz), end_key),
        start,
        end,
    }]
}

/// Instance starts of a recurring master that fall inside `bound`.
fn recurring_starts(
    start: &EventTime,
    rule: &str,
    bound: &DateWindow,
    tz: &Tz,
) -> Result<Vec<EventTime>, CoreError> {
    let text = format!("{}\nRRULE:{}", dtstart_line(start), normalize_until(rule));
    let set = text
        .parse::<RRuleSet>()
        .map_err(|e| CoreError::Feed(format!("Failed to parse RRULE '{}': {}", rule, e)))?;

    let mut starts = Vec::new();
    for instance in &set {
        let time = match start {
            EventTime::Date(_) => EventTime::Date(instance.naive_utc().date()),
            EventTime::Floating(_) => EventTime::Floating(instance.naive_utc()),
            EventTime::Utc(_) | EventTime::Zoned { .. } => EventTime::Utc(instance.with_timezone(&Utc)),
        };
        let at = time.resolve(tz);
        if at > bound.end {
            break;
        }
        if at >= bound.start {
            starts.push(time);
        }
    }
    Ok(starts)
}

/// Dates and floating times are expanded as if they were UTC and mapped back
/// afterwards, so the rule never shifts them across zones.
fn dtstart_line(start: &EventTime) -> String {
    match start {
        EventTime::Date(date) => format!("DTSTART:{}T000000Z", date.format("%Y%m%d")),
        EventTime::Floating(local) => format!("DTSTART:{}Z", local.format("%Y%m%dT%H%M%S")),
        EventTime::Utc(instant) => format!("DTSTART:{}", instant.format("%Y%m%dT%H%M%SZ")),
        EventTime::Zoned { local, tz } => {
            format!("DTSTART;TZID={}:{}", tz.name(), local.format("%Y%m%dT%H%M%S"))
        }
    }
}

/// `UNTIL` has to be a UTC date-time once `DTSTART` carries a zone.
fn normalize_until(rule: &str) -> String {
    rule.split(';')
        .map(|part| match part.split_once('=') {
            Some((key, value)) if key.eq_ignore_ascii_case("UNTIL") => {
                if value.len() == 8 {
                    format!("UNTIL={}T235959Z", value)
                } else if value.ends_with('Z') {
                    format!("UNTIL={}", value)
                } else {
                    format!("UNTIL={}Z", value)
                }
            }
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn span_between(start: &EventTime, end: &EventTime) -> Duration {
    match (start, end) {
        (EventTime::Date(first), EventTime::Date(last)) => *last - *first,
        _ => end.resolve(&Tz::UTC) - start.resolve(&Tz::UTC),
    }
}

/// `None` when the shifted value leaves chrono's range.
fn add_span(time: &EventTime, span: Duration) -> Option<EventTime> {
    let shifted = match *time {
        EventTime::Date(date) => {
            EventTime::Date(date.checked_add_signed(Duration::try_days(span.num_days())?)?)
        }
        EventTime::Floating(local) => EventTime::Floating(local.checked_add_signed(span)?),
        EventTime::Utc(instant) => EventTime::Utc(instant.checked_add_signed(span)?),
        EventTime::Zoned { local, tz } => EventTime::Zoned {
            local: local.checked_add_signed(span)?,
            tz,
        },
    };
    Some(shifted)
}

fn overlaps(start: &EventTime, end: Option<&EventTime>, bound: &DateWindow, tz: &Tz) -> bool {
    let begin = start.resolve(tz);
    let finish = end.map(|end| end.resolve(tz)).unwrap_or(begin);
    finish >= bound.start && begin <= bound.end
}

/// First and last local day an occurrence covers.
fn day_span(start: &EventTime, end: Option<&EventTime>, tz: &Tz) -> (NaiveDate, NaiveDate) {
    match (start, end) {
        // DTEND of an all-day event is exclusive
        (EventTime::Date(first), Some(EventTime::Date(until))) => {
            let last = until.pred_opt().unwrap_or(*until);
            (*first, last.max(*first))
        }
        (EventTime::Date(first), _) => (*first, *first),
        (_, end) => {
            let begin = start.resolve(tz);
            let mut finish = end.map(|end| end.resolve(tz)).unwrap_or(begin);
            if finish.num_seconds_from_midnight() == 0 && finish.nanosecond() == 0 {
                finish = finish.checked_sub_signed(Duration::seconds(1)).unwrap_or(finish);
            }
            let first = begin.date_naive();
            (first, finish.date_naive().max(first))
        }
    }
}

fn place(
    days: &mut CalendarDays,
    component: &CalendarComponent,
    occurrence: &Occurrence,
    bound: &DateWindow,
    tz: &Tz,
) {
    let all_day = occurrence.start.is_date();
    let event = CalendarEvent {
        uid: component.uid.clone(),
        summary: component.summary.clone(),
        is_all_day: all_day,
        start_time: (!all_day).then(|| occurrence.start.resolve(tz)),
        end_time: if all_day {
            None
        } else {
            occurrence.end.map(|end| end.resolve(tz))
        },
        location: component.location.clone(),
        description: component.description.clone(),
    };

    // Only days inside the bound get a bucket, however long the event runs
    let (first, last) = day_span(&occurrence.start, occurrence.end.as_ref(), tz);
    let last = last.min(bound.end_date());
    let mut day = first.max(bound.start_date());
    while day <= last {
        let bucket = days.entry(day).or_default();
        if !bucket
            .iter()
            .any(|existing| existing.uid == event.uid && existing.summary == event.summary)
        {
            bucket.push(event.clone());
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
}
