use chrono::{Duration, NaiveDate};

use crate::aggregate::TimeSeries;

/// Tail kept visible after the last item of a fixed-start cumulative chart.
pub const EXTENSION_TAIL_DAYS: i64 = 14;

/// Running totals of `deltas` seeded by `opening`.
pub fn running_total(deltas: &[u64], opening: u64) -> Vec<u64> {
    deltas
        .iter()
        .scan(opening, |total, delta| {
            *total += delta;
            Some(*total)
        })
        .collect()
}

/// Convert every dataset from per-bucket deltas to running totals.
/// `openings[i]` seeds dataset `i`; missing entries seed with zero.
pub fn to_cumulative(mut series: TimeSeries, openings: &[u64]) -> TimeSeries {
    for (i, dataset) in series.datasets.iter_mut().enumerate() {
        let opening = openings.get(i).copied().unwrap_or(0);
        dataset.data = running_total(&dataset.data, opening);
    }
    series
}

/// New end date for a fixed-start window so items landing shortly after the
/// configured end stay visible.
///
/// Items dated after `end` but less than two weeks after it push the end to
/// the latest such item plus two weeks. Returns `None` when nothing qualifies.
pub fn extended_end<I>(end: NaiveDate, item_dates: I) -> Option<NaiveDate>
where
    I: IntoIterator<Item = NaiveDate>,
{
    let tail = Duration::days(EXTENSION_TAIL_DAYS);
    item_dates
        .into_iter()
        .filter(|date| *date > end && *date - end < tail)
        .max()
        .map(|latest| latest + tail)
}
