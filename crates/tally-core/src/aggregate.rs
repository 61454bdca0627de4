//! Bucketing of extracted tasks into chart-ready time series.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, Weekday};
use serde::Serialize;

use crate::models::{normalize_tag, GroupBy, MetricConfig, MetricKind, Task, TimeUnit};
use crate::range::{bucket_start, shift_date, DateWindow};

/// Label of the single bucket the someday metric is reported in.
pub const SOMEDAY_LABEL: &str = "Someday";
/// Label for tasks without tags when grouping by tag.
pub const UNTAGGED_LABEL: &str = "Untagged";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dataset {
    pub label: String,
    pub color: String,
    /// One value per series label, index-aligned
    pub data: Vec<u64>,
    pub dashed: bool,
    pub points: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: String,
    pub dashed: bool,
}

impl From<&Dataset> for LegendEntry {
    fn from(dataset: &Dataset) -> Self {
        Self {
            label: dataset.label.clone(),
            color: dataset.color.clone(),
            dashed: dataset.dashed,
        }
    }
}

/// Chart input: a sorted, unique label axis and datasets aligned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSeries {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
    pub legend: Vec<LegendEntry>,
    pub date_range: Option<DateWindow>,
}

impl TimeSeries {
    pub fn dataset(&self, label: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.label == label)
    }

    /// Every dataset has exactly one value per label.
    pub fn is_aligned(&self) -> bool {
        self.datasets.iter().all(|d| d.data.len() == self.labels.len())
    }

    /// Rebuild the legend from the current datasets.
    pub fn refresh_legend(&mut self) {
        self.legend = self.datasets.iter().map(LegendEntry::from).collect();
    }
}

/// One metric's configuration together with the tasks extracted for it.
#[derive(Debug, Clone)]
pub struct MetricTasks<'a> {
    pub config: &'a MetricConfig,
    pub tasks: Vec<&'a Task>,
}

/// Format the label of the bucket holding `date`.
pub fn bucket_label(date: NaiveDate, unit: TimeUnit) -> String {
    match unit {
        TimeUnit::Days => date.format("%Y-%m-%d").to_string(),
        TimeUnit::Weeks => date.format("%G-W%V").to_string(),
        TimeUnit::Months => date.format("%Y-%m").to_string(),
        TimeUnit::Years => date.format("%Y").to_string(),
    }
}

/// First day of the bucket a label names, if the label is a date label.
pub fn parse_label(label: &str, unit: TimeUnit) -> Option<NaiveDate> {
    match unit {
        TimeUnit::Days => NaiveDate::parse_from_str(label, "%Y-%m-%d").ok(),
        TimeUnit::Weeks => {
            let (year, week) = label.split_once("-W")?;
            NaiveDate::from_isoywd_opt(year.parse().ok()?, week.parse().ok()?, Weekday::Mon)
        }
        TimeUnit::Months => NaiveDate::parse_from_str(&format!("{}-01", label), "%Y-%m-%d").ok(),
        TimeUnit::Years => NaiveDate::from_ymd_opt(label.parse().ok()?, 1, 1),
    }
}

/// Every bucket label from the window start to the window end.
pub fn window_labels(window: &DateWindow, unit: TimeUnit) -> Vec<String> {
    let end = window.end_date();
    let mut labels = Vec::new();
    let mut cursor = bucket_start(window.start_date(), unit);
    while cursor <= end {
        labels.push(bucket_label(cursor, unit));
        let next = shift_date(cursor, unit, 1);
        if next <= cursor {
            break;
        }
        cursor = next;
    }
    labels
}

/// Label a task for categorical grouping.
pub fn category_label(task: &Task, group_by: GroupBy) -> String {
    match group_by {
        GroupBy::Priority => task.priority.name().to_string(),
        _ => task
            .tags
            .first()
            .map(|t| t.trim().trim_start_matches('#').to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTAGGED_LABEL.to_string()),
    }
}

/// Label a task's bucket for `metric`. `None` when the task has no date to
/// place it on a date axis.
pub fn task_label(task: &Task, metric: &MetricKind, group_by: GroupBy) -> Option<String> {
    match group_by.time_unit() {
        Some(unit) => metric.date_of(task).map(|date| bucket_label(date, unit)),
        None => Some(category_label(task, group_by)),
    }
}

fn group_metric(metric: &MetricTasks<'_>, group_by: GroupBy, window: &DateWindow) -> BTreeMap<String, u64> {
    let kind = &metric.config.kind;
    let mut buckets = BTreeMap::new();

    if matches!(kind, MetricKind::Someday) {
        buckets.insert(SOMEDAY_LABEL.to_string(), metric.tasks.len() as u64);
        return buckets;
    }

    if let Some(unit) = group_by.time_unit() {
        if kind.is_date_relevant() {
            for label in window_labels(window, unit) {
                buckets.insert(label, 0);
            }
        }
    }

    for task in &metric.tasks {
        match task_label(task, kind, group_by) {
            Some(label) => *buckets.entry(label).or_insert(0) += 1,
            None => tracing::trace!(path = %task.path, "task has no date for {:?}", kind),
        }
    }
    buckets
}

/// Bucket every metric and align them on the union of their labels.
pub fn aggregate(metrics: &[MetricTasks<'_>], group_by: GroupBy, window: &DateWindow) -> TimeSeries {
    let grouped: Vec<BTreeMap<String, u64>> = metrics
        .iter()
        .map(|m| group_metric(m, group_by, window))
        .collect();

    let labels: Vec<String> = grouped
        .iter()
        .flat_map(|buckets| buckets.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let datasets: Vec<Dataset> = metrics
        .iter()
        .zip(&grouped)
        .map(|(metric, buckets)| Dataset {
            label: metric.config.label.clone(),
            color: metric.config.color.clone(),
            data: labels
                .iter()
                .map(|label| buckets.get(label).copied().unwrap_or(0))
                .collect(),
            dashed: false,
            points: true,
        })
        .collect();

    let mut series = TimeSeries {
        labels,
        datasets,
        legend: Vec::new(),
        date_range: Some(*window),
    };
    series.refresh_legend();
    series
}

/// Buckets kept around the active span of an all-time line chart.
pub fn trim_buffer(unit: TimeUnit) -> usize {
    match unit {
        TimeUnit::Days => 14,
        TimeUnit::Weeks => 2,
        TimeUnit::Months | TimeUnit::Years => 1,
    }
}

/// Trim an all-time series to its active span plus a buffer on each side,
/// padding with zero buckets past the last dated label when the buffer
/// overruns. Trailing undated buckets ("Someday") are always kept.
pub fn trim_to_activity(series: &mut TimeSeries, unit: TimeUnit) {
    let dated = series
        .labels
        .iter()
        .take_while(|label| parse_label(label, unit).is_some())
        .count();
    let active = |i: &usize| series.datasets.iter().any(|d| d.data[*i] > 0);
    let (Some(first), Some(last)) = ((0..dated).find(active), (0..dated).rev().find(active)) else {
        return;
    };

    let buffer = trim_buffer(unit);
    let lo = first.saturating_sub(buffer);
    let hi = last + buffer;
    let kept_hi = hi.min(dated - 1);

    let mut padding = Vec::with_capacity(hi - kept_hi);
    if let Some(mut cursor) = parse_label(&series.labels[kept_hi], unit) {
        for _ in kept_hi..hi {
            cursor = shift_date(cursor, unit, 1);
            padding.push(bucket_label(cursor, unit));
        }
    }
    let missing = padding.len();

    series.labels.splice(kept_hi + 1..dated, padding);
    series.labels.drain(..lo);
    for dataset in &mut series.datasets {
        dataset
            .data
            .splice(kept_hi + 1..dated, std::iter::repeat(0).take(missing));
        dataset.data.drain(..lo);
    }
}
