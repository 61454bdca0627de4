use crate::aggregate::{task_label, Dataset, TimeSeries};
use crate::cumulative::running_total;
use crate::error::CoreError;
use crate::metrics::matches_metric;
use crate::models::{GroupBy, MetricKind, ProjectionConfig, Task};
use crate::range::DateWindow;

/// Dataset label the projection is anchored on. Matched exactly.
pub const COMPLETED_LABEL: &str = "Completed";
pub const DEFAULT_PROJECTION_LABEL: &str = "Projected";
const DEFAULT_PROJECTION_COLOR: &str = "#9e9e9e";

/// Work done plus work still scheduled, bucket by bucket.
pub fn projected_totals(completed: &[u64], due: &[u64]) -> Vec<u64> {
    completed
        .iter()
        .enumerate()
        .map(|(i, done)| done + due.get(i).copied().unwrap_or(0))
        .collect()
}

/// Cumulative count of tasks still due inside the window, aligned to the
/// series labels. Overdue, completed and in-progress tasks are left out.
pub fn due_cumulative(
    series: &TimeSeries,
    tasks: &[&Task],
    group_by: GroupBy,
    window: &DateWindow,
    today: chrono::NaiveDate,
) -> Vec<u64> {
    let mut deltas = vec![0u64; series.labels.len()];
    for task in tasks {
        if !matches_metric(task, &MetricKind::Due, today) {
            continue;
        }
        if !task.due.is_some_and(|due| window.contains_date(due)) {
            continue;
        }
        let Some(label) = task_label(task, &MetricKind::Due, group_by) else {
            continue;
        };
        if let Ok(idx) = series.labels.binary_search(&label) {
            deltas[idx] += 1;
        }
    }
    running_total(&deltas, 0)
}

/// Append a dashed projection line to a cumulative series.
///
/// Fails with [`CoreError::DataInconsistency`] when no dataset is labeled
/// exactly `"Completed"`; the series is left untouched in that case.
pub fn add_projection(
    series: &mut TimeSeries,
    tasks: &[&Task],
    group_by: GroupBy,
    window: &DateWindow,
    today: chrono::NaiveDate,
    config: &ProjectionConfig,
) -> Result<(), CoreError> {
    let completed = series
        .dataset(COMPLETED_LABEL)
        .map(|d| d.data.clone())
        .ok_or_else(|| {
            CoreError::DataInconsistency(format!(
                "projection needs a metric labeled \"{}\"",
                COMPLETED_LABEL
            ))
        })?;

    let due = due_cumulative(series, tasks, group_by, window, today);
    series.datasets.push(Dataset {
        label: config
            .label
            .clone()
            .unwrap_or_else(|| DEFAULT_PROJECTION_LABEL.to_string()),
        color: config
            .color
            .clone()
            .unwrap_or_else(|| DEFAULT_PROJECTION_COLOR.to_string()),
        data: projected_totals(&completed, &due),
        dashed: true,
        points: false,
    });
    series.refresh_legend();
    Ok(())
}
