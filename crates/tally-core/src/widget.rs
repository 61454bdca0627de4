//! Per-widget chart pipeline.
//!
//! Runs the engine stages in order for one [`WidgetConfig`]: tag pre-filter,
//! window resolution, fixed-start extension, metric extraction, aggregation,
//! cumulative totals, projection and all-time trimming. Recoverable problems
//! are collected as [`Diagnostic`]s; the pipeline itself never fails.

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use serde::Serialize;

use crate::aggregate::{aggregate, trim_to_activity, MetricTasks, TimeSeries};
use crate::cumulative::{extended_end, to_cumulative};
use crate::error::Diagnostic;
use crate::metrics::{apply_tag_filter, matches_metric, MetricExtractor};
use crate::models::{ChartType, DateRangeDescriptor, Task, WidgetConfig};
use crate::projection::add_projection;
use crate::range::{parse_config_date, resolve};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartOutput {
    pub series: TimeSeries,
    pub diagnostics: Vec<Diagnostic>,
}

/// Build the chart series for `config` over the task snapshot at `now`.
pub fn build_chart(config: &WidgetConfig, tasks: &[Task], now: DateTime<Tz>) -> ChartOutput {
    let mut diagnostics = Vec::new();
    let tasks = apply_tag_filter(tasks, config.tags.as_ref());
    let extractor = MetricExtractor::new(now.date_naive());
    let all_time = config.date_range.is_all();

    if config.metrics.is_empty() {
        diagnostics.push(Diagnostic::info(format!("widget '{}' has no metrics", config.title)));
    }
    if let DateRangeDescriptor::FixedStart { start_date, .. } = &config.date_range {
        if let Err(err) = parse_config_date(start_date, &now) {
            diagnostics.push(Diagnostic::from(&err));
        }
    }

    let mut window = resolve(&config.date_range, now, candidate_dates(config, &tasks, &extractor));
    let cumulative = config.chart_type == ChartType::Cumulative;
    let unit = config.group_by.time_unit();

    if cumulative && unit.is_some() && config.date_range.is_fixed_start() {
        let dates = config.metrics.iter().flat_map(|metric| {
            extractor
                .extract_from_start(&tasks, &metric.kind, &window)
                .into_iter()
                .filter_map(|task| metric.kind.date_of(task))
        });
        if let Some(end) = extended_end(window.end_date(), dates) {
            tracing::debug!(from = %window.end_date(), to = %end, "extending fixed-start window");
            window = window.with_end_date(end);
        }
    }

    let extracted: Vec<MetricTasks<'_>> = config
        .metrics
        .iter()
        .map(|metric| MetricTasks {
            config: metric,
            tasks: extractor.extract(&tasks, &metric.kind, &window, all_time),
        })
        .collect();
    let mut series = aggregate(&extracted, config.group_by, &window);

    if cumulative {
        let openings: Vec<u64> = config
            .metrics
            .iter()
            .map(|metric| {
                if all_time || unit.is_none() {
                    0
                } else {
                    extractor.opening_balance(&tasks, &metric.kind, &window)
                }
            })
            .collect();
        series = to_cumulative(series, &openings);

        if let Some(projection) = config.projection.as_ref().filter(|p| p.show) {
            if let Err(err) = add_projection(
                &mut series,
                &tasks,
                config.group_by,
                &window,
                extractor.today(),
                projection,
            ) {
                tracing::warn!(widget = %config.title, error = %err, "projection skipped");
                diagnostics.push(Diagnostic::from(&err));
            }
        }
    } else if config.chart_type == ChartType::Line && all_time {
        if let Some(unit) = unit {
            trim_to_activity(&mut series, unit);
        }
    }

    ChartOutput { series, diagnostics }
}

/// Dates of every task some metric would count, used to bound an all-time
/// window.
fn candidate_dates(config: &WidgetConfig, tasks: &[&Task], extractor: &MetricExtractor) -> Vec<NaiveDate> {
    if !config.date_range.is_all() {
        return Vec::new();
    }
    config
        .metrics
        .iter()
        .flat_map(|metric| {
            tasks
                .iter()
                .filter(|task| matches_metric(task, &metric.kind, extractor.today()))
                .filter_map(|task| metric.kind.date_of(task))
                .collect::<Vec<_>>()
        })
        .collect()
}
