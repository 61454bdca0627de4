//! # Tally Core Library
//!
//! Analytics engine for a notes vault: it turns file listings, task records
//! and calendar feeds into filtered file sets, chart-ready time series and
//! deduplicated day-bucketed calendar occurrences.
//!
//! ## Features
//!
//! - **Rule Filters**: AND/OR groups of attribute rules over files, with
//!   regex literals and tag sets
//! - **Date Windows**: relative, custom, fixed-start and all-time ranges in any
//!   IANA timezone
//! - **Metrics & Aggregation**: completed/created/open/due/overdue and more,
//!   bucketed by day, ISO week, month, tag or priority on one shared axis
//! - **Cumulative Charts**: opening balances, fixed-start extension and a
//!   projected completion line
//! - **Calendar Feeds**: ICS parsing and RRULE expansion with at-most-once
//!   placement of every occurrence
//!
//! ## Core Modules
//!
//! - [`rules`]: Rule evaluation over vault items
//! - [`range`]: Date window resolution
//! - [`metrics`]: Tag pre-filter and metric extraction
//! - [`aggregate`]: Bucketing, label union and all-time trimming
//! - [`cumulative`]: Running totals and fixed-start extension
//! - [`projection`]: Projected completion line
//! - [`widget`]: The full per-widget pipeline
//! - [`heatmap`]: Date-keyed item maps for heatmaps
//! - [`calendar`]: Feed parsing, recurrence expansion and feed refresh
//! - [`scheduler`]: Coalescing of recompute triggers
//! - [`timezone`]: Timezone utilities
//! - [`error`]: Error and diagnostic types
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use chrono::Utc;
//! use tally_core::{models::{Task, WidgetConfig}, timezone::parse_timezone, widget::build_chart};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config: WidgetConfig = serde_json::from_str(
//!         r#"{"title": "Done", "metrics": [{"type": "completed", "label": "Completed"}],
//!            "dateRange": {"look": "back", "value": 4, "unit": "weeks"}, "groupBy": "week"}"#,
//!     )?;
//!     let tasks: Vec<Task> = serde_json::from_str(&std::fs::read_to_string("tasks.json")?)?;
//!
//!     let tz = parse_timezone("Europe/Berlin")?;
//!     let output = build_chart(&config, &tasks, Utc::now().with_timezone(&tz));
//!     for (label, value) in output.series.labels.iter().zip(&output.series.datasets[0].data) {
//!         println!("{label}: {value}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod calendar;
pub mod cumulative;
pub mod error;
pub mod heatmap;
pub mod metrics;
pub mod models;
pub mod projection;
pub mod range;
pub mod rules;
pub mod scheduler;
pub mod timezone;
pub mod widget;
