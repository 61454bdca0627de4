use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::Result;
use chrono::Utc;
use chrono_tz::Tz;
use tally_core::error::CoreError;
use tally_core::models::{Task, WidgetConfig};
use tally_core::scheduler::CoalescingScheduler;
use tally_core::widget::build_chart;

use super::load_json;
use crate::cli::ChartCommand;
use crate::config::Config;
use crate::views::table::display_chart;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub async fn chart_command(config: &Config, tz: Tz, command: ChartCommand) -> Result<()> {
    let widget = config.widgets.get(&command.widget).cloned().ok_or_else(|| {
        CoreError::InvalidInput(format!(
            "No widget named '{}' in the configuration",
            command.widget
        ))
    })?;

    render(&widget, &command.tasks, command.json, tz).await?;

    if command.watch {
        let scheduler = CoalescingScheduler::new(config.scheduler.quiescence());
        watch(widget, command.tasks, command.json, tz, scheduler).await?;
    }
    Ok(())
}

async fn render(widget: &WidgetConfig, tasks_path: &Path, json: bool, tz: Tz) -> Result<()> {
    let tasks: Vec<Task> = load_json(tasks_path).await?;
    let output = build_chart(widget, &tasks, Utc::now().with_timezone(&tz));
    tracing::debug!(
        tasks = tasks.len(),
        labels = output.series.labels.len(),
        "chart built"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        display_chart(&widget.title, &output.series, &output.diagnostics);
    }
    Ok(())
}

async fn modified_at(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path)
        .await
        .and_then(|metadata| metadata.modified())
        .ok()
}

/// Re-render whenever the snapshot's modification time changes. Bursts of
/// writes collapse into one render once the file has been quiet.
async fn watch(
    widget: WidgetConfig,
    tasks_path: PathBuf,
    json: bool,
    tz: Tz,
    scheduler: CoalescingScheduler,
) -> Result<()> {
    let mut last_seen = modified_at(&tasks_path).await;
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    tracing::info!(path = %tasks_path.display(), "watching for changes");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let current = modified_at(&tasks_path).await;
                if current != last_seen {
                    last_seen = current;
                    let widget = widget.clone();
                    let path = tasks_path.clone();
                    let _pending = scheduler.trigger(move || async move {
                        if let Err(err) = render(&widget, &path, json, tz).await {
                            tracing::warn!(error = %err, "chart refresh failed");
                        }
                    });
                }
            }
            _ = tokio::signal::ctrl_c() => {
                scheduler.cancel();
                return Ok(());
            }
        }
    }
}
