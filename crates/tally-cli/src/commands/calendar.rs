use anyhow::Result;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use owo_colors::{OwoColorize, Style};
use tally_core::calendar::{CalendarEvent, CalendarFeed, FeedFetcher, FileFeedFetcher};

use crate::cli::CalendarCommand;
use crate::config::Config;
use crate::views::table::display_calendar;

pub async fn calendar_command(config: &Config, tz: Tz, command: CalendarCommand) -> Result<()> {
    let source = config
        .calendar
        .feeds
        .get(&command.source)
        .cloned()
        .unwrap_or_else(|| command.source.clone());
    let fetcher = fetcher_for(&source)?;

    let now = Utc::now();
    let mut feed = CalendarFeed::new(tz);
    if let Some(notice) = feed.refresh(fetcher.as_ref(), now).await {
        let warning_style = Style::new().yellow().bold();
        eprintln!(
            "{} Calendar '{}' unavailable: {}",
            "Warning:".style(warning_style),
            notice.source,
            notice.message
        );
    }

    let from = command
        .from
        .unwrap_or_else(|| now.with_timezone(&tz).date_naive());
    let days: Vec<(NaiveDate, &[CalendarEvent])> = from
        .iter_days()
        .take(command.days as usize)
        .map(|date| (date, feed.events_on(date)))
        .collect();
    display_calendar(&days, &tz);
    Ok(())
}

fn is_remote(source: &str) -> bool {
    ["http://", "https://", "webcal://"]
        .iter()
        .any(|scheme| source.starts_with(scheme))
}

fn fetcher_for(source: &str) -> Result<Box<dyn FeedFetcher>> {
    if is_remote(source) {
        return remote_fetcher(source);
    }
    Ok(Box::new(FileFeedFetcher::new(source)))
}

#[cfg(feature = "http")]
fn remote_fetcher(source: &str) -> Result<Box<dyn FeedFetcher>> {
    Ok(Box::new(tally_core::calendar::HttpFeedFetcher::new(source)))
}

#[cfg(not(feature = "http"))]
fn remote_fetcher(source: &str) -> Result<Box<dyn FeedFetcher>> {
    Err(tally_core::error::CoreError::Configuration(format!(
        "'{}' is a remote feed but this build has no http support (enable the `http` feature)",
        source
    ))
    .into())
}
