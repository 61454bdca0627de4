use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use super::expand::{default_bound, expand, CalendarDays};
use super::ics::parse_calendar;
use super::CalendarEvent;
use crate::error::CoreError;

/// Source of raw feed text.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Human readable origin, used in notices.
    fn source(&self) -> String;
    async fn fetch(&self) -> Result<String, CoreError>;
}

/// Reads a feed from a local `.ics` file.
#[derive(Debug, Clone)]
pub struct FileFeedFetcher {
    path: PathBuf,
}

impl FileFeedFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FeedFetcher for FileFeedFetcher {
    fn source(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<String, CoreError> {
        Ok(tokio::fs::read_to_string(&self.path).await?)
    }
}

/// Fetches a feed over HTTP(S). `webcal://` URLs are requested as `https://`.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpFeedFetcher {
    client: reqwest::Client,
    url: String,
}

#[cfg(feature = "http")]
impl HttpFeedFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: normalize_feed_url(&url.into()),
        }
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    fn source(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<String, CoreError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| CoreError::Feed(format!("request to {} failed: {}", self.url, e)))?;
        response
            .text()
            .await
            .map_err(|e| CoreError::Feed(format!("could not read {}: {}", self.url, e)))
    }
}

pub fn normalize_feed_url(url: &str) -> String {
    let trimmed = url.trim();
    match trimmed.strip_prefix("webcal://") {
        Some(rest) => format!("https://{}", rest),
        None => trimmed.to_string(),
    }
}

/// The one user-facing message a failed refresh produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedNotice {
    pub source: String,
    pub message: String,
}

/// Expanded occurrences of one feed, owned by the caller and rebuilt on
/// every refresh.
#[derive(Debug, Clone)]
pub struct CalendarFeed {
    timezone: Tz,
    days: CalendarDays,
}

impl CalendarFeed {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            days: CalendarDays::new(),
        }
    }

    pub fn timezone(&self) -> &Tz {
        &self.timezone
    }

    pub fn days(&self) -> &CalendarDays {
        &self.days
    }

    pub fn events_on(&self, date: NaiveDate) -> &[CalendarEvent] {
        self.days.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Parse and expand `text` without touching the current map.
    pub fn expand_text(&self, text: &str, now: DateTime<Utc>) -> Result<CalendarDays, CoreError> {
        let components = parse_calendar(text)?;
        let bound = default_bound(now.with_timezone(&self.timezone));
        Ok(expand(&components, &bound, &self.timezone))
    }

    /// Fetch, parse and expand the feed.
    ///
    /// The map is cleared before fetching. On failure it stays empty and a
    /// single [`FeedNotice`] is returned; stale occurrences are never shown.
    pub async fn refresh(&mut self, fetcher: &dyn FeedFetcher, now: DateTime<Utc>) -> Option<FeedNotice> {
        self.days.clear();
        let result = match fetcher.fetch().await {
            Ok(text) => self.expand_text(&text, now),
            Err(err) => Err(err),
        };
        match result {
            Ok(days) => {
                tracing::debug!(source = %fetcher.source(), days = days.len(), "calendar feed refreshed");
                self.days = days;
                None
            }
            Err(err) => {
                tracing::warn!(source = %fetcher.source(), error = %err, "calendar feed unavailable");
                Some(FeedNotice {
                    source: fetcher.source(),
                    message: err.to_string(),
                })
            }
        }
    }
}
