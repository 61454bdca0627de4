use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use tally_core::error::CoreError;
use tally_core::heatmap::HeatmapConfig;
use tally_core::models::WidgetConfig;
use tally_core::scheduler::DEFAULT_QUIESCENCE;
use tally_core::timezone::parse_timezone;

pub const DEFAULT_CONFIG_FILE: &str = "tally.toml";

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// Display timezone (IANA format)
    #[serde(default = "detect_system_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub widgets: BTreeMap<String, WidgetConfig>,
    #[serde(default)]
    pub heatmaps: Vec<HeatmapConfig>,
}

/// Named calendar feeds: a local `.ics` path or an http(s)/webcal URL
#[derive(Deserialize, Debug, Clone, Default)]
pub struct CalendarConfig {
    #[serde(default)]
    pub feeds: BTreeMap<String, String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SchedulerConfig {
    /// Quiet period before a watched chart is recomputed
    pub quiescence_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            quiescence_ms: DEFAULT_QUIESCENCE.as_millis() as u64,
        }
    }
}

impl SchedulerConfig {
    pub fn quiescence(&self) -> Duration {
        Duration::from_millis(self.quiescence_ms)
    }
}

impl Config {
    /// Load `path` (or `tally.toml` in the working directory) and overlay
    /// `TALLY_*` environment variables. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Figment::new()
            .merge(Toml::file(file))
            .merge(Env::prefixed("TALLY_").only(&["timezone"]))
            .extract()
    }

    /// Effective timezone, with `override_tz` taking precedence over the file.
    pub fn resolve_timezone(&self, override_tz: Option<&str>) -> Result<Tz, CoreError> {
        parse_timezone(override_tz.unwrap_or(&self.timezone))
    }
}

/// Detects the system timezone, falling back to UTC if detection fails
pub fn detect_system_timezone() -> String {
    if let Ok(tz) = std::env::var("TZ") {
        if Tz::from_str(&tz).is_ok() {
            return tz;
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(tz) = std::fs::read_to_string("/etc/timezone") {
            let tz = tz.trim();
            if Tz::from_str(tz).is_ok() {
                return tz.to_string();
            }
        }
    }

    if let Ok(local_tz) = iana_time_zone::get_timezone() {
        if Tz::from_str(&local_tz).is_ok() {
            return local_tz;
        }
    }

    "UTC".to_string()
}

pub fn get_common_timezones() -> Vec<&'static str> {
    vec![
        "UTC",
        "America/New_York",
        "America/Chicago",
        "America/Denver",
        "America/Los_Angeles",
        "America/Sao_Paulo",
        "Europe/London",
        "Europe/Paris",
        "Europe/Berlin",
        "Europe/Madrid",
        "Asia/Tokyo",
        "Asia/Shanghai",
        "Asia/Kolkata",
        "Australia/Sydney",
        "Pacific/Auckland",
    ]
}

/// Suggests similar timezone names when validation fails
pub fn suggest_timezone(invalid_tz: &str) -> Vec<String> {
    let common = get_common_timezones();
    let lower_invalid = invalid_tz.to_lowercase();

    let mut suggestions: Vec<String> = common
        .iter()
        .filter(|tz| {
            let lower_tz = tz.to_lowercase();
            let city = lower_tz.rsplit('/').next().unwrap_or(&lower_tz).to_string();
            lower_tz.contains(&lower_invalid) || lower_invalid.contains(&city)
        })
        .map(|tz| tz.to_string())
        .collect();

    if suggestions.is_empty() {
        suggestions.extend(common.iter().take(5).map(|s| s.to_string()));
    }

    suggestions
}
