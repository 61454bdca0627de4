use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Charts, heatmaps and calendar views over a notes vault snapshot
#[derive(Parser, Debug)]
#[command(name = "tally", author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to tally.toml in the working directory)
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,
    /// Override the configured timezone (IANA name)
    #[clap(long, global = true)]
    pub timezone: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Render a configured chart widget
    Chart(ChartCommand),
    /// Show heatmap buckets for vault items
    Heatmap(HeatmapCommand),
    /// List upcoming occurrences of a calendar feed
    Calendar(CalendarCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct ChartCommand {
    /// Name of the widget in the configuration
    pub widget: String,
    /// JSON file holding the task snapshot
    #[clap(long)]
    pub tasks: PathBuf,
    /// Print the series as JSON instead of a table
    #[clap(long)]
    pub json: bool,
    /// Re-render whenever the task snapshot changes
    #[clap(long)]
    pub watch: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct HeatmapCommand {
    /// JSON file holding the vault item snapshot
    #[clap(long)]
    pub items: PathBuf,
    /// Only show the heatmap with this name
    #[clap(short, long)]
    pub name: Option<String>,
    /// List which heatmaps each item belongs to instead of the date buckets
    #[clap(long)]
    pub matches: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct CalendarCommand {
    /// Feed name from the configuration, a path to an .ics file or a URL
    pub source: String,
    /// First day to show (defaults to today)
    #[clap(long)]
    pub from: Option<NaiveDate>,
    /// Number of days to show
    #[clap(long, default_value_t = 7)]
    pub days: u32,
}
