use anyhow::Result;
use clap::Parser;
use owo_colors::{OwoColorize, Style};
use tally_core::error::CoreError;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod views;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TALLY_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    if let Err(e) = run(cli).await {
        handle_error(e);
        std::process::exit(1);
    }
}

async fn run(cli: cli::Cli) -> Result<()> {
    let config = config::Config::load(cli.config.as_deref())?;
    let tz = config.resolve_timezone(cli.timezone.as_deref())?;
    tracing::debug!(timezone = %tz, "configuration loaded");

    match cli.command {
        cli::Commands::Chart(command) => commands::chart::chart_command(&config, tz, command).await,
        cli::Commands::Heatmap(command) => {
            commands::heatmap::heatmap_command(&config, tz, command).await
        }
        cli::Commands::Calendar(command) => {
            commands::calendar::calendar_command(&config, tz, command).await
        }
    }
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    match err.chain().find_map(|cause| cause.downcast_ref::<CoreError>()) {
        Some(CoreError::InvalidTimezone(s)) => {
            eprintln!("{} {}", "Error:".style(error_style), s);
            let name = s.trim_start_matches("Invalid timezone: ");
            eprintln!("Did you mean one of these?");
            for suggestion in config::suggest_timezone(name) {
                eprintln!("  {}", suggestion.yellow());
            }
        }
        Some(CoreError::InvalidInput(s)) => {
            eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
        }
        Some(CoreError::Configuration(s)) => {
            eprintln!("{} Configuration: {}", "Error:".style(error_style), s);
        }
        _ => eprintln!("{} {:#}", "Error:".style(error_style), err),
    }
}
