use std::collections::BTreeSet;

use anyhow::Result;
use chrono_tz::Tz;
use tally_core::error::CoreError;
use tally_core::heatmap::{bucket_items, matching_configs, HeatmapConfig};
use tally_core::models::Item;

use super::load_json;
use crate::cli::HeatmapCommand;
use crate::config::Config;
use crate::views::table::{display_heatmap, display_matches};

pub async fn heatmap_command(config: &Config, tz: Tz, command: HeatmapCommand) -> Result<()> {
    let items: Vec<Item> = load_json(&command.items).await?;
    if config.heatmaps.is_empty() {
        println!("No heatmaps configured.");
        return Ok(());
    }

    if command.matches {
        display_matches(&membership(&items, &config.heatmaps));
        return Ok(());
    }

    let selected: Vec<&HeatmapConfig> = config
        .heatmaps
        .iter()
        .filter(|heatmap| command.name.as_ref().map_or(true, |name| &heatmap.name == name))
        .collect();
    if selected.is_empty() {
        return Err(CoreError::InvalidInput(format!(
            "No heatmap named '{}' in the configuration",
            command.name.unwrap_or_default()
        ))
        .into());
    }

    for heatmap in selected {
        display_heatmap(&heatmap.name, &bucket_items(&items, heatmap, &tz));
    }
    Ok(())
}

/// Names of the heatmaps each item belongs to.
fn membership(items: &[Item], heatmaps: &[HeatmapConfig]) -> Vec<(String, BTreeSet<String>)> {
    items
        .iter()
        .map(|item| {
            let names = matching_configs(item, heatmaps)
                .into_iter()
                .map(|index| heatmaps[index].name.clone())
                .collect();
            (item.path.clone(), names)
        })
        .collect()
}
