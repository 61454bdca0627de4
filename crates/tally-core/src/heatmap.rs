use std::collections::{BTreeMap, BTreeSet};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::models::Item;
use crate::rules::{CompiledGroup, RuleGroup};
use crate::timezone::{date_key, local_date};

/// Which file timestamp places an item on the heatmap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateSource {
    #[default]
    Created,
    Modified,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapConfig {
    pub name: String,
    #[serde(default)]
    pub filter: RuleGroup,
    #[serde(default)]
    pub date_source: DateSource,
}

/// Indices of the configured heatmaps whose rules match `item`.
pub fn matching_configs(item: &Item, configs: &[HeatmapConfig]) -> BTreeSet<usize> {
    configs
        .iter()
        .enumerate()
        .filter(|(_, config)| config.filter.is_configured())
        .filter(|(_, config)| CompiledGroup::new(&config.filter).matches(item))
        .map(|(index, _)| index)
        .collect()
}

/// Items matching `config`, keyed by the local `YYYY-MM-DD` of their
/// creation or modification time. An unconfigured heatmap shows nothing.
pub fn bucket_items<'a>(items: &'a [Item], config: &HeatmapConfig, tz: &Tz) -> BTreeMap<String, Vec<&'a Item>> {
    let mut buckets: BTreeMap<String, Vec<&Item>> = BTreeMap::new();
    if !config.filter.is_configured() {
        tracing::debug!(heatmap = %config.name, "no rules configured");
        return buckets;
    }

    let group = CompiledGroup::new(&config.filter);
    for item in items.iter().filter(|item| group.matches(item)) {
        let stamp = match config.date_source {
            DateSource::Created => &item.ctime,
            DateSource::Modified => &item.mtime,
        };
        buckets
            .entry(date_key(local_date(stamp, tz)))
            .or_default()
            .push(item);
    }
    buckets
}
