use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use thiserror::Error;

/// Lower-case a tag and strip its leading `#`.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().trim_start_matches('#').to_lowercase()
}

// ============================================================================
// Vault items
// ============================================================================

/// A file from the vault listing, joined with its metadata cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub path: String,
    pub name: String,
    pub extension: String,
    pub ctime: DateTime<Utc>,
    pub mtime: DateTime<Utc>,
    #[serde(default)]
    pub size: u64,
    /// Tags found in the note body
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub frontmatter: serde_json::Value,
}

impl Item {
    /// Union of body tags and frontmatter `tags`/`tag`, normalized.
    ///
    /// Frontmatter values may be a list or a single string holding several
    /// tags separated by commas or whitespace.
    pub fn normalized_tags(&self) -> BTreeSet<String> {
        let mut tags: BTreeSet<String> = self
            .tags
            .iter()
            .map(|t| normalize_tag(t))
            .filter(|t| !t.is_empty())
            .collect();

        for key in ["tags", "tag"] {
            match self.frontmatter.get(key) {
                Some(serde_json::Value::Array(values)) => {
                    for value in values {
                        if let Some(s) = value.as_str() {
                            tags.extend(split_tag_list(s));
                        }
                    }
                }
                Some(serde_json::Value::String(s)) => tags.extend(split_tag_list(s)),
                _ => {}
            }
        }
        tags
    }
}

fn split_tag_list(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(normalize_tag)
        .filter(|t| !t.is_empty())
}

// ============================================================================
// Tasks
// ============================================================================

/// Read from snapshots through [`FromStr`], so `"IN_PROGRESS"`, `"in-progress"`
/// and `"in_progress"` are all accepted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum StatusType {
    Todo,
    InProgress,
    Done,
    Cancelled,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid task status: {0}")]
pub struct ParseStatusTypeError(String);

impl FromStr for StatusType {
    type Err = ParseStatusTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "todo" => Ok(StatusType::Todo),
            "in_progress" => Ok(StatusType::InProgress),
            "done" => Ok(StatusType::Done),
            "cancelled" => Ok(StatusType::Cancelled),
            _ => Err(ParseStatusTypeError(s.to_string())),
        }
    }
}

impl TryFrom<String> for StatusType {
    type Error = ParseStatusTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Status of a task: its semantic type plus the checkbox symbol it was
/// written with. Custom statuses keep their own symbol.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskStatus {
    #[serde(rename = "type")]
    pub kind: StatusType,
    pub symbol: char,
}

/// Checkbox symbol of an in-progress task.
pub const IN_PROGRESS_SYMBOL: char = '/';

impl TaskStatus {
    pub fn todo() -> Self {
        Self { kind: StatusType::Todo, symbol: ' ' }
    }

    pub fn in_progress() -> Self {
        Self { kind: StatusType::InProgress, symbol: IN_PROGRESS_SYMBOL }
    }

    pub fn done() -> Self {
        Self { kind: StatusType::Done, symbol: 'x' }
    }

    pub fn cancelled() -> Self {
        Self { kind: StatusType::Cancelled, symbol: '-' }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::todo()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum TaskPriority {
    Highest,
    High,
    Medium,
    #[default]
    None,
    Low,
    Lowest,
}

impl TaskPriority {
    /// Display name used as a bucket label
    pub fn name(&self) -> &'static str {
        match self {
            TaskPriority::Highest => "Highest",
            TaskPriority::High => "High",
            TaskPriority::Medium => "Medium",
            TaskPriority::None => "Normal",
            TaskPriority::Low => "Low",
            TaskPriority::Lowest => "Lowest",
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid task priority: {0}")]
pub struct ParseTaskPriorityError(String);

impl FromStr for TaskPriority {
    type Err = ParseTaskPriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "highest" => Ok(TaskPriority::Highest),
            "high" => Ok(TaskPriority::High),
            "medium" => Ok(TaskPriority::Medium),
            "none" | "normal" | "" => Ok(TaskPriority::None),
            "low" => Ok(TaskPriority::Low),
            "lowest" => Ok(TaskPriority::Lowest),
            _ => Err(ParseTaskPriorityError(s.to_string())),
        }
    }
}

impl TryFrom<String> for TaskPriority {
    type Error = ParseTaskPriorityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A task record as exposed by the task provider. Dates are calendar dates
/// in the vault's timezone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub path: String,
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub due: Option<NaiveDate>,
    #[serde(default)]
    pub done: Option<NaiveDate>,
    #[serde(default)]
    pub created: Option<NaiveDate>,
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub scheduled: Option<NaiveDate>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub priority: TaskPriority,
}

impl Task {
    pub fn is_done(&self) -> bool {
        self.status.kind == StatusType::Done
    }

    pub fn is_cancelled(&self) -> bool {
        self.status.kind == StatusType::Cancelled
    }

    pub fn has_in_progress_symbol(&self) -> bool {
        self.status.symbol == IN_PROGRESS_SYMBOL
    }

    /// Whether any of the task's tags equals one of `wanted` (normalized).
    pub fn has_any_tag(&self, wanted: &[String]) -> bool {
        self.tags.iter().any(|tag| {
            let tag = normalize_tag(tag);
            wanted.iter().any(|w| normalize_tag(w) == tag)
        })
    }
}

// ============================================================================
// Widget configuration
// ============================================================================

/// Calendar unit used by range offsets and date bucketing steps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[serde(alias = "day")]
    Days,
    #[serde(alias = "week")]
    Weeks,
    #[serde(alias = "month")]
    Months,
    #[serde(alias = "year")]
    Years,
}

/// `value` units relative to some base date.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RangeOffset {
    pub value: u32,
    pub unit: TimeUnit,
}

impl RangeOffset {
    pub fn new(value: u32, unit: TimeUnit) -> Self {
        Self { value, unit }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FixedEnd {
    #[default]
    Now,
    Forward,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LookForwardFrom {
    #[default]
    Now,
    Start,
}

/// How a widget's `[start, end]` window is derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "look", rename_all = "camelCase")]
pub enum DateRangeDescriptor {
    All,
    Back(RangeOffset),
    Forward(RangeOffset),
    Custom {
        back: RangeOffset,
        forward: RangeOffset,
    },
    FixedStart {
        #[serde(rename = "startDate")]
        start_date: String,
        #[serde(rename = "endDate", default)]
        end_date: FixedEnd,
        #[serde(default)]
        forward: Option<RangeOffset>,
        #[serde(rename = "lookForwardFrom", default)]
        look_forward_from: LookForwardFrom,
    },
}

impl Default for DateRangeDescriptor {
    fn default() -> Self {
        DateRangeDescriptor::Back(RangeOffset::new(30, TimeUnit::Days))
    }
}

impl DateRangeDescriptor {
    pub fn is_all(&self) -> bool {
        matches!(self, DateRangeDescriptor::All)
    }

    pub fn is_fixed_start(&self) -> bool {
        matches!(self, DateRangeDescriptor::FixedStart { .. })
    }
}

/// The quantity a metric measures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricKind {
    Completed,
    Created,
    Open,
    Due,
    Overdue,
    InProgress,
    Someday,
    /// Tasks carrying a tag that contains the given text
    ByTag(String),
}

impl MetricKind {
    /// Metrics filtered by the window and pre-seeded on date axes.
    pub fn is_date_relevant(&self) -> bool {
        matches!(
            self,
            MetricKind::Completed
                | MetricKind::Created
                | MetricKind::Due
                | MetricKind::Overdue
                | MetricKind::InProgress
        )
    }

    /// Date a task is filtered and bucketed by for this metric.
    pub fn date_of(&self, task: &Task) -> Option<NaiveDate> {
        match self {
            MetricKind::Completed => task.done,
            MetricKind::Created => task.created,
            MetricKind::Due | MetricKind::Overdue | MetricKind::InProgress => task.due,
            MetricKind::Open | MetricKind::ByTag(_) => task.created.or(task.due).or(task.done),
            MetricKind::Someday => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricConfig {
    #[serde(rename = "type")]
    pub kind: MetricKind,
    pub label: String,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    "#4f8ff7".to_string()
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    #[default]
    Day,
    Week,
    Month,
    Tag,
    Priority,
}

impl GroupBy {
    /// Step unit for date groupings, `None` for categorical ones.
    pub fn time_unit(&self) -> Option<TimeUnit> {
        match self {
            GroupBy::Day => Some(TimeUnit::Days),
            GroupBy::Week => Some(TimeUnit::Weeks),
            GroupBy::Month => Some(TimeUnit::Months),
            GroupBy::Tag | GroupBy::Priority => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Line,
    Cumulative,
    Bar,
    Pie,
    Radar,
    Kpi,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    #[serde(default)]
    pub show: bool,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Inclusion/exclusion tag lists applied before metric extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagFilter {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    #[serde(default)]
    pub title: String,
    pub metrics: Vec<MetricConfig>,
    #[serde(default)]
    pub date_range: DateRangeDescriptor,
    #[serde(default)]
    pub group_by: GroupBy,
    #[serde(default)]
    pub chart_type: ChartType,
    #[serde(default)]
    pub projection: Option<ProjectionConfig>,
    #[serde(default)]
    pub tags: Option<TagFilter>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item_with(tags: Vec<&str>, frontmatter: serde_json::Value) -> Item {
        Item {
            path: "Notes/a.md".to_string(),
            name: "a".to_string(),
            extension: "md".to_string(),
            ctime: Utc::now(),
            mtime: Utc::now(),
            size: 0,
            tags: tags.into_iter().map(String::from).collect(),
            frontmatter,
        }
    }

    #[test]
    fn test_normalized_tags_union() {
        let item = item_with(
            vec!["#Done"],
            json!({ "tags": ["Urgent", "#work"], "tag": "home, Errand" }),
        );
        let tags: Vec<String> = item.normalized_tags().into_iter().collect();
        assert_eq!(tags, vec!["done", "errand", "home", "urgent", "work"]);
    }

    #[test]
    fn test_normalized_tags_ignores_non_strings() {
        let item = item_with(vec![], json!({ "tags": [1, null, "ok"], "tag": 5 }));
        assert_eq!(item.normalized_tags().len(), 1);
    }

    #[test]
    fn test_status_type_from_str() {
        assert_eq!("in-progress".parse::<StatusType>(), Ok(StatusType::InProgress));
        assert_eq!("DONE".parse::<StatusType>(), Ok(StatusType::Done));
        assert!("later".parse::<StatusType>().is_err());
    }

    #[test]
    fn test_priority_names() {
        assert_eq!("normal".parse::<TaskPriority>(), Ok(TaskPriority::None));
        assert_eq!(TaskPriority::None.name(), "Normal");
        assert_eq!(TaskPriority::Highest.name(), "Highest");
    }

    #[test]
    fn test_task_snapshot_accepts_loose_status_and_priority() {
        let task: Task = serde_json::from_value(json!({
            "path": "Tasks.md",
            "description": "review",
            "status": { "type": "in-progress", "symbol": "/" },
            "priority": "Normal"
        }))
        .unwrap();
        assert_eq!(task.status.kind, StatusType::InProgress);
        assert_eq!(task.priority, TaskPriority::None);

        let strict: Task = serde_json::from_value(json!({
            "path": "Tasks.md",
            "description": "ship",
            "status": { "type": "DONE", "symbol": "x" },
            "priority": "high"
        }))
        .unwrap();
        assert!(strict.is_done());
        assert_eq!(strict.priority, TaskPriority::High);

        let bad = serde_json::from_value::<Task>(json!({
            "path": "Tasks.md",
            "description": "x",
            "priority": "urgent"
        }));
        assert!(bad.unwrap_err().to_string().contains("Invalid task priority"));
    }

    #[test]
    fn test_widget_config_deserialize() {
        let config: WidgetConfig = serde_json::from_value(json!({
            "title": "Burn-up",
            "metrics": [
                { "type": "completed", "label": "Completed", "color": "#0f0" },
                { "type": { "by-tag": "work" }, "label": "Work" }
            ],
            "dateRange": {
                "look": "fixedStart",
                "startDate": "2024-01-01",
                "endDate": "forward",
                "forward": { "value": 2, "unit": "weeks" },
                "lookForwardFrom": "start"
            },
            "groupBy": "week",
            "chartType": "cumulative",
            "projection": { "show": true }
        }))
        .unwrap();

        assert_eq!(config.metrics[1].kind, MetricKind::ByTag("work".to_string()));
        assert_eq!(config.group_by, GroupBy::Week);
        assert!(matches!(
            config.date_range,
            DateRangeDescriptor::FixedStart {
                end_date: FixedEnd::Forward,
                look_forward_from: LookForwardFrom::Start,
                ..
            }
        ));
    }

    #[test]
    fn test_back_descriptor_deserialize() {
        let range: DateRangeDescriptor =
            serde_json::from_value(json!({ "look": "back", "value": 3, "unit": "month" })).unwrap();
        assert_eq!(range, DateRangeDescriptor::Back(RangeOffset::new(3, TimeUnit::Months)));
    }

    #[test]
    fn test_metric_date_fields() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        let task = Task {
            created: Some(day(1)),
            done: Some(day(3)),
            due: Some(day(2)),
            ..Default::default()
        };
        assert_eq!(MetricKind::Completed.date_of(&task), Some(day(3)));
        assert_eq!(MetricKind::Overdue.date_of(&task), Some(day(2)));
        assert_eq!(MetricKind::Open.date_of(&task), Some(day(1)));
        assert_eq!(MetricKind::Someday.date_of(&task), None);
    }
}
