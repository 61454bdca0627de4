use chrono::{DateTime, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde_json::json;
use tally_core::aggregate::{aggregate, MetricTasks};
use tally_core::calendar::{expand, parse_calendar, CalendarFeed, FeedFetcher};
use tally_core::cumulative::running_total;
use tally_core::error::CoreError;
use tally_core::heatmap::{bucket_items, matching_configs, HeatmapConfig};
use tally_core::models::{GroupBy, Item, MetricConfig, MetricKind, Task, WidgetConfig};
use tally_core::range::DateWindow;
use tally_core::rules::{evaluate, evaluate_group, FilterRule, Logic, RuleGroup, RuleOperator, RuleType};
use tally_core::widget::build_chart;

/// Helper function to build a vault item
fn create_test_item(path: &str, tags: &[&str]) -> Item {
    let name = path
        .rsplit('/')
        .next()
        .unwrap_or(path)
        .trim_end_matches(".md")
        .to_string();
    Item {
        path: path.to_string(),
        name,
        extension: "md".to_string(),
        ctime: Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
        mtime: Utc.with_ymd_and_hms(2024, 6, 2, 10, 0, 0).unwrap(),
        size: 128,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        frontmatter: serde_json::Value::Null,
    }
}

/// Helper function to load a task snapshot the way the CLI does
fn load_tasks() -> Vec<Task> {
    serde_json::from_value(json!([
        { "path": "Tasks.md", "description": "ship release", "status": { "type": "DONE", "symbol": "x" },
          "created": "2024-05-20", "done": "2024-06-03", "tags": ["#work"], "priority": "high" },
        { "path": "Tasks.md", "description": "write notes", "status": { "type": "DONE", "symbol": "x" },
          "created": "2024-06-01", "done": "2024-06-05", "tags": ["#home"] },
        { "path": "Tasks.md", "description": "plan sprint", "status": { "type": "TODO", "symbol": " " },
          "created": "2024-06-02", "due": "2024-06-20", "tags": ["#work"] },
        { "path": "Tasks.md", "description": "fix bug", "status": { "type": "IN_PROGRESS", "symbol": "/" },
          "created": "2024-06-04", "due": "2024-06-12" },
        { "path": "Tasks.md", "description": "someday", "status": { "type": "TODO", "symbol": " " } }
    ]))
    .expect("task snapshot should deserialize")
}

fn now() -> DateTime<Tz> {
    Tz::UTC.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

fn d(m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, day).unwrap()
}

#[test]
fn test_rule_matching_examples() {
    let note = create_test_item("Notes/Project Alpha.md", &[]);
    assert!(evaluate(&note, &FilterRule::new(RuleType::Filepath, RuleOperator::Contains, "Alpha")));

    let done = create_test_item("a.md", &["done", "urgent"]);
    let urgent = create_test_item("b.md", &["urgent"]);
    let rule = FilterRule::new(RuleType::Tag, RuleOperator::Equals, "done");
    assert!(evaluate(&done, &rule));
    assert!(!evaluate(&urgent, &rule));

    let mut group = RuleGroup {
        logic: Logic::And,
        rules: vec![
            FilterRule::new(RuleType::Filepath, RuleOperator::Contains, "Alpha"),
            FilterRule::new(RuleType::Filetype, RuleOperator::Equals, "pdf"),
        ],
    };
    assert!(!evaluate_group(&note, &group));
    group.logic = Logic::Or;
    assert!(evaluate_group(&note, &group));
}

#[test]
fn test_label_union_across_metrics() {
    let a = MetricConfig { kind: MetricKind::Open, label: "A".into(), color: "#a00".into() };
    let b = MetricConfig { kind: MetricKind::Open, label: "B".into(), color: "#0a0".into() };
    let created = |day| Task { created: Some(d(1, day)), ..Default::default() };
    let (t1, t2, t3) = (created(1), created(3), created(2));
    let window = DateWindow::from_dates(d(1, 1), d(1, 3), &Tz::UTC);

    let series = aggregate(
        &[
            MetricTasks { config: &a, tasks: vec![&t1, &t2] },
            MetricTasks { config: &b, tasks: vec![&t3] },
        ],
        GroupBy::Day,
        &window,
    );
    assert_eq!(series.labels, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);
    assert_eq!(series.datasets[0].data, vec![1, 0, 1]);
    assert_eq!(series.datasets[1].data, vec![0, 1, 0]);
}

#[test]
fn test_cumulative_examples() {
    assert_eq!(running_total(&[2, 3, 0, 5], 0), vec![2, 5, 5, 10]);
    assert_eq!(running_total(&[1, 2], 3), vec![4, 6]);
}

#[test]
fn test_widget_pipeline_from_json_config() {
    let tasks = load_tasks();
    let config: WidgetConfig = serde_json::from_value(json!({
        "title": "June",
        "metrics": [
            { "type": "completed", "label": "Completed" },
            { "type": "due", "label": "Due" },
            { "type": "someday", "label": "Someday" }
        ],
        "dateRange": { "look": "back", "value": 14, "unit": "days" },
        "groupBy": "week"
    }))
    .unwrap();

    let output = build_chart(&config, &tasks, now());
    assert!(output.series.is_aligned());
    // 06-01 falls in 2024-W22; the someday bucket sorts after the weeks
    assert_eq!(output.series.labels, vec!["2024-W22", "2024-W23", "2024-W24", "Someday"]);
    assert_eq!(output.series.datasets[0].data, vec![0, 2, 0, 0]);
    // the only due task inside the window is not yet due by week 24
    assert_eq!(output.series.datasets[1].data, vec![0, 0, 0, 0]);
    assert_eq!(output.series.datasets[2].data, vec![0, 0, 0, 1]);
}

#[test]
fn test_pipeline_is_deterministic() {
    let tasks = load_tasks();
    let config: WidgetConfig = serde_json::from_value(json!({
        "metrics": [
            { "type": "completed", "label": "Completed" },
            { "type": { "by-tag": "work" }, "label": "Work" }
        ],
        "dateRange": { "look": "all" },
        "groupBy": "tag",
        "chartType": "cumulative",
        "projection": { "show": true }
    }))
    .unwrap();

    let first = serde_json::to_string(&build_chart(&config, &tasks, now())).unwrap();
    let second = serde_json::to_string(&build_chart(&config, &tasks, now())).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_heatmap_configs_and_buckets() {
    let items = vec![
        create_test_item("Journal/2024-06-01.md", &["daily"]),
        create_test_item("Projects/plan.md", &[]),
    ];
    let configs: Vec<HeatmapConfig> = serde_json::from_value(json!([
        { "name": "Daily", "filter": { "rules": [{ "type": "tag", "operator": "equals", "value": "#Daily" }] } },
        { "name": "Edits", "dateSource": "modified",
          "filter": { "logic": "OR", "rules": [{ "type": "filetype", "operator": "equals", "value": "md" }] } }
    ]))
    .unwrap();

    assert_eq!(matching_configs(&items[0], &configs).len(), 2);
    assert_eq!(matching_configs(&items[1], &configs).into_iter().collect::<Vec<_>>(), vec![1]);

    let edits = bucket_items(&items, &configs[1], &Tz::UTC);
    assert_eq!(edits["2024-06-02"].len(), 2);
}

const RECURRING_FEED: &str = "BEGIN:VCALENDAR\r
VERSION:2.0\r
BEGIN:VEVENT\r
UID:evt1\r
SUMMARY:Standup\r
DTSTART:20240530T100000\r
DTEND:20240530T103000\r
RRULE:FREQ=DAILY;COUNT=5\r
END:VEVENT\r
BEGIN:VEVENT\r
UID:evt1\r
SUMMARY:Standup (moved)\r
RECURRENCE-ID:20240601T100000\r
DTSTART:20240601T150000\r
DTEND:20240601T153000\r
END:VEVENT\r
BEGIN:VEVENT\r
UID:evt1\r
SUMMARY:Standup (moved)\r
RECURRENCE-ID:20240601T100000\r
DTSTART:20240601T150000\r
DTEND:20240601T153000\r
END:VEVENT\r
BEGIN:VEVENT\r
UID:late\r
SUMMARY:Late shift\r
DTSTART:20240601T220000\r
DTEND:20240602T000000\r
END:VEVENT\r
END:VCALENDAR\r
";

#[test]
fn test_recurring_feed_expansion() {
    let components = parse_calendar(RECURRING_FEED).unwrap();
    let bound = DateWindow::from_dates(d(1, 1), d(12, 31), &Tz::UTC);
    let days = expand(&components, &bound, &Tz::UTC);

    let june_first: Vec<&str> = days[&d(6, 1)].iter().map(|e| e.summary.as_str()).collect();
    assert_eq!(june_first, vec!["Standup (moved)", "Late shift"]);
    assert!(days[&d(6, 2)].iter().all(|e| e.uid == "evt1"));
    assert_eq!(days.len(), 5);
}

const ALL_DAY_FEED: &str = "BEGIN:VCALENDAR\r
VERSION:2.0\r
BEGIN:VEVENT\r
UID:offsite\r
SUMMARY:Offsite\r
DTSTART;VALUE=DATE:20240601\r
RRULE:FREQ=DAILY;COUNT=3\r
END:VEVENT\r
BEGIN:VEVENT\r
UID:offsite\r
SUMMARY:Offsite (moved)\r
RECURRENCE-ID;VALUE=DATE:20240602\r
DTSTART;VALUE=DATE:20240605\r
END:VEVENT\r
BEGIN:VEVENT\r
UID:shift\r
SUMMARY:Shift\r
DTSTART;TZID=\"GMT+01:00\":20240603T080000\r
DURATION:P9999999999999W\r
END:VEVENT\r
END:VCALENDAR\r
";

#[test]
fn test_all_day_override_and_hostile_values() {
    let components = parse_calendar(ALL_DAY_FEED).unwrap();
    assert_eq!(components.len(), 3);
    let bound = DateWindow::from_dates(d(1, 1), d(12, 31), &Tz::UTC);
    let days = expand(&components, &bound, &Tz::UTC);

    assert_eq!(days.keys().copied().collect::<Vec<_>>(), vec![d(6, 1), d(6, 3), d(6, 5)]);
    assert_eq!(days[&d(6, 5)][0].summary, "Offsite (moved)");
    assert!(days[&d(6, 5)][0].is_all_day);

    let june_third: Vec<&str> = days[&d(6, 3)].iter().map(|e| e.summary.as_str()).collect();
    assert_eq!(june_third, vec!["Offsite", "Shift"]);
    let shift = &days[&d(6, 3)][1];
    assert_eq!(shift.start_time.map(|t| t.hour()), Some(8));
    assert!(shift.end_time.is_none());
}

struct FailingFetcher;

#[async_trait::async_trait]
impl FeedFetcher for FailingFetcher {
    fn source(&self) -> String {
        "https://calendar.invalid/feed.ics".to_string()
    }

    async fn fetch(&self) -> Result<String, CoreError> {
        Err(CoreError::Feed("connection refused".to_string()))
    }
}

#[test]
fn test_feed_failure_leaves_empty_map() {
    let mut feed = CalendarFeed::new(Tz::UTC);
    let notice = tokio_test::block_on(feed.refresh(&FailingFetcher, Utc::now())).expect("a notice");
    assert!(feed.days().is_empty());
    assert!(notice.message.contains("connection refused"));
}
