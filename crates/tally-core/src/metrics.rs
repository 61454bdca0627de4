use chrono::NaiveDate;

use crate::models::{normalize_tag, MetricKind, StatusType, TagFilter, Task};
use crate::range::DateWindow;

/// Narrow a task set by the widget's inclusion/exclusion tag lists.
///
/// With a non-empty `include` list a task must carry at least one of the
/// listed tags; any task carrying an `exclude` tag is dropped.
pub fn apply_tag_filter<'a>(tasks: &'a [Task], filter: Option<&TagFilter>) -> Vec<&'a Task> {
    let Some(filter) = filter else {
        return tasks.iter().collect();
    };
    let include: Vec<String> = clean_tags(&filter.include);
    let exclude: Vec<String> = clean_tags(&filter.exclude);

    tasks
        .iter()
        .filter(|task| include.is_empty() || task.has_any_tag(&include))
        .filter(|task| exclude.is_empty() || !task.has_any_tag(&exclude))
        .collect()
}

fn clean_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|t| normalize_tag(t))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Whether `task` counts towards `metric`, ignoring any date window.
pub fn matches_metric(task: &Task, metric: &MetricKind, today: NaiveDate) -> bool {
    match metric {
        MetricKind::Completed => task.is_done() && task.created.is_some() && task.done.is_some(),
        MetricKind::Created => task.created.is_some(),
        MetricKind::Open => matches!(task.status.kind, StatusType::Todo | StatusType::InProgress),
        MetricKind::Due => match task.due {
            Some(due) => due >= today && !task.is_done() && !task.has_in_progress_symbol(),
            None => false,
        },
        MetricKind::Overdue => match task.due {
            Some(due) => due < today && !task.is_done(),
            None => false,
        },
        MetricKind::InProgress => task.has_in_progress_symbol(),
        MetricKind::Someday => task.due.is_none() && !task.is_done(),
        MetricKind::ByTag(tag) => {
            let wanted = normalize_tag(tag);
            !wanted.is_empty()
                && task
                    .tags
                    .iter()
                    .any(|t| normalize_tag(t).contains(&wanted))
        }
    }
}

/// Extracts the task subset behind one metric.
#[derive(Debug, Clone, Copy)]
pub struct MetricExtractor {
    today: NaiveDate,
}

impl MetricExtractor {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Tasks matching `metric`. Date-relevant metrics are restricted to
    /// `window` by their own date field unless `all_time` is set.
    pub fn extract<'a>(
        &self,
        tasks: &[&'a Task],
        metric: &MetricKind,
        window: &DateWindow,
        all_time: bool,
    ) -> Vec<&'a Task> {
        let windowed = metric.is_date_relevant() && !all_time;
        tasks
            .iter()
            .copied()
            .filter(|task| matches_metric(task, metric, self.today))
            .filter(|task| {
                !windowed || metric.date_of(task).is_some_and(|d| window.contains_date(d))
            })
            .collect()
    }

    /// Tasks matching `metric` with their date on or after the window start
    /// and no upper bound.
    pub fn extract_from_start<'a>(
        &self,
        tasks: &[&'a Task],
        metric: &MetricKind,
        window: &DateWindow,
    ) -> Vec<&'a Task> {
        let start = window.start_date();
        tasks
            .iter()
            .copied()
            .filter(|task| matches_metric(task, metric, self.today))
            .filter(|task| metric.date_of(task).is_some_and(|d| d >= start))
            .collect()
    }

    /// Count of `metric`'s tasks dated strictly before the window start.
    /// Cancelled tasks never count towards the created balance.
    pub fn opening_balance(&self, tasks: &[&Task], metric: &MetricKind, window: &DateWindow) -> u64 {
        let start = window.start_date();
        tasks
            .iter()
            .filter(|task| matches_metric(task, metric, self.today))
            .filter(|task| !(matches!(metric, MetricKind::Created) && task.is_cancelled()))
            .filter(|task| metric.date_of(task).is_some_and(|d| d < start))
            .count() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;
    use chrono_tz::Tz;
    use rstest::rstest;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn task(status: TaskStatus) -> Task {
        Task {
            path: "Tasks.md".to_string(),
            description: "task".to_string(),
            status,
            ..Default::default()
        }
    }

    fn window() -> DateWindow {
        DateWindow::from_dates(d(6, 1), d(6, 30), &Tz::UTC)
    }

    fn today() -> NaiveDate {
        d(6, 15)
    }

    #[rstest]
    #[case(MetricKind::Due, Some(d(6, 15)), TaskStatus::todo(), true)]
    #[case(MetricKind::Due, Some(d(6, 14)), TaskStatus::todo(), false)]
    #[case(MetricKind::Due, Some(d(6, 20)), TaskStatus::done(), false)]
    #[case(MetricKind::Due, Some(d(6, 20)), TaskStatus::in_progress(), false)]
    #[case(MetricKind::Overdue, Some(d(6, 14)), TaskStatus::todo(), true)]
    #[case(MetricKind::Overdue, Some(d(6, 14)), TaskStatus::done(), false)]
    #[case(MetricKind::Overdue, Some(d(6, 15)), TaskStatus::todo(), false)]
    #[case(MetricKind::Someday, None, TaskStatus::todo(), true)]
    #[case(MetricKind::Someday, None, TaskStatus::done(), false)]
    #[case(MetricKind::InProgress, None, TaskStatus::in_progress(), true)]
    #[case(MetricKind::Open, None, TaskStatus::in_progress(), true)]
    #[case(MetricKind::Open, None, TaskStatus::cancelled(), false)]
    fn test_metric_predicates(
        #[case] metric: MetricKind,
        #[case] due: Option<NaiveDate>,
        #[case] status: TaskStatus,
        #[case] expected: bool,
    ) {
        let mut t = task(status);
        t.due = due;
        assert_eq!(matches_metric(&t, &metric, today()), expected);
    }

    #[test]
    fn test_completed_requires_both_dates() {
        let mut t = task(TaskStatus::done());
        t.done = Some(d(6, 2));
        assert!(!matches_metric(&t, &MetricKind::Completed, today()));
        t.created = Some(d(5, 1));
        assert!(matches_metric(&t, &MetricKind::Completed, today()));
    }

    #[test]
    fn test_by_tag_contains_case_insensitive() {
        let mut t = task(TaskStatus::todo());
        t.tags = vec!["#Work/ProjectX".to_string()];
        assert!(matches_metric(&t, &MetricKind::ByTag("projectx".into()), today()));
        assert!(matches_metric(&t, &MetricKind::ByTag("#work".into()), today()));
        assert!(!matches_metric(&t, &MetricKind::ByTag("home".into()), today()));
        assert!(!matches_metric(&t, &MetricKind::ByTag("".into()), today()));
    }

    #[test]
    fn test_extract_filters_by_window_unless_all_time() {
        let mut inside = task(TaskStatus::todo());
        inside.created = Some(d(6, 10));
        let mut outside = task(TaskStatus::todo());
        outside.created = Some(d(5, 10));
        let tasks = [inside, outside];
        let refs: Vec<&Task> = tasks.iter().collect();

        let extractor = MetricExtractor::new(today());
        assert_eq!(extractor.extract(&refs, &MetricKind::Created, &window(), false).len(), 1);
        assert_eq!(extractor.extract(&refs, &MetricKind::Created, &window(), true).len(), 2);
        // open is not date-relevant, the window does not apply
        assert_eq!(extractor.extract(&refs, &MetricKind::Open, &window(), false).len(), 2);
    }

    #[test]
    fn test_opening_balance_excludes_cancelled_created() {
        let mut tasks = Vec::new();
        for (status, created) in [
            (TaskStatus::todo(), d(5, 1)),
            (TaskStatus::done(), d(5, 2)),
            (TaskStatus::cancelled(), d(5, 3)),
            (TaskStatus::todo(), d(6, 3)),
        ] {
            let mut t = task(status);
            t.created = Some(created);
            tasks.push(t);
        }
        let refs: Vec<&Task> = tasks.iter().collect();
        let extractor = MetricExtractor::new(today());
        assert_eq!(extractor.opening_balance(&refs, &MetricKind::Created, &window()), 2);
    }

    #[test]
    fn test_tag_prefilter() {
        let mut work = task(TaskStatus::todo());
        work.tags = vec!["#work".to_string()];
        let mut home = task(TaskStatus::todo());
        home.tags = vec!["#home".to_string(), "#work".to_string()];
        let plain = task(TaskStatus::todo());
        let tasks = [work, home, plain];

        let filter = TagFilter {
            include: vec!["Work".to_string()],
            exclude: vec!["#home".to_string()],
        };
        let kept = apply_tag_filter(&tasks, Some(&filter));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].tags, vec!["#work".to_string()]);

        assert_eq!(apply_tag_filter(&tasks, None).len(), 3);
        let only_exclude = TagFilter { include: vec![], exclude: vec!["home".into()] };
        assert_eq!(apply_tag_filter(&tasks, Some(&only_exclude)).len(), 2);
    }
}
