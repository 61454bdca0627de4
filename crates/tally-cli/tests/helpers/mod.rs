use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const CONFIG: &str = r##"
timezone = "UTC"

[calendar.feeds]
team = "team.ics"
broken = "missing.ics"

[widgets.by-tag]
title = "Work by tag"
groupBy = "tag"
dateRange = { look = "all" }
metrics = [
    { type = "completed", label = "Completed" },
    { type = "open", label = "Open" },
]

[widgets.cumulative]
title = "Progress"
chartType = "cumulative"
groupBy = "day"
dateRange = { look = "all" }
projection = { show = true }
metrics = [{ type = "completed", label = "Completed" }]

[[heatmaps]]
name = "Journal"
filter = { rules = [{ type = "filepath", operator = "starts_with", value = "journal/" }] }

[[heatmaps]]
name = "Markdown"
dateSource = "modified"
filter = { logic = "OR", rules = [{ type = "filetype", operator = "equals", value = "md" }] }
"##;

pub const TASKS: &str = r##"[
  { "path": "Tasks.md", "description": "ship release", "status": { "type": "DONE", "symbol": "x" },
    "created": "2024-05-20", "done": "2024-06-03", "tags": ["#work"] },
  { "path": "Tasks.md", "description": "write notes", "status": { "type": "DONE", "symbol": "x" },
    "created": "2024-06-01", "done": "2024-06-05", "tags": ["#home"] },
  { "path": "Tasks.md", "description": "plan sprint", "status": { "type": "TODO", "symbol": " " },
    "created": "2024-06-02", "due": "2024-06-20", "tags": ["#work"] }
]"##;

pub const ITEMS: &str = r##"[
  { "path": "Journal/2024-06-01.md", "name": "2024-06-01", "extension": "md",
    "ctime": "2024-06-01T08:00:00Z", "mtime": "2024-06-02T08:00:00Z", "size": 120, "tags": ["#daily"] },
  { "path": "Assets/diagram.png", "name": "diagram", "extension": "png",
    "ctime": "2024-06-01T09:00:00Z", "mtime": "2024-06-01T09:00:00Z", "size": 4096, "tags": [] }
]"##;

pub const FEED: &str = "BEGIN:VCALENDAR\r
VERSION:2.0\r
BEGIN:VEVENT\r
UID:standup\r
SUMMARY:Standup\r
DTSTART:20240101T090000Z\r
DTEND:20240101T091500Z\r
RRULE:FREQ=DAILY\r
LOCATION:Room 4\r
END:VEVENT\r
END:VCALENDAR\r
";

/// Test harness running the binary inside a temporary vault export
pub struct CliTestHarness {
    temp_dir: TempDir,
}

impl CliTestHarness {
    /// Create a harness with the sample configuration and snapshots written out
    pub fn new() -> Self {
        let harness = Self::empty();
        harness.write("tally.toml", CONFIG);
        harness.write("tasks.json", TASKS);
        harness.write("items.json", ITEMS);
        harness.write("team.ics", FEED);
        harness
    }

    /// Create a harness with an empty working directory
    pub fn empty() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        Self { temp_dir }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, contents).expect("Failed to write fixture");
        path
    }

    /// Get a Command instance configured for testing
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("tally").expect("Failed to find tally binary");
        cmd.current_dir(self.temp_dir.path());
        cmd.env_remove("TALLY_TIMEZONE");
        cmd.env("TALLY_LOG", "off");
        cmd
    }

    /// Helper to run a command and assert success
    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    /// Helper to run a command and assert failure
    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }
}
