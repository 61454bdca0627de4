use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use chrono_tz::Tz;
use comfy_table::{Attribute, Cell, CellAlignment, Color, Row, Table};
use tally_core::aggregate::TimeSeries;
use tally_core::calendar::CalendarEvent;
use tally_core::error::{Diagnostic, Severity};
use tally_core::models::Item;

/// One row per label, one column per dataset.
pub fn series_table(series: &TimeSeries) -> Table {
    let mut table = Table::new();
    let mut header = vec![Cell::new("Label").add_attribute(Attribute::Bold)];
    for dataset in &series.datasets {
        let mut cell = Cell::new(&dataset.label).add_attribute(Attribute::Bold);
        if dataset.dashed {
            cell = cell.add_attribute(Attribute::Italic).fg(Color::DarkGrey);
        }
        header.push(cell);
    }
    table.set_header(header);

    for (index, label) in series.labels.iter().enumerate() {
        let mut row = Row::new();
        row.add_cell(Cell::new(label));
        for dataset in &series.datasets {
            let value = dataset.data.get(index).copied().unwrap_or_default();
            row.add_cell(Cell::new(value).set_alignment(CellAlignment::Right));
        }
        table.add_row(row);
    }
    table
}

pub fn display_chart(title: &str, series: &TimeSeries, diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        let prefix = match diagnostic.severity {
            Severity::Info => "note:",
            Severity::Warning => "warning:",
        };
        eprintln!("{} {}", prefix, diagnostic.message);
    }

    if !title.is_empty() {
        println!("{}", title);
    }
    if let Some(window) = &series.date_range {
        println!("{} .. {}", window.start_date(), window.end_date());
    }
    if series.labels.is_empty() {
        println!("No data.");
        return;
    }
    println!("{}", series_table(series));
}

/// Day key, item count and the first few item names.
pub fn heatmap_table(buckets: &BTreeMap<String, Vec<&Item>>) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Date", "Count", "Items"]);
    for (day, items) in buckets {
        let mut names: Vec<&str> = items.iter().take(3).map(|item| item.name.as_str()).collect();
        if items.len() > 3 {
            names.push("…");
        }
        let mut row = Row::new();
        row.add_cell(Cell::new(day));
        row.add_cell(Cell::new(items.len()).set_alignment(CellAlignment::Right));
        row.add_cell(Cell::new(names.join(", ")));
        table.add_row(row);
    }
    table
}

pub fn display_heatmap(name: &str, buckets: &BTreeMap<String, Vec<&Item>>) {
    println!("{}", name);
    if buckets.is_empty() {
        println!("No matching items.");
        return;
    }
    println!("{}", heatmap_table(buckets));
}

pub fn display_matches(rows: &[(String, BTreeSet<String>)]) {
    if rows.is_empty() {
        println!("No items found.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec!["Path", "Heatmaps"]);
    for (path, names) in rows {
        let mut cell = Cell::new(names.iter().cloned().collect::<Vec<_>>().join(", "));
        if names.is_empty() {
            cell = Cell::new("-").fg(Color::DarkGrey);
        }
        table.add_row(vec![Cell::new(path), cell]);
    }
    println!("{}", table);
}

pub fn calendar_table(days: &[(NaiveDate, &[CalendarEvent])], tz: &Tz) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Date", "Time", "Event", "Location"]);
    for (date, events) in days {
        for event in events.iter() {
            let time = match (&event.start_time, &event.end_time) {
                _ if event.is_all_day => "all day".to_string(),
                (Some(start), Some(end)) => format!(
                    "{}-{}",
                    start.with_timezone(tz).format("%H:%M"),
                    end.with_timezone(tz).format("%H:%M")
                ),
                (Some(start), None) => start.with_timezone(tz).format("%H:%M").to_string(),
                _ => String::new(),
            };
            let mut summary = Cell::new(&event.summary);
            if event.is_all_day {
                summary = summary.add_attribute(Attribute::Bold);
            }
            table.add_row(vec![
                Cell::new(date.format("%a %Y-%m-%d")),
                Cell::new(time),
                summary,
                Cell::new(event.location.as_deref().unwrap_or("")),
            ]);
        }
    }
    table
}

pub fn display_calendar(days: &[(NaiveDate, &[CalendarEvent])], tz: &Tz) {
    if days.iter().all(|(_, events)| events.is_empty()) {
        println!("No events.");
        return;
    }
    println!("{}", calendar_table(days, tz));
}
