use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::calendar::{ActiveFilters, CalendarEvent, EventType};
use crate::timeline::{date_range_label, group_by_month};

pub const REPORT_TITLE: &str = "OIAA Operations Calendar";

/// Renders the visible events as a plain-text timeline report.
pub fn timeline_report(events: &[&CalendarEvent], filters: &ActiveFilters, generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", REPORT_TITLE);
    let _ = writeln!(out, "Generated {}", generated_at.format("%Y-%m-%d %H:%M UTC"));

    if filters.len() < EventType::ALL.len() {
        let shown: Vec<&str> = EventType::ALL
            .iter()
            .filter(|t| filters.contains(**t))
            .map(|t| t.label())
            .collect();
        let _ = writeln!(out, "Showing: {}", if shown.is_empty() { "nothing".to_string() } else { shown.join(", ") });
    }

    if events.is_empty() {
        let _ = writeln!(out, "\nNo events.");
        return out;
    }

    for group in group_by_month(events) {
        let _ = writeln!(out, "\n{}", group.label);
        let _ = writeln!(out, "{}", "=".repeat(group.label.chars().count()));
        for event in group.events {
            let _ = writeln!(
                out,
                "{:<16} [{}] {}",
                date_range_label(event),
                event.event_type.label(),
                event.title
            );
            if let Some(description) = &event.description {
                for line in description.lines().filter(|l| !l.trim().is_empty()) {
                    let _ = writeln!(out, "{:16} {}", "", line.trim());
                }
            }
            for item in &event.action_items {
                let _ = writeln!(out, "{:16} - {}", "", item);
            }
        }
    }
    out
}

pub fn write_report(path: &Path, report: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, report)?;
    tracing::info!("Wrote timeline report to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::EventData;
    use chrono::{NaiveDate, TimeZone};
    use tempfile::TempDir;

    fn generated() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 1, 9, 0, 0).unwrap()
    }

    fn events() -> Vec<CalendarEvent> {
        let mut trip = EventData::new("Trip to Dubai Frame", NaiveDate::from_ymd_opt(2025, 9, 26).unwrap(), EventType::Event);
        trip.end_date = NaiveDate::from_ymd_opt(2025, 9, 27);
        trip.action_items = vec!["Book bus".to_string()];
        let holiday = EventData::new("National Day", NaiveDate::from_ymd_opt(2025, 12, 2).unwrap(), EventType::Holiday);
        vec![
            CalendarEvent::new("1", trip, "a", generated()).unwrap(),
            CalendarEvent::new("2", holiday, "a", generated()).unwrap(),
        ]
    }

    #[test]
    fn report_groups_by_month() {
        let events = events();
        let refs: Vec<&CalendarEvent> = events.iter().collect();

        let report = timeline_report(&refs, &ActiveFilters::all(), generated());

        assert!(report.starts_with(REPORT_TITLE));
        assert!(report.contains("September 2025\n=============="));
        assert!(report.contains("Sep 26 - Sep 27  [Events / Trips] Trip to Dubai Frame"));
        assert!(report.contains("- Book bus"));
        assert!(report.contains("December 2025"));
        assert!(!report.contains("Showing:"));
    }

    #[test]
    fn report_names_active_filters_when_narrowed() {
        let mut filters = ActiveFilters::none();
        filters.toggle(EventType::Holiday);

        let report = timeline_report(&[], &filters, generated());

        assert!(report.contains("Showing: Holiday"));
        assert!(report.contains("No events."));
    }

    #[test]
    fn writes_report_creating_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("report.txt");

        write_report(&path, "hello").unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello");
    }
}
