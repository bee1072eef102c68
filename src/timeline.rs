//! Month grouping shared by the timeline view and the exported report.

use chrono::NaiveDate;

use crate::calendar::CalendarEvent;
use crate::grid::{first_of_month, month_label};

#[derive(Debug, Clone, PartialEq)]
pub struct MonthGroup<'a> {
    pub month: NaiveDate,
    pub label: String,
    pub events: Vec<&'a CalendarEvent>,
}

/// Groups by the month of each event's start date, months and events ascending.
pub fn group_by_month<'a>(events: &[&'a CalendarEvent]) -> Vec<MonthGroup<'a>> {
    let mut sorted = events.to_vec();
    sorted.sort_by_key(|event| event.date);

    let mut groups: Vec<MonthGroup<'a>> = Vec::new();
    for event in sorted {
        let month = first_of_month(event.date);
        match groups.last_mut() {
            Some(group) if group.month == month => group.events.push(event),
            _ => groups.push(MonthGroup {
                month,
                label: month_label(month),
                events: vec![event],
            }),
        }
    }
    groups
}

/// `Sep 26` or `Sep 26 - Sep 27`.
pub fn date_range_label(event: &CalendarEvent) -> String {
    let start = event.date.format("%b %d").to_string();
    match event.end_date {
        Some(end) if end != event.date => format!("{} - {}", start, end.format("%b %d")),
        _ => start,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{EventData, EventType};
    use chrono::Utc;

    fn event(id: &str, month: u32, day: u32) -> CalendarEvent {
        let date = NaiveDate::from_ymd_opt(2025, month, day).unwrap();
        CalendarEvent::new(id, EventData::new(id, date, EventType::Event), "tester", Utc::now()).unwrap()
    }

    #[test]
    fn groups_are_ordered_months_with_ordered_events() {
        let events = [event("c", 10, 2), event("a", 9, 20), event("b", 9, 3)];
        let refs: Vec<&CalendarEvent> = events.iter().collect();

        let groups = group_by_month(&refs);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, "September 2025");
        let ids: Vec<&str> = groups[0].events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(groups[1].label, "October 2025");
    }

    #[test]
    fn range_label_shows_end_only_when_different() {
        let mut trip = event("trip", 9, 26);
        assert_eq!(date_range_label(&trip), "Sep 26");

        trip.end_date = NaiveDate::from_ymd_opt(2025, 9, 27);
        assert_eq!(date_range_label(&trip), "Sep 26 - Sep 27");
    }
}
