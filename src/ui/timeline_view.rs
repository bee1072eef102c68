use crate::app::CalendarPage;
use crate::timeline::{date_range_label, group_by_month};

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub id: String,
    pub range: String,
    pub type_label: &'static str,
    pub color: String,
    pub title: String,
    pub description: Option<String>,
    pub action_items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineSection {
    pub label: String,
    pub entries: Vec<TimelineEntry>,
}

pub fn calculate_sections(page: &CalendarPage) -> Vec<TimelineSection> {
    group_by_month(&page.visible_events())
        .into_iter()
        .map(|group| TimelineSection {
            label: group.label,
            entries: group
                .events
                .into_iter()
                .map(|event| TimelineEntry {
                    id: event.id.clone(),
                    range: date_range_label(event),
                    type_label: event.event_type.label(),
                    color: event.display_color().to_string(),
                    title: event.title.clone(),
                    description: event.description.clone(),
                    action_items: event.action_items.clone(),
                })
                .collect(),
        })
        .collect()
}

/// Position of an event among all timeline entries, for scrolling to it.
pub fn entry_index(sections: &[TimelineSection], id: &str) -> Option<usize> {
    sections
        .iter()
        .flat_map(|section| &section.entries)
        .position(|entry| entry.id == id)
}
