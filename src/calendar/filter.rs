use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::event::{is_hex_color, CalendarEvent, EventError, EventType};

pub const DEFAULT_FILTER_COLOR: &str = "#3b82f6";

pub const PRESET_COLORS: [&str; 10] = [
    "#ef4444", "#f97316", "#eab308", "#22c55e", "#06b6d4",
    "#3b82f6", "#8b5cf6", "#ec4899", "#64748b", "#6b7280",
];

/// A named color tag kept only in local storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFilter {
    pub id: String,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl CustomFilter {
    pub fn new(name: &str, color: &str, now: DateTime<Utc>) -> Result<Self, EventError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EventError::MissingTitle);
        }
        if !is_hex_color(color) {
            return Err(EventError::InvalidColor(color.to_string()));
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            color: color.to_string(),
            created_at: now,
        })
    }
}

/// The event types currently shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveFilters {
    types: BTreeSet<EventType>,
}

impl ActiveFilters {
    pub fn all() -> Self {
        Self {
            types: EventType::ALL.into_iter().collect(),
        }
    }

    pub fn none() -> Self {
        Self { types: BTreeSet::new() }
    }

    pub fn contains(&self, event_type: EventType) -> bool {
        self.types.contains(&event_type)
    }

    pub fn toggle(&mut self, event_type: EventType) {
        if !self.types.remove(&event_type) {
            self.types.insert(event_type);
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn is_visible(&self, event: &CalendarEvent) -> bool {
        self.contains(event.event_type)
    }

    pub fn apply<'a, I>(&self, events: I) -> Vec<&'a CalendarEvent>
    where
        I: IntoIterator<Item = &'a CalendarEvent>,
    {
        events.into_iter().filter(|event| self.is_visible(event)).collect()
    }
}

impl Default for ActiveFilters {
    fn default() -> Self {
        Self::all()
    }
}

impl FromIterator<EventType> for ActiveFilters {
    fn from_iter<T: IntoIterator<Item = EventType>>(iter: T) -> Self {
        Self {
            types: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::event::EventData;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn event(id: &str, day: u32, event_type: EventType) -> CalendarEvent {
        let date = NaiveDate::from_ymd_opt(2025, 9, day).unwrap();
        CalendarEvent::new(id, EventData::new(id, date, event_type), "tester", Utc::now()).unwrap()
    }

    fn sample() -> Vec<CalendarEvent> {
        vec![
            event("a", 1, EventType::Inbound),
            event("b", 2, EventType::Holiday),
            event("c", 3, EventType::Inbound),
            event("d", 4, EventType::University),
        ]
    }

    fn ids(events: &[&CalendarEvent]) -> Vec<String> {
        events.iter().map(|e| e.id.clone()).collect()
    }

    #[test]
    fn all_types_active_by_default() {
        let filters = ActiveFilters::default();
        assert_eq!(filters.len(), 6);
    }

    #[test]
    fn toggling_off_hides_type_and_on_restores_in_order() {
        let events = sample();
        let mut filters = ActiveFilters::all();

        filters.toggle(EventType::Inbound);
        assert_eq!(ids(&filters.apply(&events)), vec!["b", "d"]);

        filters.toggle(EventType::Inbound);
        assert_eq!(ids(&filters.apply(&events)), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn custom_filter_requires_name() {
        assert!(CustomFilter::new("  ", DEFAULT_FILTER_COLOR, Utc::now()).is_err());
    }

    #[test]
    fn custom_filter_requires_hex_color() {
        assert!(matches!(
            CustomFilter::new("Visa", "red", Utc::now()),
            Err(EventError::InvalidColor(_))
        ));
    }

    #[test]
    fn custom_filter_serializes_camel_case() {
        let filter = CustomFilter::new("Visa", "#ef4444", Utc::now()).unwrap();
        let json = serde_json::to_value(&filter).unwrap();

        assert!(json.get("createdAt").is_some());
        assert_eq!(json["name"], "Visa");
    }

    fn type_strategy() -> impl Strategy<Value = EventType> {
        prop::sample::select(EventType::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn filtering_is_idempotent(active in prop::collection::vec(type_strategy(), 0..6)) {
            let events = sample();
            let filters: ActiveFilters = active.into_iter().collect();

            let once: Vec<CalendarEvent> = filters.apply(&events).into_iter().cloned().collect();
            let twice: Vec<CalendarEvent> = filters.apply(&once).into_iter().cloned().collect();

            prop_assert_eq!(once, twice);
        }
    }
}
