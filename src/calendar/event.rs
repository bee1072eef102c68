use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EventError {
    #[error("Event title is required")]
    MissingTitle,
    #[error("End date {end} is before start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
    #[error("Invalid color '{0}', expected #rrggbb")]
    InvalidColor(String),
    #[error("Unknown event type '{0}'")]
    UnknownType(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Inbound,
    Outbound,
    Event,
    StudyTour,
    University,
    Holiday,
}

impl EventType {
    pub const ALL: [EventType; 6] = [
        EventType::Inbound,
        EventType::Outbound,
        EventType::Event,
        EventType::StudyTour,
        EventType::University,
        EventType::Holiday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Inbound => "inbound",
            EventType::Outbound => "outbound",
            EventType::Event => "event",
            EventType::StudyTour => "studytour",
            EventType::University => "university",
            EventType::Holiday => "holiday",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EventType::Inbound => "Inbound Tasks",
            EventType::Outbound => "Outbound Tasks",
            EventType::Event => "Events / Trips",
            EventType::StudyTour => "Study Tour",
            EventType::University => "University Deadline",
            EventType::Holiday => "Holiday",
        }
    }

    pub fn default_color(&self) -> &'static str {
        match self {
            EventType::Inbound => "#22c55e",
            EventType::Outbound => "#3b82f6",
            EventType::Event => "#a855f7",
            EventType::StudyTour => "#06b6d4",
            EventType::University => "#6b7280",
            EventType::Holiday => "#ef4444",
        }
    }

    pub fn next(&self) -> EventType {
        let idx = Self::ALL.iter().position(|t| t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(&self) -> EventType {
        let idx = Self::ALL.iter().position(|t| t == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| EventError::UnknownType(s.to_string()))
    }
}

pub fn is_hex_color(value: &str) -> bool {
    static HEX_COLOR_RE: OnceLock<Option<Regex>> = OnceLock::new();
    HEX_COLOR_RE
        .get_or_init(|| Regex::new(r"^#[0-9a-fA-F]{6}$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(value))
}

/// The fields a user fills in; everything else is assigned by the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub event_type: EventType,
    pub custom_color: Option<String>,
    pub action_items: Vec<String>,
}

impl EventData {
    pub fn new(title: impl Into<String>, date: NaiveDate, event_type: EventType) -> Self {
        Self {
            title: title.into(),
            description: None,
            date,
            end_date: None,
            event_type,
            custom_color: None,
            action_items: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), EventError> {
        if self.title.trim().is_empty() {
            return Err(EventError::MissingTitle);
        }

        if let Some(end) = self.end_date {
            if end < self.date {
                return Err(EventError::EndBeforeStart { start: self.date, end });
            }
        }

        if let Some(color) = &self.custom_color {
            if !is_hex_color(color) {
                return Err(EventError::InvalidColor(color.clone()));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub event_type: EventType,
    pub custom_color: Option<String>,
    pub action_items: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CalendarEvent {
    pub fn new(
        id: impl Into<String>,
        data: EventData,
        created_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, EventError> {
        data.validate()?;
        Ok(Self {
            id: id.into(),
            title: data.title,
            description: data.description,
            date: data.date,
            end_date: data.end_date,
            event_type: data.event_type,
            custom_color: data.custom_color,
            action_items: data.action_items,
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Merges submitted fields; id and creation audit fields are kept.
    pub fn apply(&mut self, data: EventData, now: DateTime<Utc>) -> Result<(), EventError> {
        data.validate()?;
        self.title = data.title;
        self.description = data.description;
        self.date = data.date;
        self.end_date = data.end_date;
        self.event_type = data.event_type;
        self.custom_color = data.custom_color;
        self.action_items = data.action_items;
        self.updated_at = now;
        Ok(())
    }

    pub fn data(&self) -> EventData {
        EventData {
            title: self.title.clone(),
            description: self.description.clone(),
            date: self.date,
            end_date: self.end_date,
            event_type: self.event_type,
            custom_color: self.custom_color.clone(),
            action_items: self.action_items.clone(),
        }
    }

    pub fn display_color(&self) -> &str {
        self.custom_color
            .as_deref()
            .unwrap_or_else(|| self.event_type.default_color())
    }

    pub fn starts_on(&self, day: NaiveDate) -> bool {
        self.date == day
    }

    pub fn duration_days(&self) -> i64 {
        self.end_date
            .map(|end| (end - self.date).num_days() + 1)
            .unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn create_test_event(event_type: EventType) -> CalendarEvent {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        CalendarEvent::new(
            "event1",
            EventData::new("Orientation week", date(2025, 8, 18), event_type),
            "OIAA System",
            created,
        )
        .unwrap()
    }

    #[test]
    fn event_type_round_trips_through_wire_name() {
        for event_type in EventType::ALL {
            assert_eq!(event_type.as_str().parse::<EventType>(), Ok(event_type));
        }
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        assert_eq!(
            "meeting".parse::<EventType>(),
            Err(EventError::UnknownType("meeting".to_string()))
        );
    }

    #[test]
    fn event_type_serializes_lowercase() {
        let json = serde_json::to_string(&EventType::StudyTour).unwrap();
        assert_eq!(json, "\"studytour\"");
    }

    #[test]
    fn next_and_prev_cycle_through_all_types() {
        assert_eq!(EventType::Holiday.next(), EventType::Inbound);
        assert_eq!(EventType::Inbound.prev(), EventType::Holiday);
    }

    #[test]
    fn end_date_before_start_is_rejected() {
        let mut data = EventData::new("Trip", date(2025, 9, 10), EventType::Event);
        data.end_date = Some(date(2025, 9, 9));

        let result = CalendarEvent::new("e", data, "me", Utc::now());

        assert_eq!(
            result.unwrap_err(),
            EventError::EndBeforeStart { start: date(2025, 9, 10), end: date(2025, 9, 9) }
        );
    }

    #[test]
    fn same_day_end_date_is_accepted() {
        let mut data = EventData::new("Trip", date(2025, 9, 10), EventType::Event);
        data.end_date = Some(date(2025, 9, 10));

        assert!(data.validate().is_ok());
    }

    #[test]
    fn blank_title_is_rejected() {
        let data = EventData::new("   ", date(2025, 9, 10), EventType::Event);
        assert_eq!(data.validate(), Err(EventError::MissingTitle));
    }

    #[test]
    fn malformed_custom_color_is_rejected() {
        let mut data = EventData::new("Trip", date(2025, 9, 10), EventType::Event);
        data.custom_color = Some("blue".to_string());

        assert_eq!(data.validate(), Err(EventError::InvalidColor("blue".to_string())));
    }

    #[test]
    fn display_color_falls_back_to_type_default() {
        let mut event = create_test_event(EventType::Holiday);
        assert_eq!(event.display_color(), "#ef4444");

        event.custom_color = Some("#123456".to_string());
        assert_eq!(event.display_color(), "#123456");
    }

    #[test]
    fn apply_changes_type_but_keeps_identity_and_creation() {
        let mut event = create_test_event(EventType::University);
        let original = event.clone();
        let later = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();

        let mut data = event.data();
        data.event_type = EventType::Inbound;
        event.apply(data, later).unwrap();

        assert_eq!(event.id, original.id);
        assert_eq!(event.created_by, original.created_by);
        assert_eq!(event.created_at, original.created_at);
        assert_eq!(event.updated_at, later);
        assert_eq!(event.display_color(), EventType::Inbound.default_color());
    }

    #[test]
    fn multi_day_event_duration_includes_both_ends() {
        let mut event = create_test_event(EventType::University);
        assert_eq!(event.duration_days(), 1);

        event.end_date = Some(date(2025, 8, 22));
        assert_eq!(event.duration_days(), 5);
    }
}
