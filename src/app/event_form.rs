use chrono::NaiveDate;
use thiserror::Error;

use crate::calendar::filter::PRESET_COLORS;
use crate::calendar::{CalendarEvent, EventData, EventError, EventType};
use crate::grid::parse_day;

pub const ACTION_ITEM_SEPARATOR: char = ';';

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("Invalid {field} '{value}', expected YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },
    #[error(transparent)]
    Event(#[from] EventError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Type,
    Date,
    EndDate,
    Color,
    Description,
    ActionItems,
}

impl FormField {
    pub fn label(&self) -> &'static str {
        match self {
            FormField::Title => "Title",
            FormField::Type => "Type",
            FormField::Date => "Start date",
            FormField::EndDate => "End date",
            FormField::Color => "Color",
            FormField::Description => "Description",
            FormField::ActionItems => "Action items",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventForm {
    pub title: String,
    pub event_type: EventType,
    pub date: String,
    pub end_date: String,
    pub color: String,
    pub description: String,
    pub action_items: String,
    pub active_field: FormField,
    pub event_id: Option<String>,
}

impl EventForm {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            title: String::new(),
            event_type: EventType::University,
            date: date.format("%Y-%m-%d").to_string(),
            end_date: String::new(),
            color: String::new(),
            description: String::new(),
            action_items: String::new(),
            active_field: FormField::Title,
            event_id: None,
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn for_event(event: &CalendarEvent) -> Self {
        Self {
            title: event.title.clone(),
            event_type: event.event_type,
            date: event.date.format("%Y-%m-%d").to_string(),
            end_date: event
                .end_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            color: event.custom_color.clone().unwrap_or_default(),
            description: event.description.clone().unwrap_or_default(),
            action_items: event
                .action_items
                .join(&format!("{} ", ACTION_ITEM_SEPARATOR)),
            active_field: FormField::Title,
            event_id: Some(event.id.clone()),
        }
    }

    pub fn is_editing(&self) -> bool {
        self.event_id.is_some()
    }

    pub fn next_field(&mut self) {
        self.active_field = match self.active_field {
            FormField::Title => FormField::Type,
            FormField::Type => FormField::Date,
            FormField::Date => FormField::EndDate,
            FormField::EndDate => FormField::Color,
            FormField::Color => FormField::Description,
            FormField::Description => FormField::ActionItems,
            FormField::ActionItems => FormField::Title,
        };
    }

    pub fn prev_field(&mut self) {
        self.active_field = match self.active_field {
            FormField::Title => FormField::ActionItems,
            FormField::Type => FormField::Title,
            FormField::Date => FormField::Type,
            FormField::EndDate => FormField::Date,
            FormField::Color => FormField::EndDate,
            FormField::Description => FormField::Color,
            FormField::ActionItems => FormField::Description,
        };
    }

    /// The text buffer behind the active field; `Type` has none.
    pub fn active_buffer_mut(&mut self) -> Option<&mut String> {
        match self.active_field {
            FormField::Title => Some(&mut self.title),
            FormField::Type => None,
            FormField::Date => Some(&mut self.date),
            FormField::EndDate => Some(&mut self.end_date),
            FormField::Color => Some(&mut self.color),
            FormField::Description => Some(&mut self.description),
            FormField::ActionItems => Some(&mut self.action_items),
        }
    }

    pub fn cycle_type(&mut self, forward: bool) {
        self.event_type = if forward {
            self.event_type.next()
        } else {
            self.event_type.prev()
        };
    }

    /// Steps through the preset palette; past the last preset the custom color is cleared.
    pub fn cycle_color(&mut self) {
        let current = PRESET_COLORS
            .iter()
            .position(|c| c.eq_ignore_ascii_case(self.color.trim()));
        self.color = match current {
            Some(idx) if idx + 1 == PRESET_COLORS.len() => String::new(),
            Some(idx) => PRESET_COLORS[idx + 1].to_string(),
            None if self.color.trim().is_empty() => PRESET_COLORS[0].to_string(),
            None => String::new(),
        };
    }

    pub fn display_color(&self) -> &str {
        let color = self.color.trim();
        if color.is_empty() {
            self.event_type.default_color()
        } else {
            color
        }
    }

    pub fn action_item_list(&self) -> Vec<String> {
        self.action_items
            .split(ACTION_ITEM_SEPARATOR)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn to_data(&self) -> Result<EventData, FormError> {
        let date = parse_day(self.date.trim()).map_err(|_| FormError::InvalidDate {
            field: "start date",
            value: self.date.clone(),
        })?;
        let end_date = match self.end_date.trim() {
            "" => None,
            value => Some(parse_day(value).map_err(|_| FormError::InvalidDate {
                field: "end date",
                value: value.to_string(),
            })?),
        };
        let description = self.description.trim();
        let color = self.color.trim();

        let data = EventData {
            title: self.title.trim().to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
            date,
            end_date,
            event_type: self.event_type,
            custom_color: (!color.is_empty()).then(|| color.to_lowercase()),
            action_items: self.action_item_list(),
        };
        data.validate()?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn new_form_defaults_to_university_type() {
        let form = EventForm::new(date(2025, 8, 18));

        assert_eq!(form.event_type, EventType::University);
        assert_eq!(form.date, "2025-08-18");
        assert_eq!(form.display_color(), "#6b7280");
        assert!(!form.is_editing());
    }

    #[test]
    fn fields_cycle_in_both_directions() {
        let mut form = EventForm::new(date(2025, 8, 18));

        for _ in 0..7 {
            form.next_field();
        }
        assert_eq!(form.active_field, FormField::Title);

        form.prev_field();
        assert_eq!(form.active_field, FormField::ActionItems);
    }

    #[test]
    fn type_field_has_no_text_buffer() {
        let mut form = EventForm::new(date(2025, 8, 18));
        form.active_field = FormField::Type;
        assert!(form.active_buffer_mut().is_none());
    }

    #[test]
    fn to_data_trims_and_splits_action_items() {
        let mut form = EventForm::new(date(2025, 8, 25)).with_title("  Nominations  ");
        form.event_type = EventType::Outbound;
        form.action_items = "Posters; ; Email blast ;".to_string();
        form.description = "   ".to_string();

        let data = form.to_data().unwrap();

        assert_eq!(data.title, "Nominations");
        assert_eq!(data.action_items, vec!["Posters", "Email blast"]);
        assert_eq!(data.description, None);
        assert_eq!(data.custom_color, None);
    }

    #[test]
    fn to_data_rejects_bad_dates() {
        let mut form = EventForm::new(date(2025, 8, 25)).with_title("Trip");
        form.end_date = "next week".to_string();

        assert!(matches!(form.to_data(), Err(FormError::InvalidDate { field: "end date", .. })));
    }

    #[test]
    fn to_data_rejects_end_before_start() {
        let mut form = EventForm::new(date(2025, 8, 25)).with_title("Trip");
        form.end_date = "2025-08-24".to_string();

        assert!(matches!(
            form.to_data(),
            Err(FormError::Event(EventError::EndBeforeStart { .. }))
        ));
    }

    #[test]
    fn missing_title_is_rejected() {
        let form = EventForm::new(date(2025, 8, 25));
        assert_eq!(form.to_data(), Err(FormError::Event(EventError::MissingTitle)));
    }

    #[test]
    fn color_cycles_through_presets_then_clears() {
        let mut form = EventForm::new(date(2025, 8, 25));

        form.cycle_color();
        assert_eq!(form.color, PRESET_COLORS[0]);

        form.color = PRESET_COLORS[PRESET_COLORS.len() - 1].to_string();
        form.cycle_color();
        assert_eq!(form.color, "");
    }

    #[test]
    fn for_event_round_trips_user_fields() {
        let mut data = EventData::new("Study tour", date(2026, 1, 17), EventType::StudyTour);
        data.end_date = Some(date(2026, 1, 23));
        data.custom_color = Some("#ec4899".to_string());
        data.action_items = vec!["Visas".to_string(), "Flights".to_string()];
        let event = CalendarEvent::new("e1", data.clone(), "me", Utc::now()).unwrap();

        let form = EventForm::for_event(&event);

        assert!(form.is_editing());
        assert_eq!(form.to_data().unwrap(), data);
    }
}
