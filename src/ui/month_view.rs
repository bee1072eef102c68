use chrono::NaiveDate;

use crate::app::CalendarPage;
use crate::grid::{calendar_days, is_same_month};

pub const MAX_CHIPS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct MonthLayout {
    pub month: NaiveDate,
    pub weeks: Vec<Week>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Week {
    pub days: Vec<DayCell>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventChip {
    pub id: String,
    pub title: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub is_selected: bool,
    pub is_today: bool,
    pub is_current_month: bool,
    pub chips: Vec<EventChip>,
    /// Events beyond the shown chips, rendered as "+N more".
    pub overflow: usize,
}

impl DayCell {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            is_selected: false,
            is_today: false,
            is_current_month: true,
            chips: Vec::new(),
            overflow: 0,
        }
    }

    pub fn with_selected(mut self, selected: bool) -> Self {
        self.is_selected = selected;
        self
    }

    pub fn with_today(mut self, today: bool) -> Self {
        self.is_today = today;
        self
    }

    pub fn with_current_month(mut self, current_month: bool) -> Self {
        self.is_current_month = current_month;
        self
    }

    pub fn has_events(&self) -> bool {
        !self.chips.is_empty()
    }

    pub fn more_label(&self) -> Option<String> {
        (self.overflow > 0).then(|| format!("+{} more", self.overflow))
    }
}

pub fn calculate_layout(page: &CalendarPage, today: NaiveDate) -> MonthLayout {
    let month = page.current_month();

    let cells: Vec<DayCell> = calendar_days(month)
        .into_iter()
        .map(|date| {
            let events = page.events_on(date);
            let mut cell = DayCell::new(date)
                .with_selected(date == page.selected_date())
                .with_today(date == today)
                .with_current_month(is_same_month(&date, &month).unwrap_or(false));
            cell.overflow = events.len().saturating_sub(MAX_CHIPS);
            cell.chips = events
                .into_iter()
                .take(MAX_CHIPS)
                .map(|event| EventChip {
                    id: event.id.clone(),
                    title: event.title.clone(),
                    color: event.display_color().to_string(),
                })
                .collect();
            cell
        })
        .collect();

    let weeks = cells
        .chunks(7)
        .map(|days| Week { days: days.to_vec() })
        .collect();

    MonthLayout { month, weeks }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::calendar::{EventData, EventType};
    use crate::store::EventStore;
    use std::sync::Arc;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    async fn page_with_events(days: &[(u32, EventType)]) -> CalendarPage {
        let backend = Arc::new(MemoryBackend::for_calendar());
        let store = EventStore::new(backend);
        for (i, (day, event_type)) in days.iter().enumerate() {
            store
                .create(&EventData::new(format!("Event {}", i), date(2025, 9, *day), *event_type), "tester")
                .await
                .unwrap();
        }
        let mut page = CalendarPage::new(store, date(2025, 9, 15));
        page.load().await;
        page
    }

    #[tokio::test]
    async fn layout_is_whole_weeks_starting_sunday() {
        let page = page_with_events(&[]).await;

        let layout = calculate_layout(&page, date(2025, 9, 15));

        assert_eq!(layout.month, date(2025, 9, 1));
        assert_eq!(layout.weeks.len(), 5);
        assert!(layout.weeks.iter().all(|w| w.days.len() == 7));
        assert_eq!(layout.weeks[0].days[0].date, date(2025, 8, 31));
        assert!(!layout.weeks[0].days[0].is_current_month);
    }

    #[tokio::test]
    async fn selected_and_today_are_marked_once() {
        let page = page_with_events(&[]).await;

        let layout = calculate_layout(&page, date(2025, 9, 3));
        let cells: Vec<&DayCell> = layout.weeks.iter().flat_map(|w| &w.days).collect();

        let selected: Vec<_> = cells.iter().filter(|c| c.is_selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].date, date(2025, 9, 15));
        assert_eq!(cells.iter().filter(|c| c.is_today).count(), 1);
    }

    #[tokio::test]
    async fn busy_day_shows_three_chips_and_overflow() {
        let page = page_with_events(&[
            (10, EventType::Inbound),
            (10, EventType::Outbound),
            (10, EventType::Event),
            (10, EventType::Holiday),
            (10, EventType::University),
        ])
        .await;

        let layout = calculate_layout(&page, date(2025, 9, 15));
        let cell = layout
            .weeks
            .iter()
            .flat_map(|w| &w.days)
            .find(|c| c.date == date(2025, 9, 10))
            .unwrap();

        assert_eq!(cell.chips.len(), MAX_CHIPS);
        assert_eq!(cell.more_label(), Some("+2 more".to_string()));
    }

    #[tokio::test]
    async fn filtered_types_have_no_chips() {
        let mut page = page_with_events(&[(10, EventType::Holiday)]).await;
        page.toggle_filter(EventType::Holiday);

        let layout = calculate_layout(&page, date(2025, 9, 15));

        assert!(layout.weeks.iter().flat_map(|w| &w.days).all(|c| !c.has_events()));
    }
}
