use chrono::NaiveDate;

use crate::calendar::event::{EventData, EventType};

pub const SAMPLE_AUTHOR: &str = "OIAA System";

/// Academic-year entries used to seed the demo backend.
pub fn sample_events() -> Vec<EventData> {
    const ENTRIES: &[(&str, &str, Option<&str>, EventType, &[&str])] = &[
        ("New students orientation week begins", "2025-08-18", None, EventType::University, &[]),
        ("Credit transfer & change of major requests", "2025-08-18", Some("2025-08-22"), EventType::University, &[]),
        ("Last day of admission for Fall Semester", "2025-08-22", None, EventType::University, &[]),
        (
            "1st Call for Outbound Exchange Nominations",
            "2025-08-25",
            None,
            EventType::Outbound,
            &[
                "Launch campus-wide poster campaign",
                "Add prominent \"Apply for Exchange!\" button to the OIAA website homepage",
                "Targeted email blast to all eligible undergraduate students",
            ],
        ),
        ("Beginning of classes", "2025-08-25", None, EventType::University, &[]),
        ("Advising sessions for outbound exchange", "2025-09-08", Some("2025-09-19"), EventType::Outbound, &[]),
        ("Trip to Louvre AD / Grand Mosque", "2025-09-12", None, EventType::Event, &[]),
        ("1st Call for Inbound Exchange Nominations", "2025-09-22", None, EventType::Inbound, &[]),
        ("Nomination period for outbound students", "2025-09-22", Some("2025-10-03"), EventType::Outbound, &[]),
        ("Trip to Dubai Frame / Dubai Mall", "2025-09-26", None, EventType::Event, &[]),
        ("2nd Call for Inbound Exchange Nominations", "2025-10-27", None, EventType::Inbound, &[]),
        ("Nomination Deadline", "2025-11-21", None, EventType::Inbound, &[]),
        ("UAE National Day holiday", "2025-12-02", Some("2025-12-03"), EventType::Holiday, &[]),
        ("Pre-arrival Orientation Session", "2025-12-09", None, EventType::Inbound, &[]),
        ("Winter Study Tour - Batch 1", "2026-01-17", Some("2026-01-23"), EventType::StudyTour, &[]),
        ("Winter Study Tour - Batch 2", "2026-01-31", Some("2026-02-06"), EventType::StudyTour, &[]),
        ("Eid Al Fitr Al Mubarak", "2026-03-19", Some("2026-03-22"), EventType::Holiday, &[]),
        ("Spring Semester break", "2026-03-23", Some("2026-03-27"), EventType::University, &[]),
    ];

    let mut events = Vec::with_capacity(ENTRIES.len());
    for &(title, date, end_date, event_type, action_items) in ENTRIES {
        let Ok(date) = NaiveDate::parse_from_str(date, "%Y-%m-%d") else { continue };
        let end_date = end_date.and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());

        let mut data = EventData::new(title, date, event_type);
        data.end_date = end_date;
        data.action_items = action_items.iter().map(|item| item.to_string()).collect();
        events.push(data);
    }
    events
}
