//! Calendar grid and date helpers shared by the views, the stores and the forms.

use std::fmt::Write as _;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

pub const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

pub const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DateError {
    #[error("Invalid date: {0}")]
    Invalid(String),
    #[error("Invalid date format: {0}")]
    InvalidFormat(String),
}

/// Anything that can be reduced to a calendar day.
pub trait CalendarDay {
    fn to_day(&self) -> Result<NaiveDate, DateError>;
}

impl CalendarDay for NaiveDate {
    fn to_day(&self) -> Result<NaiveDate, DateError> {
        Ok(*self)
    }
}

impl CalendarDay for NaiveDateTime {
    fn to_day(&self) -> Result<NaiveDate, DateError> {
        Ok(self.date())
    }
}

impl CalendarDay for DateTime<Utc> {
    fn to_day(&self) -> Result<NaiveDate, DateError> {
        Ok(self.date_naive())
    }
}

impl CalendarDay for str {
    fn to_day(&self) -> Result<NaiveDate, DateError> {
        parse_day(self)
    }
}

impl CalendarDay for String {
    fn to_day(&self) -> Result<NaiveDate, DateError> {
        parse_day(self)
    }
}

impl<T: CalendarDay + ?Sized> CalendarDay for &T {
    fn to_day(&self) -> Result<NaiveDate, DateError> {
        (**self).to_day()
    }
}

/// Accepts `YYYY-MM-DD`, ISO date-times with or without fraction, and RFC 3339.
pub fn parse_day(input: &str) -> Result<NaiveDate, DateError> {
    let trimmed = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DEFAULT_DATE_FORMAT) {
        return Ok(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.date_naive());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(dt.date());
        }
    }

    Err(DateError::Invalid(input.to_string()))
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn last_of_month(date: NaiveDate) -> NaiveDate {
    first_of_month(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

/// Every day from the Sunday on or before the 1st of `reference`'s month to the
/// Saturday on or after its last day.
pub fn calendar_days(reference: NaiveDate) -> Vec<NaiveDate> {
    let first = first_of_month(reference);
    let last = last_of_month(reference);

    let lead = first.weekday().num_days_from_sunday() as i64;
    let trail = 6 - last.weekday().num_days_from_sunday() as i64;

    let start = first - chrono::Duration::days(lead);
    let end = last + chrono::Duration::days(trail);

    start.iter_days().take_while(|day| *day <= end).collect()
}

pub fn is_same_day<A, B>(a: &A, b: &B) -> Result<bool, DateError>
where
    A: CalendarDay + ?Sized,
    B: CalendarDay + ?Sized,
{
    Ok(a.to_day()? == b.to_day()?)
}

pub fn is_same_month<A, B>(a: &A, b: &B) -> Result<bool, DateError>
where
    A: CalendarDay + ?Sized,
    B: CalendarDay + ?Sized,
{
    let (a, b) = (a.to_day()?, b.to_day()?);
    Ok(a.year() == b.year() && a.month() == b.month())
}

/// Formats with a strftime pattern, `DEFAULT_DATE_FORMAT` when none is given.
pub fn format_date<D>(value: &D, format: Option<&str>) -> Result<String, DateError>
where
    D: CalendarDay + ?Sized,
{
    let day = value.to_day()?;
    let pattern = format.unwrap_or(DEFAULT_DATE_FORMAT);

    let items: Vec<Item> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(DateError::InvalidFormat(pattern.to_string()));
    }

    let mut out = String::new();
    write!(out, "{}", day.format_with_items(items.iter()))
        .map_err(|_| DateError::InvalidFormat(pattern.to_string()))?;
    Ok(out)
}

/// Moves by whole months, clamping the day to the target month's length.
pub fn shift_month(date: NaiveDate, months: i32) -> NaiveDate {
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(months as u32))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}

pub fn month_label(date: NaiveDate) -> String {
    format!("{} {}", MONTHS[date.month0() as usize], date.year())
}
