use std::{fmt, str::FromStr};

use time::{macros::format_description, parsing::Parsed, Date, Month, PrimitiveDateTime};

/// Month for a full English month name ("March").
pub fn month_from_name(full_name: &str) -> Option<Month> {
    let mut parsed = Parsed::new();
    let rest = parsed
        .parse_items(full_name.trim().as_bytes(), format_description!("[month repr:long]"))
        .ok()?;
    if rest.is_empty() {
        parsed.month()
    } else {
        None
    }
}

/// Parse a `YYYY-MM-DD` date, optionally followed by a ` HH:MM:SS` or
/// `THH:MM:SS` time part as written by spreadsheet exports.
pub fn parse_iso_date(s: &str) -> Option<Date> {
    let s = s.trim();
    Date::parse(s, format_description!("[year]-[month]-[day]"))
        .or_else(|_| {
            PrimitiveDateTime::parse(
                s,
                format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
            )
            .map(PrimitiveDateTime::date)
        })
        .or_else(|_| {
            PrimitiveDateTime::parse(
                s,
                format_description!(
                    "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
                ),
            )
            .map(PrimitiveDateTime::date)
        })
        .ok()
}

/// `YYYY-MM-DD`, the dataset's timestamp format.
pub fn format_iso_date(date: Date) -> Result<String, time::error::Format> {
    date.format(format_description!("[year]-[month]-[day]"))
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid reporting period '{0}', expected e.g. 'Aug 2022'")]
pub struct InvalidPeriod(pub String);

/// A reporting month, displayed as `"%b %Y"` (e.g. "Aug 2022").
///
/// Stored as the first day of the month so ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReportingPeriod(Date);

impl ReportingPeriod {
    pub fn new(year: i32, month: Month) -> Result<Self, InvalidPeriod> {
        Date::from_calendar_date(year, month, 1)
            .map(Self)
            .map_err(|_| InvalidPeriod(format!("{month} {year}")))
    }

    /// The reporting month containing `date`.
    pub fn containing(date: Date) -> Self {
        Self(date.replace_day(1).unwrap_or(date))
    }

    pub fn first_day(&self) -> Date {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> Month {
        self.0.month()
    }
}

impl fmt::Display for ReportingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .0
            .format(format_description!("[month repr:short] [year]"))
            .map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl FromStr for ReportingPeriod {
    type Err = InvalidPeriod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidPeriod(s.to_string());
        let mut parsed = Parsed::new();
        let rest = parsed
            .parse_items(s.trim().as_bytes(), format_description!("[month repr:short] [year]"))
            .map_err(|_| invalid())?;
        if !rest.is_empty() {
            return Err(invalid());
        }
        let (Some(month), Some(year)) = (parsed.month(), parsed.year()) else {
            return Err(invalid());
        };
        Self::new(year, month).map_err(|_| invalid())
    }
}
