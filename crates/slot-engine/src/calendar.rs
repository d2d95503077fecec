//! Holiday and blackout rules.
//!
//! The holiday calendar is an external collaborator; the engine only needs a
//! predicate with a human-readable reason.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};

/// Marks whole dates as categorically unavailable, regardless of bookings.
pub trait BlackoutCalendar {
    /// `Some(reason)` when nothing can be booked on `date`.
    fn blackout_reason(&self, date: NaiveDate) -> Option<String>;

    fn is_unavailable(&self, date: NaiveDate) -> bool {
        self.blackout_reason(date).is_some()
    }
}

/// A calendar without any blackout dates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBlackouts;

impl BlackoutCalendar for NoBlackouts {
    fn blackout_reason(&self, _date: NaiveDate) -> Option<String> {
        None
    }
}

/// Explicit list of closed dates with their reason.
#[derive(Debug, Clone, Default)]
pub struct HolidayList {
    days: BTreeMap<NaiveDate, String>,
}

impl HolidayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, date: NaiveDate, reason: impl Into<String>) -> Self {
        self.insert(date, reason);
        self
    }

    pub fn insert(&mut self, date: NaiveDate, reason: impl Into<String>) {
        self.days.insert(date, reason.into());
    }
}

impl FromIterator<(NaiveDate, String)> for HolidayList {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, String)>>(iter: I) -> Self {
        Self {
            days: iter.into_iter().collect(),
        }
    }
}

impl BlackoutCalendar for HolidayList {
    fn blackout_reason(&self, date: NaiveDate) -> Option<String> {
        self.days.get(&date).cloned()
    }
}

/// Recurring closure on fixed weekdays (e.g. closed every Sunday).
#[derive(Debug, Clone, Default)]
pub struct WeeklyClosure {
    weekdays: Vec<Weekday>,
}

impl WeeklyClosure {
    pub fn new(weekdays: impl IntoIterator<Item = Weekday>) -> Self {
        Self {
            weekdays: weekdays.into_iter().collect(),
        }
    }
}

impl BlackoutCalendar for WeeklyClosure {
    fn blackout_reason(&self, date: NaiveDate) -> Option<String> {
        let weekday = date.weekday();
        self.weekdays
            .contains(&weekday)
            .then(|| format!("closed on {}", weekday))
    }
}

/// Combination of calendars; the first one reporting a blackout wins.
impl<A: BlackoutCalendar, B: BlackoutCalendar> BlackoutCalendar for (A, B) {
    fn blackout_reason(&self, date: NaiveDate) -> Option<String> {
        self.0
            .blackout_reason(date)
            .or_else(|| self.1.blackout_reason(date))
    }
}
