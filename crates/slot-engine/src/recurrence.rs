//! Recurrence expansion -- turns a weekday/time-slot pattern into concrete
//! occurrences.
//!
//! Expansion is lazy and bounded: [`generate_occurrences`] returns an iterator
//! that stops at the pattern's end date (inclusive) or after
//! `max_occurrences` items, whichever comes first. Occurrences are emitted in
//! non-decreasing date order, and within a date in the order the pattern
//! declares its time slots.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::config::WeekStart;
use crate::error::{EngineError, Result};
use crate::grid::TimeSlotGrid;
use crate::slot::{SelectedTimeSlot, TimeSlotLabel, ZoneId};

/// Duration given to slots the grid does not define.
pub const FALLBACK_SLOT_MINUTES: u32 = 60;

/// Recurrence cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceKind {
    /// Every `interval` weeks.
    Weekly,
    /// Every other week. The stored interval is ignored.
    Biweekly,
    /// Every selected weekday of every `interval`-th calendar month.
    Monthly,
}

fn default_interval() -> u32 {
    1
}

/// A recurring booking request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrencePattern {
    #[serde(rename = "type")]
    pub kind: RecurrenceKind,
    pub weekdays: Vec<Weekday>,
    pub time_slots: Vec<TimeSlotLabel>,
    #[serde(default = "default_interval")]
    pub interval: u32,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub week_start: WeekStart,
}

impl RecurrencePattern {
    pub fn new(kind: RecurrenceKind, start_date: NaiveDate) -> Self {
        Self {
            kind,
            weekdays: Vec::new(),
            time_slots: Vec::new(),
            interval: 1,
            start_date,
            end_date: None,
            week_start: WeekStart::default(),
        }
    }

    pub fn weekly(start_date: NaiveDate) -> Self {
        Self::new(RecurrenceKind::Weekly, start_date)
    }

    pub fn on(mut self, weekdays: impl IntoIterator<Item = Weekday>) -> Self {
        self.weekdays = weekdays.into_iter().collect();
        self
    }

    pub fn at<S: Into<TimeSlotLabel>>(mut self, slots: impl IntoIterator<Item = S>) -> Self {
        self.time_slots = slots.into_iter().map(Into::into).collect();
        self
    }

    pub fn every(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    pub fn until(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Both the weekday set and the slot set are non-empty.
    pub fn is_applicable(&self) -> bool {
        !self.weekdays.is_empty() && !self.time_slots.is_empty()
    }

    /// Interval actually used for week/month counting.
    pub fn effective_interval(&self) -> u32 {
        match self.kind {
            RecurrenceKind::Biweekly => 2,
            RecurrenceKind::Weekly | RecurrenceKind::Monthly => self.interval.max(1),
        }
    }

    /// Check the pattern before it is applied to a grid.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidPattern` when the weekday or slot set is
    /// empty, the interval is zero, the end date precedes the start date, or a
    /// slot is not on `grid`.
    pub fn validate(&self, grid: &TimeSlotGrid) -> Result<()> {
        let problem = if self.weekdays.is_empty() {
            Some("select at least one weekday".to_string())
        } else if self.time_slots.is_empty() {
            Some("select at least one time slot".to_string())
        } else if self.interval == 0 && self.kind != RecurrenceKind::Biweekly {
            Some("interval must be at least 1".to_string())
        } else if self.end_date.is_some_and(|end| end < self.start_date) {
            Some("end date is before start date".to_string())
        } else {
            self.time_slots
                .iter()
                .find(|s| grid.get(s).is_none())
                .map(|s| format!("time slot '{}' is not offered", s))
        };

        match problem {
            Some(message) => {
                tracing::debug!(%message, "recurrence pattern rejected");
                Err(EngineError::InvalidPattern(message))
            }
            None => Ok(()),
        }
    }

    /// Validate, then expand. This is the "apply pattern" action.
    pub fn apply<'a>(
        &'a self,
        search_start: NaiveDate,
        zone_id: impl Into<ZoneId>,
        grid: &TimeSlotGrid,
        max_occurrences: usize,
    ) -> Result<Occurrences<'a>> {
        self.validate(grid)?;
        Ok(generate_occurrences(self, search_start, zone_id, grid, max_occurrences))
    }

    /// True if `date` is a candidate date of this pattern (ignoring bounds
    /// other than the start date).
    pub fn matches(&self, date: NaiveDate) -> bool {
        date >= self.start_date
            && self.weekdays.contains(&date.weekday())
            && self.period_index(date) % self.effective_interval() as i64 == 0
    }

    /// RFC 5545 RRULE text for this pattern, for calendar export.
    ///
    /// `UNTIL` is written as the last second of the end date in UTC.
    pub fn to_rrule(&self) -> String {
        let freq = match self.kind {
            RecurrenceKind::Weekly | RecurrenceKind::Biweekly => "WEEKLY",
            RecurrenceKind::Monthly => "MONTHLY",
        };
        let mut days: Vec<Weekday> = self.weekdays.clone();
        days.sort_by_key(|d| d.num_days_from_monday());
        days.dedup();
        let byday: Vec<&str> = days.iter().map(|d| ical_day(*d)).collect();

        let mut rule = format!("FREQ={}", freq);
        if self.effective_interval() > 1 {
            rule.push_str(&format!(";INTERVAL={}", self.effective_interval()));
        }
        if !byday.is_empty() {
            rule.push_str(&format!(";BYDAY={}", byday.join(",")));
        }
        let wkst = match self.week_start {
            WeekStart::Monday => "MO",
            WeekStart::Sunday => "SU",
        };
        rule.push_str(&format!(";WKST={}", wkst));
        if let Some(end) = self.end_date {
            rule.push_str(&format!(";UNTIL={}T235959Z", end.format("%Y%m%d")));
        }
        rule
    }

    /// Whole weeks (or months) elapsed between the start date's period and
    /// `date`'s period.
    fn period_index(&self, date: NaiveDate) -> i64 {
        match self.kind {
            RecurrenceKind::Weekly | RecurrenceKind::Biweekly => {
                let anchor = self.week_start.week_of(self.start_date);
                (self.week_start.week_of(date) - anchor).num_days() / 7
            }
            RecurrenceKind::Monthly => month_number(date) - month_number(self.start_date),
        }
    }

    /// First day of the next period that the interval selects, after the
    /// period containing `date`.
    fn next_period_start(&self, date: NaiveDate) -> Option<NaiveDate> {
        let n = self.effective_interval() as i64;
        let next_index = (self.period_index(date) / n + 1) * n;
        match self.kind {
            RecurrenceKind::Weekly | RecurrenceKind::Biweekly => {
                let anchor = self.week_start.week_of(self.start_date);
                anchor.checked_add_signed(Duration::try_weeks(next_index)?)
            }
            RecurrenceKind::Monthly => {
                let total = month_number(self.start_date).checked_add(next_index)?;
                let year = i32::try_from(total.div_euclid(12)).ok()?;
                NaiveDate::from_ymd_opt(year, total.rem_euclid(12) as u32 + 1, 1)
            }
        }
    }

    /// First candidate date on or after `from`.
    fn next_candidate(&self, from: NaiveDate) -> Option<NaiveDate> {
        let n = self.effective_interval() as i64;
        let mut date = from.max(self.start_date);
        loop {
            if self.period_index(date) % n != 0 {
                date = self.next_period_start(date)?;
                continue;
            }
            if self.weekdays.contains(&date.weekday()) {
                return Some(date);
            }
            date = date.succ_opt()?;
        }
    }
}

fn month_number(date: NaiveDate) -> i64 {
    date.year() as i64 * 12 + date.month0() as i64
}

fn ical_day(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

/// Lazy, bounded stream of occurrences for one pattern and zone.
#[derive(Debug, Clone)]
pub struct Occurrences<'a> {
    pattern: &'a RecurrencePattern,
    zone_id: ZoneId,
    durations: Vec<u32>,
    /// Next date to search from.
    cursor: Option<NaiveDate>,
    /// Date whose slots are being emitted, and the next slot index.
    current: Option<(NaiveDate, usize)>,
    remaining: usize,
}

impl<'a> Occurrences<'a> {
    fn empty(pattern: &'a RecurrencePattern, zone_id: ZoneId) -> Self {
        Self {
            pattern,
            zone_id,
            durations: Vec::new(),
            cursor: None,
            current: None,
            remaining: 0,
        }
    }
}

impl Iterator for Occurrences<'_> {
    type Item = SelectedTimeSlot;

    fn next(&mut self) -> Option<SelectedTimeSlot> {
        if self.remaining == 0 {
            return None;
        }
        loop {
            if let Some((date, index)) = self.current {
                if let Some(label) = self.pattern.time_slots.get(index) {
                    self.current = Some((date, index + 1));
                    self.remaining -= 1;
                    return Some(SelectedTimeSlot::new(
                        self.zone_id.clone(),
                        date,
                        label.clone(),
                        self.durations[index],
                    ));
                }
                self.current = None;
            }

            let from = self.cursor?;
            let Some(date) = self.pattern.next_candidate(from) else {
                self.cursor = None;
                return None;
            };
            if self.pattern.end_date.is_some_and(|end| date > end) {
                self.cursor = None;
                return None;
            }
            self.cursor = date.succ_opt();
            self.current = Some((date, 0));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

/// Expand `pattern` for `zone_id` starting at `max(pattern.start_date, search_start)`.
///
/// Interval counting stays anchored at the pattern's start date, so a search
/// window that begins mid-pattern yields the same dates the full expansion
/// would. Patterns with an empty weekday or slot set yield nothing.
///
/// # Arguments
/// - `pattern` -- the recurrence request
/// - `search_start` -- first date the caller is interested in
/// - `zone_id` -- zone every occurrence is for
/// - `grid` -- slot definitions, used for occurrence durations
/// - `max_occurrences` -- hard cap on emitted occurrences
pub fn generate_occurrences<'a>(
    pattern: &'a RecurrencePattern,
    search_start: NaiveDate,
    zone_id: impl Into<ZoneId>,
    grid: &TimeSlotGrid,
    max_occurrences: usize,
) -> Occurrences<'a> {
    let zone_id = zone_id.into();
    if !pattern.is_applicable() || max_occurrences == 0 {
        return Occurrences::empty(pattern, zone_id);
    }

    let durations = pattern
        .time_slots
        .iter()
        .map(|s| grid.get(s).map_or(FALLBACK_SLOT_MINUTES, |def| def.duration_minutes))
        .collect();

    Occurrences {
        pattern,
        zone_id,
        durations,
        cursor: Some(search_start.max(pattern.start_date)),
        current: None,
        remaining: max_occurrences,
    }
}
