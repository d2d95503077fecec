//! Time-slot grid model: the ordered list of bookable intervals in a day and
//! the visible week of days laid against it.
//!
//! The grid carries no behavior beyond enumeration and mapping between grid
//! cells and `(date, slot)` pairs. Span computation for drag gestures lives
//! here too because it is pure geometry over the cell coordinates.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::config::WeekStart;
use crate::error::{EngineError, Result};
use crate::slot::{SelectedTimeSlot, TimeSlotLabel, ZoneId};

/// Number of day columns in a week view.
pub const DAYS_PER_WEEK: usize = 7;

/// One bookable interval within a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDefinition {
    pub label: TimeSlotLabel,
    /// Local wall-clock start of the slot in the facility timezone.
    pub start: NaiveTime,
    pub duration_minutes: u32,
}

/// Ordered list of slot definitions. Slot order is the list order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SlotDefinition>", into = "Vec<SlotDefinition>")]
pub struct TimeSlotGrid {
    slots: Vec<SlotDefinition>,
}

impl TimeSlotGrid {
    /// Build a grid from explicit definitions. Labels must be unique.
    pub fn new(slots: Vec<SlotDefinition>) -> Result<Self> {
        for (i, slot) in slots.iter().enumerate() {
            if slot.label.is_empty() {
                return Err(EngineError::InvalidGrid(format!("slot {} has an empty label", i)));
            }
            if slots[..i].iter().any(|s| s.label == slot.label) {
                return Err(EngineError::InvalidGrid(format!(
                    "duplicate slot label '{}'",
                    slot.label
                )));
            }
        }
        Ok(Self { slots })
    }

    /// One-hour slots labelled `"HH:00"` from `open_hour` up to (not including)
    /// `close_hour`.
    pub fn hourly(open_hour: u32, close_hour: u32) -> Result<Self> {
        if open_hour >= close_hour || close_hour > 24 {
            return Err(EngineError::InvalidGrid(format!(
                "opening hours {}..{} are not a valid range",
                open_hour, close_hour
            )));
        }
        let slots = (open_hour..close_hour)
            .map(|h| SlotDefinition {
                label: format!("{:02}:00", h),
                start: NaiveTime::from_hms_opt(h, 0, 0).unwrap_or(NaiveTime::MIN),
                duration_minutes: 60,
            })
            .collect();
        Self::new(slots)
    }

    /// Parse labels of the form `"HH:MM"` or `"HH:MM-HH:MM"`.
    ///
    /// Ranged labels take their duration from the range; bare start times get
    /// `default_minutes`.
    pub fn from_labels<S: AsRef<str>>(labels: &[S], default_minutes: u32) -> Result<Self> {
        let slots = labels
            .iter()
            .map(|l| parse_label(l.as_ref(), default_minutes))
            .collect::<Result<Vec<_>>>()?;
        Self::new(slots)
    }

    pub fn slots(&self) -> &[SlotDefinition] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|s| s.label.as_str())
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.label == label)
    }

    pub fn get(&self, label: &str) -> Option<&SlotDefinition> {
        self.slots.iter().find(|s| s.label == label)
    }

    pub fn at(&self, index: usize) -> Option<&SlotDefinition> {
        self.slots.get(index)
    }
}

impl TryFrom<Vec<SlotDefinition>> for TimeSlotGrid {
    type Error = EngineError;

    fn try_from(slots: Vec<SlotDefinition>) -> Result<Self> {
        Self::new(slots)
    }
}

impl From<TimeSlotGrid> for Vec<SlotDefinition> {
    fn from(grid: TimeSlotGrid) -> Self {
        grid.slots
    }
}

fn parse_label(label: &str, default_minutes: u32) -> Result<SlotDefinition> {
    let parse_time = |s: &str| {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map_err(|e| EngineError::InvalidGrid(format!("bad slot label '{}': {}", label, e)))
    };

    match label.split_once('-') {
        Some((from, to)) => {
            let start = parse_time(from)?;
            let end = parse_time(to)?;
            if end <= start {
                return Err(EngineError::InvalidGrid(format!(
                    "slot '{}' ends before it starts",
                    label
                )));
            }
            Ok(SlotDefinition {
                label: label.to_string(),
                start,
                duration_minutes: (end - start).num_minutes() as u32,
            })
        }
        None => Ok(SlotDefinition {
            label: label.to_string(),
            start: parse_time(label)?,
            duration_minutes: default_minutes,
        }),
    }
}

/// A cell in the week view: day column × slot row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub day: usize,
    pub slot: usize,
}

impl Cell {
    pub fn new(day: usize, slot: usize) -> Self {
        Self { day, slot }
    }
}

/// How a drag between two cells is turned into a span of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanShape {
    /// Every cell inside the bounding box of the two endpoints.
    #[default]
    Rectangle,
    /// Every cell between the endpoints in reading order (day by day, slots
    /// top to bottom within a day).
    Linear,
}

/// The visible week for a single zone.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekGrid {
    zone_id: ZoneId,
    first_day: NaiveDate,
    slots: TimeSlotGrid,
}

impl WeekGrid {
    /// Week view containing `date`, starting on the configured week-start day.
    pub fn containing(
        zone_id: impl Into<ZoneId>,
        date: NaiveDate,
        week_start: WeekStart,
        slots: TimeSlotGrid,
    ) -> Self {
        Self {
            zone_id: zone_id.into(),
            first_day: week_start.week_of(date),
            slots,
        }
    }

    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    pub fn slots(&self) -> &TimeSlotGrid {
        &self.slots
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..DAYS_PER_WEEK).map(move |d| self.first_day + Duration::days(d as i64))
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.day < DAYS_PER_WEEK && cell.slot < self.slots.len()
    }

    pub fn date_of(&self, cell: Cell) -> Option<NaiveDate> {
        self.contains(cell)
            .then(|| self.first_day + Duration::days(cell.day as i64))
    }

    /// Cell for a `(date, slot)` pair, if it falls inside this week.
    pub fn cell_of(&self, date: NaiveDate, label: &str) -> Option<Cell> {
        let day = (date - self.first_day).num_days();
        if !(0..DAYS_PER_WEEK as i64).contains(&day) {
            return None;
        }
        let slot = self.slots.index_of(label)?;
        Some(Cell::new(day as usize, slot))
    }

    /// The occurrence a cell stands for.
    pub fn occurrence(&self, cell: Cell) -> Option<SelectedTimeSlot> {
        let date = self.date_of(cell)?;
        let def = self.slots.at(cell.slot)?;
        Some(SelectedTimeSlot::new(
            self.zone_id.clone(),
            date,
            def.label.clone(),
            def.duration_minutes,
        ))
    }

    /// All cells between `a` and `b` inclusive. The result is sorted in
    /// reading order and does not depend on which endpoint came first.
    pub fn span(&self, a: Cell, b: Cell, shape: SpanShape) -> Vec<Cell> {
        if !self.contains(a) || !self.contains(b) {
            return Vec::new();
        }
        match shape {
            SpanShape::Rectangle => {
                let (d0, d1) = (a.day.min(b.day), a.day.max(b.day));
                let (s0, s1) = (a.slot.min(b.slot), a.slot.max(b.slot));
                (d0..=d1)
                    .flat_map(|day| (s0..=s1).map(move |slot| Cell::new(day, slot)))
                    .collect()
            }
            SpanShape::Linear => {
                let rows = self.slots.len();
                let linear = |c: Cell| c.day * rows + c.slot;
                let (lo, hi) = (linear(a).min(linear(b)), linear(a).max(linear(b)));
                (lo..=hi).map(|i| Cell::new(i / rows, i % rows)).collect()
            }
        }
    }
}

impl WeekStart {
    /// First day of the week containing `date`.
    pub fn week_of(self, date: NaiveDate) -> NaiveDate {
        let offset = match self {
            WeekStart::Monday => date.weekday().num_days_from_monday(),
            WeekStart::Sunday => date.weekday().num_days_from_sunday(),
        };
        date - Duration::days(offset as i64)
    }
}
