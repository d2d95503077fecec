//! Occurrence and booking records shared by every component.
//!
//! A [`SelectedTimeSlot`] is one concrete `(zone, date, time-slot)` candidate.
//! Set membership is decided by its [`SlotKey`]; the duration rides along for
//! downstream pricing and never affects identity.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Opaque label of a bookable interval within a day (e.g. `"10:00"` or
/// `"10:00-11:00"`). Ordering comes from the grid's slot list, not from
/// string comparison.
pub type TimeSlotLabel = String;

/// Zone identifier as issued by the facility directory.
pub type ZoneId = String;

/// Identity of an occurrence: zone, calendar day and slot label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    pub zone_id: ZoneId,
    pub date: NaiveDate,
    pub time_slot: TimeSlotLabel,
}

impl SlotKey {
    pub fn new(zone_id: impl Into<ZoneId>, date: NaiveDate, time_slot: impl Into<TimeSlotLabel>) -> Self {
        Self {
            zone_id: zone_id.into(),
            date,
            time_slot: time_slot.into(),
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} {}", self.zone_id, self.date, self.time_slot)
    }
}

/// One bookable occurrence, either clicked by the user or produced by a
/// recurrence pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedTimeSlot {
    pub zone_id: ZoneId,
    pub date: NaiveDate,
    pub time_slot: TimeSlotLabel,
    /// Length of the slot in minutes. Informational only.
    pub duration_minutes: u32,
}

impl SelectedTimeSlot {
    pub fn new(
        zone_id: impl Into<ZoneId>,
        date: NaiveDate,
        time_slot: impl Into<TimeSlotLabel>,
        duration_minutes: u32,
    ) -> Self {
        Self {
            zone_id: zone_id.into(),
            date,
            time_slot: time_slot.into(),
            duration_minutes,
        }
    }

    pub fn key(&self) -> SlotKey {
        SlotKey::new(self.zone_id.clone(), self.date, self.time_slot.clone())
    }

    /// True when both occurrences refer to the same zone, day and slot.
    pub fn same_slot(&self, other: &SelectedTimeSlot) -> bool {
        self.zone_id == other.zone_id && self.date == other.date && self.time_slot == other.time_slot
    }
}

/// A booking already held in the persistence store. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingBooking {
    pub id: String,
    pub zone_id: ZoneId,
    pub date: NaiveDate,
    pub time_slot: TimeSlotLabel,
    pub booked_by: String,
}
