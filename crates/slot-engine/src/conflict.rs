//! Availability decisions for a single `(zone, date, time-slot)` cell.
//!
//! [`ConflictManager`] is the one place that decides whether a cell can be
//! booked. It holds an immutable snapshot of the zone hierarchy and the
//! existing bookings for the current view, plus the caller-supplied "now".
//! Checks are advisory: the booking store makes the authoritative call at
//! commit time.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::calendar::{BlackoutCalendar, NoBlackouts};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::grid::TimeSlotGrid;
use crate::slot::{ExistingBooking, SelectedTimeSlot, SlotKey, TimeSlotLabel};
use crate::zone::{ZoneHierarchy, ZoneRelation};

/// What makes a cell unbookable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Conflict {
    /// An existing booking on this zone or a related one.
    Booking {
        booking: ExistingBooking,
        relation: ZoneRelation,
    },
    /// The booking store refused this cell at checkout.
    Rejected,
    /// The slot starts before "now".
    PastSlot,
    /// The whole date is closed.
    Blackout { reason: String },
    /// The zone is not in the facility directory.
    UnknownZone,
}

/// Availability of one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AvailabilityStatus {
    Available,
    /// Occupied by a booking (or refused by the store).
    Busy { conflict: Conflict },
    /// Not bookable regardless of occupancy.
    Unavailable { conflict: Conflict },
}

impl AvailabilityStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, AvailabilityStatus::Available)
    }

    pub fn conflict(&self) -> Option<&Conflict> {
        match self {
            AvailabilityStatus::Available => None,
            AvailabilityStatus::Busy { conflict } | AvailabilityStatus::Unavailable { conflict } => {
                Some(conflict)
            }
        }
    }
}

/// Immutable availability oracle for one rendering session.
pub struct ConflictManager {
    zones: ZoneHierarchy,
    bookings: Vec<ExistingBooking>,
    by_cell: HashMap<(NaiveDate, TimeSlotLabel), Vec<usize>>,
    grid: TimeSlotGrid,
    timezone: Tz,
    now: DateTime<Utc>,
    blackouts: Box<dyn BlackoutCalendar>,
    rejected: HashSet<SlotKey>,
}

impl fmt::Debug for ConflictManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConflictManager")
            .field("zones", &self.zones.zones().len())
            .field("bookings", &self.bookings.len())
            .field("timezone", &self.timezone)
            .field("now", &self.now)
            .field("rejected", &self.rejected.len())
            .finish()
    }
}

impl ConflictManager {
    /// Snapshot `zones` and `bookings` with UTC wall-clock slots and no
    /// blackout dates.
    pub fn new(
        zones: ZoneHierarchy,
        bookings: Vec<ExistingBooking>,
        grid: TimeSlotGrid,
        now: DateTime<Utc>,
    ) -> Self {
        let mut by_cell: HashMap<(NaiveDate, TimeSlotLabel), Vec<usize>> = HashMap::new();
        for (i, booking) in bookings.iter().enumerate() {
            by_cell
                .entry((booking.date, booking.time_slot.clone()))
                .or_default()
                .push(i);
        }
        Self {
            zones,
            bookings,
            by_cell,
            grid,
            timezone: Tz::UTC,
            now,
            blackouts: Box::new(NoBlackouts),
            rejected: HashSet::new(),
        }
    }

    /// Build a manager with the grid and timezone taken from `config`.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidTimezone` or `EngineError::InvalidGrid`
    /// when the config does not describe a usable grid.
    pub fn from_config(
        config: &EngineConfig,
        zones: ZoneHierarchy,
        bookings: Vec<ExistingBooking>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let timezone = config.tz()?;
        Ok(Self::new(zones, bookings, config.grid()?, now).with_timezone(timezone))
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_blackouts(mut self, calendar: impl BlackoutCalendar + 'static) -> Self {
        self.blackouts = Box::new(calendar);
        self
    }

    pub fn zones(&self) -> &ZoneHierarchy {
        &self.zones
    }

    pub fn grid(&self) -> &TimeSlotGrid {
        &self.grid
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn bookings(&self) -> &[ExistingBooking] {
        &self.bookings
    }

    /// Decide whether `zone_id` can be booked at `(date, time_slot)`.
    ///
    /// Past slots and blackout dates are `Unavailable`. A booking on the same
    /// zone, an ancestor, a descendant or an explicitly overlapping zone makes
    /// the cell `Busy`, as does an earlier checkout rejection.
    pub fn check_availability(&self, zone_id: &str, date: NaiveDate, time_slot: &str) -> AvailabilityStatus {
        let status = self.evaluate(zone_id, date, time_slot);
        tracing::trace!(zone_id, %date, time_slot, ?status, "availability checked");
        status
    }

    pub fn check(&self, slot: &SelectedTimeSlot) -> AvailabilityStatus {
        self.check_availability(&slot.zone_id, slot.date, &slot.time_slot)
    }

    pub fn is_available(&self, zone_id: &str, date: NaiveDate, time_slot: &str) -> bool {
        self.check_availability(zone_id, date, time_slot).is_available()
    }

    /// Mark a cell as taken after the booking store refused it. The cell stays
    /// busy for the lifetime of this snapshot.
    pub fn record_rejection(&mut self, key: SlotKey) {
        tracing::debug!(%key, "slot rejected by booking store");
        self.rejected.insert(key);
    }

    pub fn rejected(&self) -> impl Iterator<Item = &SlotKey> {
        self.rejected.iter()
    }

    /// Start of the slot as an instant, if the label is on the grid.
    ///
    /// Wall-clock times that fall into a DST gap resolve to the first valid
    /// instant after the gap.
    pub fn slot_start(&self, date: NaiveDate, time_slot: &str) -> Option<DateTime<Utc>> {
        let def = self.grid.get(time_slot)?;
        let local = date.and_time(def.start);
        self.timezone
            .from_local_datetime(&local)
            .earliest()
            .or_else(|| {
                self.timezone
                    .from_local_datetime(&(local + Duration::hours(1)))
                    .earliest()
            })
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Off-grid labels have no start time, so they are past once the whole
    /// date is before today in the facility timezone.
    fn is_past(&self, date: NaiveDate, time_slot: &str) -> bool {
        match self.slot_start(date, time_slot) {
            Some(start) => start < self.now,
            None => date < self.now.with_timezone(&self.timezone).date_naive(),
        }
    }

    fn evaluate(&self, zone_id: &str, date: NaiveDate, time_slot: &str) -> AvailabilityStatus {
        if !self.zones.contains(zone_id) {
            return AvailabilityStatus::Unavailable {
                conflict: Conflict::UnknownZone,
            };
        }

        if self.is_past(date, time_slot) {
            return AvailabilityStatus::Unavailable {
                conflict: Conflict::PastSlot,
            };
        }

        if let Some(reason) = self.blackouts.blackout_reason(date) {
            return AvailabilityStatus::Unavailable {
                conflict: Conflict::Blackout { reason },
            };
        }

        let hit = self
            .by_cell
            .get(&(date, time_slot.to_string()))
            .into_iter()
            .flatten()
            .map(|&i| &self.bookings[i])
            .find_map(|b| self.zones.relation(zone_id, &b.zone_id).map(|r| (b, r)));
        if let Some((booking, relation)) = hit {
            return AvailabilityStatus::Busy {
                conflict: Conflict::Booking {
                    booking: booking.clone(),
                    relation,
                },
            };
        }

        if self.rejected.contains(&SlotKey::new(zone_id, date, time_slot)) {
            return AvailabilityStatus::Busy {
                conflict: Conflict::Rejected,
            };
        }

        AvailabilityStatus::Available
    }
}
