//! # slot-engine
//!
//! Deterministic availability and recurrence engine for facility booking grids.
//!
//! The engine answers three questions for a booking front end:
//! which concrete occurrences a recurring request expands to, whether a
//! zone/date/time-slot cell is actually free, and how pointer gestures on a
//! week grid turn into a selection. It is a pure in-memory computation over
//! snapshots supplied by the caller. It never reads the clock, never performs
//! I/O and never persists anything.
//!
//! ## Quick start
//!
//! ```rust
//! use chrono::{NaiveDate, TimeZone, Utc, Weekday};
//! use slot_engine::{
//!     generate_occurrences, ConflictManager, RecurrencePattern, TimeSlotGrid, Zone, ZoneHierarchy,
//! };
//!
//! let grid = TimeSlotGrid::hourly(8, 22).unwrap();
//! let zones = ZoneHierarchy::new(vec![Zone::new("court-1", "Court 1")]).unwrap();
//! let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
//! let manager = ConflictManager::new(zones, vec![], grid.clone(), now);
//!
//! let start = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
//! let pattern = RecurrencePattern::weekly(start)
//!     .on([Weekday::Mon])
//!     .at(["18:00"])
//!     .until(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap());
//!
//! let occurrences: Vec<_> = generate_occurrences(&pattern, start, "court-1", &grid, 100).collect();
//! assert_eq!(occurrences.len(), 5);
//! assert!(occurrences.iter().all(|o| manager.check(o).is_available()));
//! ```
//!
//! ## Modules
//!
//! - [`grid`] — time-slot list, week view, cell spans
//! - [`zone`] — zone hierarchy and conflict relations
//! - [`calendar`] — holiday/blackout rules
//! - [`conflict`] — per-cell availability decisions
//! - [`recurrence`] — pattern → lazy, bounded occurrence stream
//! - [`resolution`] — partition into free/conflicted, per-conflict decisions
//! - [`drag`] — pointer-gesture state machine and grid controller
//! - [`selection`] — selected occurrences and checkout hand-off
//! - [`config`] — engine configuration
//! - [`snapshot`] — JSON snapshot document for binding crates
//! - [`error`] — error types

pub mod calendar;
pub mod config;
pub mod conflict;
pub mod drag;
pub mod error;
pub mod grid;
pub mod recurrence;
pub mod resolution;
pub mod selection;
pub mod slot;
pub mod snapshot;
pub mod zone;

pub use calendar::{BlackoutCalendar, HolidayList, NoBlackouts, WeeklyClosure};
pub use config::{EngineConfig, SubstituteOptions, WeekStart};
pub use conflict::{AvailabilityStatus, Conflict, ConflictManager};
pub use drag::{CellView, DragOutcome, DragSession, DragState, SelectionSurface, SurfaceContext};
pub use error::EngineError;
pub use grid::{Cell, SlotDefinition, SpanShape, TimeSlotGrid, WeekGrid};
pub use recurrence::{generate_occurrences, Occurrences, RecurrenceKind, RecurrencePattern};
pub use resolution::{
    partition, plan_recurring, suggest_substitutes, ConflictedOccurrence, Partition,
    PartitionOutcome, Resolution, ResolutionSession, Substitute, SubstituteKind,
};
pub use selection::{CheckoutSink, Rejection, Selection};
pub use slot::{ExistingBooking, SelectedTimeSlot, SlotKey, TimeSlotLabel, ZoneId};
pub use snapshot::Snapshot;
pub use zone::{Zone, ZoneHierarchy, ZoneRelation};
