//! Error types for slot-engine operations.

use thiserror::Error;

use crate::slot::SlotKey;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The recurrence pattern cannot be applied (empty weekday/slot set, zero
    /// interval, end before start, or a slot the grid does not know).
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Finalization was requested while conflicted occurrences still lack a decision.
    #[error("{pending} conflicted occurrence(s) still need a decision")]
    UnresolvedConflicts { pending: usize },

    /// The authoritative booking store refused slots that looked free locally.
    #[error("{} slot(s) were taken before checkout", slots.len())]
    StaleAvailability { slots: Vec<SlotKey> },

    #[error("Invalid zone hierarchy: {0}")]
    InvalidHierarchy(String),

    #[error("Invalid time-slot grid: {0}")]
    InvalidGrid(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No conflicted occurrence at index {0}")]
    UnknownOccurrence(usize),

    #[error("Substitute {0} is not available")]
    SubstituteUnavailable(SlotKey),

    #[error("Substitute {0} is already part of the booking")]
    DuplicateSubstitute(SlotKey),
}

pub type Result<T> = std::result::Result<T, EngineError>;
