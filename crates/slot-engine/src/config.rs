//! Engine configuration.
//!
//! Everything here has a `Default` and deserializes from JSON with missing
//! fields filled in, so binding crates can accept partial config documents.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::grid::{SpanShape, TimeSlotGrid};

/// Which day begins a week for interval counting and week views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekStart {
    /// ISO 8601 weeks.
    #[default]
    Monday,
    Sunday,
}

/// Limits for substitute suggestions in the conflict resolution workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubstituteOptions {
    /// How many days before and after the original date to search.
    pub day_radius: u32,
    /// Maximum suggestions returned per substitute kind.
    pub max_per_kind: usize,
}

impl Default for SubstituteOptions {
    fn default() -> Self {
        Self {
            day_radius: 3,
            max_per_kind: 3,
        }
    }
}

/// Facility-level settings for one booking view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// IANA timezone the facility's wall-clock slots are expressed in.
    pub timezone: String,
    pub week_start: WeekStart,
    /// Slot labels, `"HH:MM"` or `"HH:MM-HH:MM"`, in display order.
    pub slots: Vec<String>,
    /// Duration given to bare `"HH:MM"` labels. Occurrences on labels the
    /// grid does not define get [`crate::recurrence::FALLBACK_SLOT_MINUTES`].
    pub default_slot_minutes: u32,
    pub span_shape: SpanShape,
    pub substitutes: SubstituteOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            week_start: WeekStart::Monday,
            slots: (8..22).map(|h| format!("{:02}:00", h)).collect(),
            default_slot_minutes: 60,
            span_shape: SpanShape::Rectangle,
            substitutes: SubstituteOptions::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON config document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the fields serde cannot check on its own.
    pub fn validate(&self) -> Result<()> {
        self.tz()?;
        if self.default_slot_minutes == 0 {
            return Err(EngineError::InvalidConfig(
                "default_slot_minutes must be positive".to_string(),
            ));
        }
        self.grid().map(|_| ())
    }

    /// The facility timezone.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidTimezone` if `timezone` is not a valid IANA identifier.
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse()
            .map_err(|_| EngineError::InvalidTimezone(self.timezone.clone()))
    }

    /// The slot grid described by `slots`.
    pub fn grid(&self) -> Result<TimeSlotGrid> {
        TimeSlotGrid::from_labels(&self.slots, self.default_slot_minutes)
    }
}
