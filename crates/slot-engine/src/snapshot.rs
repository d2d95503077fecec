//! Availability snapshot as a single JSON document.
//!
//! Binding crates receive the facility directory, the bookings and the
//! facility settings from their host in one piece. [`Snapshot`] is that
//! document; [`Snapshot::manager`] turns it into a [`ConflictManager`].

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::calendar::{HolidayList, WeeklyClosure};
use crate::config::EngineConfig;
use crate::conflict::ConflictManager;
use crate::error::{EngineError, Result};
use crate::slot::{ExistingBooking, SlotKey};
use crate::zone::{Zone, ZoneHierarchy};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub config: EngineConfig,
    pub zones: Vec<Zone>,
    pub bookings: Vec<ExistingBooking>,
    /// Closed dates and the reason shown for them.
    pub holidays: BTreeMap<NaiveDate, String>,
    /// Weekdays the facility never opens.
    pub closed_weekdays: Vec<Weekday>,
    /// Slots the booking store has already refused in this session.
    pub rejected: Vec<SlotKey>,
}

impl Snapshot {
    /// Parse and validate a snapshot document.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidConfig` for malformed JSON, or the error
    /// from [`EngineConfig::validate`].
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot =
            serde_json::from_str(json).map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        snapshot.config.validate()?;
        Ok(snapshot)
    }

    /// Build the availability oracle for this snapshot as of `now`.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidHierarchy` if the zones do not form a
    /// valid directory, or a config error.
    pub fn manager(&self, now: DateTime<Utc>) -> Result<ConflictManager> {
        let zones = ZoneHierarchy::new(self.zones.clone())?;
        let holidays: HolidayList = self
            .holidays
            .iter()
            .map(|(date, reason)| (*date, reason.clone()))
            .collect();
        let closures = WeeklyClosure::new(self.closed_weekdays.iter().copied());

        let mut manager = ConflictManager::from_config(&self.config, zones, self.bookings.clone(), now)?
            .with_blackouts((holidays, closures));
        for key in &self.rejected {
            manager.record_rejection(key.clone());
        }
        tracing::debug!(
            zones = self.zones.len(),
            bookings = self.bookings.len(),
            holidays = self.holidays.len(),
            "snapshot loaded"
        );
        Ok(manager)
    }
}
