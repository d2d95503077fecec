//! The set of occurrences the user intends to book, and its hand-off to the
//! checkout collaborator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::conflict::ConflictManager;
use crate::error::{EngineError, Result};
use crate::grid::TimeSlotGrid;
use crate::slot::{SelectedTimeSlot, SlotKey};

/// Refusal from the authoritative booking store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rejection {
    /// Slots the store found already taken.
    pub stale: Vec<SlotKey>,
}

/// Cart/checkout collaborator that receives a committed selection.
pub trait CheckoutSink {
    /// Take ownership of `slots`, or refuse some of them.
    fn commit(&mut self, slots: &[SelectedTimeSlot]) -> std::result::Result<(), Rejection>;
}

/// Selected occurrences keyed by `(zone, date, slot)`. Iteration order is the
/// key order, so output is deterministic, but slot labels compare as strings
/// there. Use [`Selection::in_grid_order`] when rows matter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    slots: BTreeMap<SlotKey, SelectedTimeSlot>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, key: &SlotKey) -> bool {
        self.slots.contains_key(key)
    }

    pub fn contains_slot(&self, slot: &SelectedTimeSlot) -> bool {
        self.contains(&slot.key())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SelectedTimeSlot> {
        self.slots.values()
    }

    pub fn to_vec(&self) -> Vec<SelectedTimeSlot> {
        self.slots.values().cloned().collect()
    }

    /// Occurrences ordered by zone, date, then row of `grid`. Labels the grid
    /// does not define come last within their date.
    pub fn in_grid_order(&self, grid: &TimeSlotGrid) -> Vec<SelectedTimeSlot> {
        let mut slots = self.to_vec();
        slots.sort_by_cached_key(|s| {
            (
                s.zone_id.clone(),
                s.date,
                grid.index_of(&s.time_slot).unwrap_or(usize::MAX),
                s.time_slot.clone(),
            )
        });
        slots
    }

    /// Add one occurrence. Returns false if it was already selected.
    pub fn insert(&mut self, slot: SelectedTimeSlot) -> bool {
        let key = slot.key();
        if self.slots.contains_key(&key) {
            return false;
        }
        self.slots.insert(key, slot);
        true
    }

    /// Add every occurrence in one step. Returns how many were new.
    pub fn extend_all(&mut self, slots: impl IntoIterator<Item = SelectedTimeSlot>) -> usize {
        slots.into_iter().filter(|s| self.insert(s.clone())).count()
    }

    pub fn remove(&mut self, key: &SlotKey) -> Option<SelectedTimeSlot> {
        self.slots.remove(key)
    }

    /// Add if absent, remove if present. Returns true if the slot ends up selected.
    pub fn toggle(&mut self, slot: SelectedTimeSlot) -> bool {
        let key = slot.key();
        if self.slots.remove(&key).is_some() {
            false
        } else {
            self.slots.insert(key, slot);
            true
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Hand the selection to checkout, in grid order.
    ///
    /// On success the selection is emptied and the committed slots are
    /// returned. On rejection the stale slots are dropped from the selection
    /// and marked busy in `manager`; the remaining slots stay selected and
    /// nothing is retried.
    ///
    /// # Errors
    /// Returns `EngineError::StaleAvailability` listing the refused slots.
    pub fn submit(
        &mut self,
        sink: &mut dyn CheckoutSink,
        manager: &mut ConflictManager,
    ) -> Result<Vec<SelectedTimeSlot>> {
        let slots = self.in_grid_order(manager.grid());
        match sink.commit(&slots) {
            Ok(()) => {
                tracing::debug!(count = slots.len(), "selection committed");
                self.clear();
                Ok(slots)
            }
            Err(rejection) => {
                for key in &rejection.stale {
                    self.remove(key);
                    manager.record_rejection(key.clone());
                }
                Err(EngineError::StaleAvailability {
                    slots: rejection.stale,
                })
            }
        }
    }
}

impl FromIterator<SelectedTimeSlot> for Selection {
    fn from_iter<I: IntoIterator<Item = SelectedTimeSlot>>(iter: I) -> Self {
        let mut selection = Selection::new();
        selection.extend_all(iter);
        selection
    }
}
