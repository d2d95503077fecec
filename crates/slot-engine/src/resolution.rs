//! Conflict resolution for recurring bookings.
//!
//! A recurrence is first split into occurrences that are free and ones that
//! collide with something ([`partition`]). Collisions are never added as-is:
//! each one needs an explicit decision, either drop it or replace it with a
//! free substitute. The final occurrence list only becomes available once
//! every collision is decided, so callers never see a half-resolved booking.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::SubstituteOptions;
use crate::conflict::{AvailabilityStatus, ConflictManager};
use crate::error::{EngineError, Result};
use crate::grid::TimeSlotGrid;
use crate::recurrence::RecurrencePattern;
use crate::selection::Selection;
use crate::slot::{SelectedTimeSlot, SlotKey, TimeSlotLabel, ZoneId};

/// An occurrence that is not free, with the status explaining why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictedOccurrence {
    pub occurrence: SelectedTimeSlot,
    pub status: AvailabilityStatus,
}

/// Occurrences split by availability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    pub accepted: Vec<SelectedTimeSlot>,
    pub conflicted: Vec<ConflictedOccurrence>,
    /// False when the pattern produced no occurrences at all.
    pub had_candidates: bool,
}

/// Summary of a partition, distinguishing "nothing generated" from "nothing free".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionOutcome {
    NoCandidates,
    NothingFree,
    AllFree,
    SomeConflicted,
}

impl Partition {
    pub fn outcome(&self) -> PartitionOutcome {
        match (self.had_candidates, self.accepted.is_empty(), self.conflicted.is_empty()) {
            (false, _, _) => PartitionOutcome::NoCandidates,
            (true, true, _) => PartitionOutcome::NothingFree,
            (true, false, true) => PartitionOutcome::AllFree,
            (true, false, false) => PartitionOutcome::SomeConflicted,
        }
    }
}

/// Split `occurrences` into free and conflicted ones, preserving input order.
/// Repeated occurrences of the same slot are kept once.
pub fn partition(
    occurrences: impl IntoIterator<Item = SelectedTimeSlot>,
    manager: &ConflictManager,
) -> Partition {
    let mut out = Partition::default();
    let mut seen = std::collections::HashSet::new();

    for occurrence in occurrences {
        out.had_candidates = true;
        if !seen.insert(occurrence.key()) {
            continue;
        }
        match manager.check(&occurrence) {
            AvailabilityStatus::Available => out.accepted.push(occurrence),
            status => out.conflicted.push(ConflictedOccurrence { occurrence, status }),
        }
    }

    tracing::debug!(
        accepted = out.accepted.len(),
        conflicted = out.conflicted.len(),
        outcome = ?out.outcome(),
        "occurrences partitioned"
    );
    out
}

/// What kind of change a substitute makes to the original occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubstituteKind {
    AlternativeTimeSlot,
    AlternativeDate,
    AlternativeZone,
}

/// A free occurrence offered in place of a conflicted one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitute {
    pub kind: SubstituteKind,
    pub slot: SelectedTimeSlot,
}

/// Free alternatives around `original`, by kind:
///
/// - other slots on the same date, nearest in grid order first (earlier wins ties)
/// - the same slot on nearby dates within `day_radius`, nearest first (later wins ties)
/// - other zones at the same date and slot, in directory order
///
/// Each kind contributes at most `max_per_kind` suggestions.
pub fn suggest_substitutes(
    original: &SelectedTimeSlot,
    manager: &ConflictManager,
    options: SubstituteOptions,
) -> Vec<Substitute> {
    let grid = manager.grid();
    let mut out = Vec::new();

    if let Some(origin) = grid.index_of(&original.time_slot) {
        let mut offsets: Vec<i64> = (1..grid.len() as i64).flat_map(|k| [-k, k]).collect();
        offsets.retain(|k| (0..grid.len() as i64).contains(&(origin as i64 + k)));
        let slots = offsets
            .into_iter()
            .filter_map(|k| grid.at((origin as i64 + k) as usize))
            .map(|def| {
                SelectedTimeSlot::new(
                    original.zone_id.clone(),
                    original.date,
                    def.label.clone(),
                    def.duration_minutes,
                )
            });
        push_free(&mut out, SubstituteKind::AlternativeTimeSlot, slots, manager, options);
    }

    let dates = (1..=options.day_radius as i64)
        .flat_map(|k| [k, -k])
        .filter_map(|k| shift(original.date, k))
        .map(|date| SelectedTimeSlot {
            date,
            ..original.clone()
        });
    push_free(&mut out, SubstituteKind::AlternativeDate, dates, manager, options);

    let zones = manager
        .zones()
        .zones()
        .iter()
        .filter(|z| z.id != original.zone_id)
        .map(|z| SelectedTimeSlot {
            zone_id: z.id.clone(),
            ..original.clone()
        });
    push_free(&mut out, SubstituteKind::AlternativeZone, zones, manager, options);

    out
}

fn shift(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::days(days))
}

fn push_free(
    out: &mut Vec<Substitute>,
    kind: SubstituteKind,
    candidates: impl Iterator<Item = SelectedTimeSlot>,
    manager: &ConflictManager,
    options: SubstituteOptions,
) {
    out.extend(
        candidates
            .filter(|slot| manager.check(slot).is_available())
            .take(options.max_per_kind)
            .map(|slot| Substitute { kind, slot }),
    );
}

/// Caller's decision for one conflicted occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "slot", rename_all = "snake_case")]
pub enum Resolution {
    Drop,
    Substitute(SelectedTimeSlot),
}

/// Interactive resolution of a partition's conflicts.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionSession {
    partition: Partition,
    decisions: Vec<Option<Resolution>>,
    slot_order: Vec<TimeSlotLabel>,
}

impl ResolutionSession {
    pub fn new(partition: Partition) -> Self {
        let decisions = vec![None; partition.conflicted.len()];
        Self {
            partition,
            decisions,
            slot_order: Vec::new(),
        }
    }

    /// Order finalized occurrences within a date by `grid` row.
    pub fn with_grid(mut self, grid: &TimeSlotGrid) -> Self {
        self.slot_order = grid.labels().map(String::from).collect();
        self
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn outcome(&self) -> PartitionOutcome {
        self.partition.outcome()
    }

    pub fn accepted(&self) -> &[SelectedTimeSlot] {
        &self.partition.accepted
    }

    pub fn conflicted(&self) -> &[ConflictedOccurrence] {
        &self.partition.conflicted
    }

    pub fn decision(&self, index: usize) -> Option<&Resolution> {
        self.decisions.get(index).and_then(Option::as_ref)
    }

    /// Number of conflicted occurrences without a decision.
    pub fn pending(&self) -> usize {
        self.decisions.iter().filter(|d| d.is_none()).count()
    }

    pub fn is_resolved(&self) -> bool {
        self.pending() == 0
    }

    /// Free alternatives for the conflicted occurrence at `index`, excluding
    /// slots already taken by this booking.
    pub fn suggest(
        &self,
        index: usize,
        manager: &ConflictManager,
        options: SubstituteOptions,
    ) -> Result<Vec<Substitute>> {
        let original = &self.entry(index)?.occurrence;
        let mut suggestions = suggest_substitutes(original, manager, options);
        suggestions.retain(|s| !self.is_taken(&s.slot.key(), Some(index)));
        Ok(suggestions)
    }

    /// Record (or replace) the decision for the conflicted occurrence at `index`.
    ///
    /// # Errors
    /// - `UnknownOccurrence` if `index` is out of range
    /// - `SubstituteUnavailable` if the substitute is not free
    /// - `DuplicateSubstitute` if the substitute is already part of this booking
    pub fn decide(&mut self, index: usize, resolution: Resolution, manager: &ConflictManager) -> Result<()> {
        self.entry(index)?;
        if let Resolution::Substitute(slot) = &resolution {
            let key = slot.key();
            if !manager.check(slot).is_available() {
                return Err(EngineError::SubstituteUnavailable(key));
            }
            if self.is_taken(&key, Some(index)) {
                return Err(EngineError::DuplicateSubstitute(key));
            }
        }
        self.decisions[index] = Some(resolution);
        Ok(())
    }

    /// Drop every conflicted occurrence that has no decision yet.
    pub fn drop_undecided(&mut self) {
        for decision in self.decisions.iter_mut().filter(|d| d.is_none()) {
            *decision = Some(Resolution::Drop);
        }
    }

    /// The occurrences to book: accepted ones plus substitutes, ordered by
    /// date, then by grid row. Labels not on the grid (or every label, when
    /// the session has no grid) follow in label order.
    ///
    /// # Errors
    /// Returns `EngineError::UnresolvedConflicts` while any conflicted
    /// occurrence lacks a decision.
    pub fn finalize(&self) -> Result<Vec<SelectedTimeSlot>> {
        let pending = self.pending();
        if pending > 0 {
            return Err(EngineError::UnresolvedConflicts { pending });
        }
        let mut out = self.partition.accepted.clone();
        out.extend(self.decisions.iter().filter_map(|d| match d {
            Some(Resolution::Substitute(slot)) => Some(slot.clone()),
            _ => None,
        }));
        out.sort_by(|a, b| {
            (a.date, self.row(&a.time_slot), &a.time_slot).cmp(&(
                b.date,
                self.row(&b.time_slot),
                &b.time_slot,
            ))
        });
        Ok(out)
    }

    /// Finalize and merge the result into `selection` in one step. Nothing is
    /// added if finalization fails.
    pub fn commit_into(&self, selection: &mut Selection) -> Result<usize> {
        let slots = self.finalize()?;
        let added = selection.extend_all(slots);
        tracing::debug!(added, "recurring booking merged into selection");
        Ok(added)
    }

    fn row(&self, label: &str) -> usize {
        self.slot_order
            .iter()
            .position(|l| l == label)
            .unwrap_or(usize::MAX)
    }

    fn entry(&self, index: usize) -> Result<&ConflictedOccurrence> {
        self.partition
            .conflicted
            .get(index)
            .ok_or(EngineError::UnknownOccurrence(index))
    }

    fn is_taken(&self, key: &SlotKey, except: Option<usize>) -> bool {
        self.partition.accepted.iter().any(|s| &s.key() == key)
            || self.decisions.iter().enumerate().any(|(i, d)| {
                Some(i) != except
                    && matches!(d, Some(Resolution::Substitute(s)) if &s.key() == key)
            })
    }
}

/// Apply `pattern` for `zone_id` and partition the result, ready for resolution.
///
/// # Errors
/// Returns `EngineError::InvalidPattern` if the pattern cannot be applied.
pub fn plan_recurring(
    pattern: &RecurrencePattern,
    search_start: NaiveDate,
    zone_id: impl Into<ZoneId>,
    manager: &ConflictManager,
    max_occurrences: usize,
) -> Result<ResolutionSession> {
    let occurrences = pattern.apply(search_start, zone_id, manager.grid(), max_occurrences)?;
    Ok(ResolutionSession::new(partition(occurrences, manager)).with_grid(manager.grid()))
}
