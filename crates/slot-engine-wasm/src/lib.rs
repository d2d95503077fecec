//! WASM bindings for slot-engine.
//!
//! Exposes recurrence expansion, availability checks, conflict partitioning
//! and the drag-selection surface to JavaScript via `wasm-bindgen`. Complex
//! types cross the boundary as JSON strings. Availability data is passed as a
//! snapshot document (see `slot_engine::Snapshot`).
//!
//! Weekdays in pattern documents are numbers `0..=6` with Sunday = 0, the
//! convention of JavaScript's `Date.getDay()`.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p slot-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target web --out-dir packages/slot-engine-js/wasm/ \
//!   target/wasm32-unknown-unknown/release/slot_engine_wasm.wasm
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use slot_engine::{
    generate_occurrences, partition, suggest_substitutes, AvailabilityStatus, Cell,
    ConflictedOccurrence, DragOutcome, EngineConfig, PartitionOutcome, RecurrenceKind,
    RecurrencePattern, SelectedTimeSlot, Snapshot, Substitute, WeekGrid, WeekStart,
};
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// Serde-friendly DTOs for crossing the WASM boundary as JSON
// ---------------------------------------------------------------------------

/// Pattern document as sent by the booking form.
#[derive(Deserialize)]
struct PatternInput {
    #[serde(rename = "type")]
    kind: RecurrenceKind,
    weekdays: Vec<u8>,
    time_slots: Vec<String>,
    #[serde(default = "default_interval")]
    interval: u32,
    start_date: NaiveDate,
    #[serde(default)]
    end_date: Option<NaiveDate>,
    #[serde(default)]
    week_start: WeekStart,
}

fn default_interval() -> u32 {
    1
}

impl PatternInput {
    fn into_pattern(self) -> Result<RecurrencePattern, String> {
        let weekdays = self
            .weekdays
            .iter()
            .map(|&n| weekday_from_js(n))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RecurrencePattern {
            kind: self.kind,
            weekdays,
            time_slots: self.time_slots,
            interval: self.interval,
            start_date: self.start_date,
            end_date: self.end_date,
            week_start: self.week_start,
        })
    }
}

#[derive(Serialize)]
struct ConflictedDto<'a> {
    occurrence: &'a SelectedTimeSlot,
    status: &'a AvailabilityStatus,
    substitutes: Vec<Substitute>,
}

#[derive(Serialize)]
struct PartitionDto<'a> {
    outcome: PartitionOutcome,
    accepted: &'a [SelectedTimeSlot],
    conflicted: Vec<ConflictedDto<'a>>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a JavaScript day number (Sunday = 0) to a weekday.
fn weekday_from_js(n: u8) -> Result<Weekday, String> {
    match n {
        0 => Ok(Weekday::Sun),
        1 => Ok(Weekday::Mon),
        2 => Ok(Weekday::Tue),
        3 => Ok(Weekday::Wed),
        4 => Ok(Weekday::Thu),
        5 => Ok(Weekday::Fri),
        6 => Ok(Weekday::Sat),
        _ => Err(format!("Invalid weekday {}: expected 0 (Sunday) through 6", n)),
    }
}

fn parse_pattern(json: &str) -> Result<RecurrencePattern, String> {
    let input: PatternInput =
        serde_json::from_str(json).map_err(|e| format!("Invalid pattern JSON: {}", e))?;
    input.into_pattern()
}

fn parse_snapshot(json: &str) -> Result<Snapshot, String> {
    Snapshot::from_json(json).map_err(|e| e.to_string())
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("Invalid date '{}': {}", s, e))
}

/// Parse an ISO 8601 datetime string into `DateTime<Utc>`.
///
/// Accepts RFC 3339 (with offset) and naive datetimes, which are taken as UTC.
fn parse_now(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .map_err(|e| format!("Invalid datetime '{}': {}", s, e))
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Serialization error: {}", e))
}

fn js_err(message: String) -> JsValue {
    JsValue::from_str(&message)
}

fn occurrences_json(
    pattern_json: &str,
    search_start: &str,
    zone_id: &str,
    config_json: Option<&str>,
    max_occurrences: u32,
) -> Result<String, String> {
    let pattern = parse_pattern(pattern_json)?;
    let config = match config_json {
        Some(json) => EngineConfig::from_json(json).map_err(|e| e.to_string())?,
        None => EngineConfig::default(),
    };
    let grid = config.grid().map_err(|e| e.to_string())?;
    let occurrences: Vec<SelectedTimeSlot> = pattern
        .apply(parse_date(search_start)?, zone_id, &grid, max_occurrences as usize)
        .map_err(|e| e.to_string())?
        .collect();
    to_json(&occurrences)
}

fn availability_json(
    snapshot_json: &str,
    zone_id: &str,
    date: &str,
    time_slot: &str,
    now: &str,
) -> Result<String, String> {
    let manager = parse_snapshot(snapshot_json)?
        .manager(parse_now(now)?)
        .map_err(|e| e.to_string())?;
    to_json(&manager.check_availability(zone_id, parse_date(date)?, time_slot))
}

fn partition_json(
    snapshot_json: &str,
    pattern_json: &str,
    search_start: &str,
    zone_id: &str,
    now: &str,
    max_occurrences: u32,
) -> Result<String, String> {
    let snapshot = parse_snapshot(snapshot_json)?;
    let manager = snapshot.manager(parse_now(now)?).map_err(|e| e.to_string())?;
    let pattern = parse_pattern(pattern_json)?;
    pattern.validate(manager.grid()).map_err(|e| e.to_string())?;

    let occurrences = generate_occurrences(
        &pattern,
        parse_date(search_start)?,
        zone_id,
        manager.grid(),
        max_occurrences as usize,
    );
    let split = partition(occurrences, &manager);
    let conflicted = split
        .conflicted
        .iter()
        .map(|ConflictedOccurrence { occurrence, status }| ConflictedDto {
            occurrence,
            status,
            substitutes: suggest_substitutes(occurrence, &manager, snapshot.config.substitutes),
        })
        .collect();

    to_json(&PartitionDto {
        outcome: split.outcome(),
        accepted: &split.accepted,
        conflicted,
    })
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Expand a recurrence pattern into concrete occurrences.
///
/// Returns a JSON array of `{zone_id, date, time_slot, duration_minutes}`.
///
/// # Arguments
/// - `pattern_json` -- `{type, weekdays, time_slots, interval?, start_date, end_date?, week_start?}`
/// - `search_start` -- first date of interest (`YYYY-MM-DD`)
/// - `zone_id` -- zone every occurrence is for
/// - `config_json` -- optional engine config; slot durations come from its grid
/// - `max_occurrences` -- hard cap on the number of occurrences
#[wasm_bindgen(js_name = "generateOccurrences")]
pub fn generate_occurrences_js(
    pattern_json: &str,
    search_start: &str,
    zone_id: &str,
    config_json: Option<String>,
    max_occurrences: u32,
) -> Result<String, JsValue> {
    occurrences_json(
        pattern_json,
        search_start,
        zone_id,
        config_json.as_deref(),
        max_occurrences,
    )
    .map_err(js_err)
}

/// Decide whether one cell is free. Returns the availability status as JSON.
#[wasm_bindgen(js_name = "checkAvailability")]
pub fn check_availability(
    snapshot_json: &str,
    zone_id: &str,
    date: &str,
    time_slot: &str,
    now: &str,
) -> Result<String, JsValue> {
    availability_json(snapshot_json, zone_id, date, time_slot, now).map_err(js_err)
}

/// Expand a pattern and split the occurrences into free and conflicted ones.
///
/// Returns `{outcome, accepted, conflicted}`; every conflicted entry carries
/// its status and a list of free substitutes.
#[wasm_bindgen(js_name = "partitionOccurrences")]
pub fn partition_occurrences(
    snapshot_json: &str,
    pattern_json: &str,
    search_start: &str,
    zone_id: &str,
    now: &str,
    max_occurrences: u32,
) -> Result<String, JsValue> {
    partition_json(
        snapshot_json,
        pattern_json,
        search_start,
        zone_id,
        now,
        max_occurrences,
    )
    .map_err(js_err)
}

/// RFC 5545 RRULE text for a pattern document.
#[wasm_bindgen(js_name = "toRRule")]
pub fn to_rrule(pattern_json: &str) -> Result<String, JsValue> {
    parse_pattern(pattern_json)
        .map(|p| p.to_rrule())
        .map_err(js_err)
}

/// Interactive week grid for one zone.
///
/// Pointer events are forwarded cell by cell (`day` 0..6 from the first day
/// of the week, `slot` is the row in the grid). Queries return JSON.
#[wasm_bindgen(js_name = "SelectionSurface")]
pub struct WasmSelectionSurface {
    inner: slot_engine::SelectionSurface,
    week_start: WeekStart,
}

impl WasmSelectionSurface {
    fn build(snapshot_json: &str, zone_id: &str, date: &str, now: &str) -> Result<Self, String> {
        let snapshot = parse_snapshot(snapshot_json)?;
        let manager = snapshot.manager(parse_now(now)?).map_err(|e| e.to_string())?;
        let week_start = snapshot.config.week_start;
        let week = WeekGrid::containing(zone_id, parse_date(date)?, week_start, manager.grid().clone());
        Ok(Self {
            inner: slot_engine::SelectionSurface::new(week, manager)
                .with_shape(snapshot.config.span_shape),
            week_start,
        })
    }

    fn outcome_json(outcome: &DragOutcome) -> Result<String, String> {
        to_json(outcome)
    }
}

#[wasm_bindgen(js_class = "SelectionSurface")]
impl WasmSelectionSurface {
    /// Show the week containing `date` for `zone_id`, as of `now`.
    #[wasm_bindgen(constructor)]
    pub fn new(
        snapshot_json: &str,
        zone_id: &str,
        date: &str,
        now: &str,
    ) -> Result<WasmSelectionSurface, JsValue> {
        Self::build(snapshot_json, zone_id, date, now).map_err(js_err)
    }

    /// Switch to the week containing `date`, possibly for another zone.
    #[wasm_bindgen(js_name = "showWeek")]
    pub fn show_week(&mut self, zone_id: &str, date: &str) -> Result<(), JsValue> {
        let date = parse_date(date).map_err(js_err)?;
        let grid = self.inner.manager().grid().clone();
        self.inner
            .show_week(WeekGrid::containing(zone_id, date, self.week_start, grid));
        Ok(())
    }

    #[wasm_bindgen(js_name = "pointerDown")]
    pub fn pointer_down(&mut self, day: usize, slot: usize) {
        self.inner.pointer_down(Cell::new(day, slot));
    }

    #[wasm_bindgen(js_name = "pointerEnter")]
    pub fn pointer_enter(&mut self, day: usize, slot: usize) {
        self.inner.pointer_enter(Cell::new(day, slot));
    }

    /// Finish the gesture. Returns the applied outcome as JSON.
    #[wasm_bindgen(js_name = "pointerUp")]
    pub fn pointer_up(&mut self) -> Result<String, JsValue> {
        let outcome = self.inner.pointer_up();
        Self::outcome_json(&outcome).map_err(js_err)
    }

    #[wasm_bindgen(js_name = "pointerLeave")]
    pub fn pointer_leave(&mut self) {
        self.inner.pointer_leave();
    }

    pub fn click(&mut self, day: usize, slot: usize) -> Result<String, JsValue> {
        let outcome = self.inner.click(Cell::new(day, slot));
        Self::outcome_json(&outcome).map_err(js_err)
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    #[wasm_bindgen(js_name = "isDragging")]
    pub fn is_dragging(&self) -> bool {
        self.inner.state().is_dragging()
    }

    /// Every cell of the visible week with status, selection and preview flags.
    pub fn cells(&self) -> Result<String, JsValue> {
        to_json(&self.inner.cells()).map_err(js_err)
    }

    /// The current selection in key order.
    pub fn selection(&self) -> Result<String, JsValue> {
        to_json(&self.inner.selection().to_vec()).map_err(js_err)
    }

    #[wasm_bindgen(js_name = "selectionCount")]
    pub fn selection_count(&self) -> usize {
        self.inner.selection().len()
    }
}
