//! Drag-range selection over a week grid.
//!
//! [`DragState`] is a small state machine with pure transitions:
//!
//! ```text
//! Idle --pointer_down(available or selected cell)--> Dragging
//! Dragging --pointer_enter--> Dragging      (preview recomputed from anchor + current)
//! Dragging --pointer_up--> Idle              (commit: DragOutcome::Add / Remove)
//! Dragging --pointer_leave--> Idle           (cancel: no mutation)
//! ```
//!
//! Transitions never touch the selection. They return the outcome, and
//! [`SelectionSurface`] applies it in one step.

use serde::{Deserialize, Serialize};

use crate::conflict::{AvailabilityStatus, ConflictManager};
use crate::error::Result;
use crate::grid::{Cell, SpanShape, WeekGrid};
use crate::resolution::ResolutionSession;
use crate::selection::{CheckoutSink, Selection};
use crate::slot::SelectedTimeSlot;

/// Read-only view the transitions consult.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceContext<'a> {
    pub week: &'a WeekGrid,
    pub manager: &'a ConflictManager,
    pub selection: &'a Selection,
    pub shape: SpanShape,
}

impl SurfaceContext<'_> {
    pub fn status(&self, cell: Cell) -> Option<AvailabilityStatus> {
        let slot = self.week.occurrence(cell)?;
        Some(self.manager.check(&slot))
    }

    pub fn is_selected(&self, cell: Cell) -> bool {
        self.week
            .occurrence(cell)
            .is_some_and(|slot| self.selection.contains_slot(&slot))
    }

    fn is_addable(&self, cell: Cell) -> bool {
        !self.is_selected(cell) && self.status(cell).is_some_and(|s| s.is_available())
    }
}

/// An in-progress gesture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragSession {
    pub anchor: Cell,
    pub current: Cell,
    /// Cells between anchor and current, inclusive, in reading order.
    pub preview: Vec<Cell>,
    /// The gesture began on a cell that was already selected.
    pub anchor_was_selected: bool,
    /// The pointer entered some cell other than the anchor.
    #[serde(default)]
    pub moved: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragSession),
}

/// Selection change requested by a finished gesture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "slots", rename_all = "snake_case")]
pub enum DragOutcome {
    None,
    Add(Vec<SelectedTimeSlot>),
    Remove(SelectedTimeSlot),
}

impl DragState {
    pub fn is_dragging(&self) -> bool {
        matches!(self, DragState::Dragging(_))
    }

    pub fn session(&self) -> Option<&DragSession> {
        match self {
            DragState::Dragging(session) => Some(session),
            DragState::Idle => None,
        }
    }

    pub fn preview(&self) -> &[Cell] {
        match self {
            DragState::Dragging(session) => &session.preview,
            DragState::Idle => &[],
        }
    }

    /// Start a gesture on `cell`. Only available cells and cells already in
    /// the selection start a drag; anything else leaves the state unchanged.
    pub fn pointer_down(self, cell: Cell, ctx: &SurfaceContext<'_>) -> DragState {
        if self.is_dragging() || !ctx.week.contains(cell) {
            return self;
        }
        let selected = ctx.is_selected(cell);
        let available = ctx.status(cell).is_some_and(|s| s.is_available());
        if !selected && !available {
            return DragState::Idle;
        }
        DragState::Dragging(DragSession {
            anchor: cell,
            current: cell,
            preview: vec![cell],
            anchor_was_selected: selected,
            moved: false,
        })
    }

    /// Move the free end of the gesture to `cell`. The preview is rebuilt
    /// from the anchor every time, so overshooting and coming back is exact.
    pub fn pointer_enter(self, cell: Cell, ctx: &SurfaceContext<'_>) -> DragState {
        match self {
            DragState::Dragging(session) if ctx.week.contains(cell) => {
                DragState::Dragging(DragSession {
                    preview: ctx.week.span(session.anchor, cell, ctx.shape),
                    current: cell,
                    moved: session.moved || cell != session.anchor,
                    ..session
                })
            }
            other => other,
        }
    }

    /// Finish the gesture.
    ///
    /// A plain click on a selected cell removes that cell. A gesture that
    /// left the anchor never removes, even if it ends back on it. Otherwise it
    /// adds the preview cells that are available and not yet selected; busy
    /// and unavailable cells stay out even though they were previewed.
    pub fn pointer_up(self, ctx: &SurfaceContext<'_>) -> (DragState, DragOutcome) {
        let DragState::Dragging(session) = self else {
            return (DragState::Idle, DragOutcome::None);
        };

        if !session.moved && session.anchor_was_selected {
            let outcome = ctx
                .week
                .occurrence(session.anchor)
                .map_or(DragOutcome::None, DragOutcome::Remove);
            return (DragState::Idle, outcome);
        }

        let added: Vec<SelectedTimeSlot> = session
            .preview
            .iter()
            .filter(|&&cell| ctx.is_addable(cell))
            .filter_map(|&cell| ctx.week.occurrence(cell))
            .collect();
        let outcome = if added.is_empty() {
            DragOutcome::None
        } else {
            DragOutcome::Add(added)
        };
        (DragState::Idle, outcome)
    }

    /// Pointer left the grid: abandon the gesture.
    pub fn pointer_leave(self) -> (DragState, DragOutcome) {
        (DragState::Idle, DragOutcome::None)
    }
}

/// Rendering data for one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellView {
    pub cell: Cell,
    pub slot: SelectedTimeSlot,
    pub status: AvailabilityStatus,
    pub selected: bool,
    pub previewed: bool,
}

/// Grid controller: owns the week being shown, the availability snapshot,
/// the selection and the drag state.
#[derive(Debug)]
pub struct SelectionSurface {
    week: WeekGrid,
    manager: ConflictManager,
    selection: Selection,
    state: DragState,
    shape: SpanShape,
}

impl SelectionSurface {
    pub fn new(week: WeekGrid, manager: ConflictManager) -> Self {
        Self {
            week,
            manager,
            selection: Selection::new(),
            state: DragState::Idle,
            shape: SpanShape::default(),
        }
    }

    pub fn with_shape(mut self, shape: SpanShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn week(&self) -> &WeekGrid {
        &self.week
    }

    pub fn manager(&self) -> &ConflictManager {
        &self.manager
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    /// Show another week (or zone). Any gesture in progress is cancelled; the
    /// selection is kept.
    pub fn show_week(&mut self, week: WeekGrid) {
        self.state = DragState::Idle;
        self.week = week;
    }

    pub fn pointer_down(&mut self, cell: Cell) {
        let state = std::mem::take(&mut self.state);
        let next = state.pointer_down(cell, &self.context());
        self.state = next;
    }

    pub fn pointer_enter(&mut self, cell: Cell) {
        let state = std::mem::take(&mut self.state);
        let next = state.pointer_enter(cell, &self.context());
        self.state = next;
    }

    /// Finish the gesture and apply its outcome to the selection.
    pub fn pointer_up(&mut self) -> DragOutcome {
        let state = std::mem::take(&mut self.state);
        let (state, outcome) = state.pointer_up(&self.context());
        self.state = state;
        self.apply(&outcome);
        outcome
    }

    pub fn pointer_leave(&mut self) {
        let state = std::mem::take(&mut self.state);
        let (state, _) = state.pointer_leave();
        self.state = state;
    }

    /// Pointer-down followed by pointer-up on the same cell.
    pub fn click(&mut self, cell: Cell) -> DragOutcome {
        self.pointer_down(cell);
        self.pointer_up()
    }

    /// Empty the selection.
    pub fn clear(&mut self) {
        self.selection.clear();
    }

    pub fn cell_view(&self, cell: Cell) -> Option<CellView> {
        let slot = self.week.occurrence(cell)?;
        Some(CellView {
            cell,
            status: self.manager.check(&slot),
            selected: self.selection.contains_slot(&slot),
            previewed: self.state.preview().contains(&cell),
            slot,
        })
    }

    /// Every cell of the week in reading order.
    pub fn cells(&self) -> Vec<CellView> {
        let rows = self.week.slots().len();
        (0..crate::grid::DAYS_PER_WEEK)
            .flat_map(|day| (0..rows).map(move |slot| Cell::new(day, slot)))
            .filter_map(|cell| self.cell_view(cell))
            .collect()
    }

    /// Merge a fully resolved recurring booking into the selection.
    ///
    /// # Errors
    /// Returns `EngineError::UnresolvedConflicts` if decisions are missing.
    pub fn apply_recurring(&mut self, session: &ResolutionSession) -> Result<usize> {
        session.commit_into(&mut self.selection)
    }

    /// Send the selection to checkout. See [`Selection::submit`].
    pub fn submit(&mut self, sink: &mut dyn CheckoutSink) -> Result<Vec<SelectedTimeSlot>> {
        self.selection.submit(sink, &mut self.manager)
    }

    fn context(&self) -> SurfaceContext<'_> {
        SurfaceContext {
            week: &self.week,
            manager: &self.manager,
            selection: &self.selection,
            shape: self.shape,
        }
    }

    fn apply(&mut self, outcome: &DragOutcome) {
        match outcome {
            DragOutcome::None => {}
            DragOutcome::Add(slots) => {
                let added = self.selection.extend_all(slots.iter().cloned());
                tracing::debug!(added, "drag committed");
            }
            DragOutcome::Remove(slot) => {
                self.selection.remove(&slot.key());
                tracing::debug!(key = %slot.key(), "cell deselected");
            }
        }
    }
}
