//! The interactive editing session: pointer lifecycle, tool dispatch,
//! debounced slider reprocessing, and history.
//!
//! [`EditSession`] is the engine's front door. It owns the layer
//! stack, the tool and slider state, the undo history, and the
//! view transform, and turns raw host input (pointer events in client
//! coordinates, slider changes, button presses) into mask edits and
//! recomposited previews.
//!
//! The session is sans-IO: it never spawns timers or touches a
//! platform clock. The host supplies a [`Clock`] and calls
//! [`poll`](EditSession::poll) from its own tick (an animation frame,
//! an event loop turn) to let debounced slider work fire. State
//! changes the host should react to are queued as [`SessionEvent`]s
//! and drained with [`take_events`](EditSession::take_events).

use std::collections::VecDeque;
use std::time::Duration;

use image::RgbaImage;

use crate::coords::ViewTransform;
use crate::diagnostics::Clock;
use crate::flood::FillReport;
use crate::history::{History, HistoryStatus, Restore};
use crate::layers::LayerStore;
use crate::raster;
use crate::reprocess;
use crate::sched::Debounce;
use crate::tools::ApplyOutcome;
use crate::types::{EngineError, Point, RefineParams, ToolKind, ToolState};

/// State change notifications for the host, drained via
/// [`EditSession::take_events`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The preview buffer was recomposited; repaint it.
    PreviewUpdated,
    /// Undo/redo availability changed.
    HistoryChanged(HistoryStatus),
    /// A flood fill hit its pixel cap and stopped early.
    FillTruncated(FillReport),
    /// A history snapshot failed validation and a fallback state was
    /// restored instead.
    HistoryRecovered(Restore),
}

/// Running tallies of degraded-but-tolerated conditions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCounters {
    /// Pointer events that mapped outside the buffer and were dropped.
    pub dropped_points: u64,
    /// Flood fills truncated at the examination cap.
    pub truncated_fills: u64,
    /// History restores satisfied by a fallback state.
    pub history_recoveries: u64,
}

/// An interactive mask-refinement session over one image pair.
pub struct EditSession<C: Clock> {
    layers: LayerStore,
    tool_state: ToolState,
    params: RefineParams,
    history: History,
    view: ViewTransform,
    clock: C,
    slider: Debounce<RefineParams, C::Instant>,
    drawing: bool,
    stroke_changed: bool,
    deferred_params: Option<RefineParams>,
    events: VecDeque<SessionEvent>,
    counters: SessionCounters,
}

impl<C: Clock> EditSession<C> {
    /// Trailing delay before a slider change triggers reprocessing.
    pub const SLIDER_DEBOUNCE: Duration = Duration::from_millis(150);

    /// Create a session from decoded layer buffers.
    ///
    /// Runs an initial reprocessing pass with default parameters so the
    /// preview is ready immediately.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ZeroArea`] or
    /// [`EngineError::DimensionMismatch`] when the buffers cannot form
    /// a layer stack.
    pub fn new(
        original: RgbaImage,
        processed: RgbaImage,
        view: ViewTransform,
        clock: C,
    ) -> Result<Self, EngineError> {
        let layers = LayerStore::new(original, processed)?;
        let history = History::new(layers.mask());
        let mut session = Self {
            layers,
            tool_state: ToolState::default(),
            params: RefineParams::default(),
            history,
            view,
            clock,
            slider: Debounce::new(Self::SLIDER_DEBOUNCE),
            drawing: false,
            stroke_changed: false,
            deferred_params: None,
            events: VecDeque::new(),
            counters: SessionCounters::default(),
        };
        session.recomposite_now();
        Ok(session)
    }

    /// Create a session from encoded image bytes (PNG, JPEG, BMP, or
    /// WebP).
    ///
    /// # Errors
    ///
    /// Decode errors from either input, plus everything
    /// [`new`](Self::new) can return.
    pub fn from_bytes(
        original_bytes: &[u8],
        processed_bytes: &[u8],
        view: ViewTransform,
        clock: C,
    ) -> Result<Self, EngineError> {
        let original = raster::decode_rgba(original_bytes)?;
        let processed = raster::decode_rgba(processed_bytes)?;
        Self::new(original, processed, view, clock)
    }

    /// The layer stack (original, processed, mask, preview).
    pub const fn layers(&self) -> &LayerStore {
        &self.layers
    }

    /// Current tool selection and parameters.
    pub const fn tool_state(&self) -> &ToolState {
        &self.tool_state
    }

    /// Most recently requested slider parameters (their reprocessing
    /// pass may still be pending in the debounce).
    pub const fn refine_params(&self) -> RefineParams {
        self.params
    }

    /// Undo/redo availability.
    pub const fn history_status(&self) -> HistoryStatus {
        self.history.status()
    }

    /// Degradation tallies for host-side logging.
    pub const fn counters(&self) -> SessionCounters {
        self.counters
    }

    /// Whether a brush stroke is in progress.
    pub const fn is_drawing(&self) -> bool {
        self.drawing
    }

    /// Replace the view transform after a container resize or zoom
    /// change. Takes effect for the next pointer event; an in-flight
    /// stroke keeps stamping under the new mapping.
    pub fn set_view(&mut self, view: ViewTransform) {
        self.view = view;
    }

    /// Current view transform.
    pub const fn view(&self) -> &ViewTransform {
        &self.view
    }

    /// Drain queued notifications, oldest first.
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain(..).collect()
    }

    /// Select the active tool. Does not interrupt an in-progress
    /// stroke; the change applies from the next pointer-down.
    pub const fn set_tool(&mut self, tool: ToolKind) {
        self.tool_state.set_tool(tool);
    }

    /// Set the brush diameter (clamped to the supported range).
    pub const fn set_brush_size(&mut self, size: u32) {
        self.tool_state.set_brush_size(size);
    }

    /// Set the smart-tool color tolerance (clamped).
    pub const fn set_tolerance(&mut self, tolerance: u8) {
        self.tool_state.set_tolerance(tolerance);
    }

    /// Begin a pointer interaction at a client-space position.
    ///
    /// For brush tools this stamps once and enters drawing mode; moves
    /// then extend the stroke. For smart tools this runs the flood fill
    /// and commits immediately (fills are single-click operations, not
    /// strokes).
    pub fn pointer_down(&mut self, client_x: f64, client_y: f64) {
        if self.drawing {
            return;
        }

        let tool = self.tool_state.tool();
        if tool.is_smart() {
            if let Some(point) = self.map_pointer(client_x, client_y) {
                self.apply_tool(tool, point);
                if self.stroke_changed {
                    self.commit_stroke();
                }
            }
            return;
        }

        self.drawing = true;
        self.stroke_changed = false;
        if let Some(point) = self.map_pointer(client_x, client_y) {
            self.apply_tool(tool, point);
        }
    }

    /// Extend an in-progress brush stroke. Ignored when no stroke is
    /// active (a move after pointer-up or cancel).
    pub fn pointer_move(&mut self, client_x: f64, client_y: f64) {
        if !self.drawing {
            return;
        }
        if let Some(point) = self.map_pointer(client_x, client_y) {
            self.apply_tool(self.tool_state.tool(), point);
        }
    }

    /// End the stroke and commit it to history (when it changed the
    /// mask; a stroke entirely outside the buffer commits nothing).
    pub fn pointer_up(&mut self) {
        if !self.drawing {
            return;
        }
        self.drawing = false;
        if self.stroke_changed {
            self.commit_stroke();
        }
        self.flush_deferred_params();
    }

    /// Abort the stroke without a history commit. Pixels already
    /// stamped stay in the mask; they fold into the next committed
    /// operation rather than forming an undo step of their own.
    pub fn pointer_cancel(&mut self) {
        if !self.drawing {
            return;
        }
        self.drawing = false;
        self.stroke_changed = false;
        self.flush_deferred_params();
    }

    /// Request new slider parameters.
    ///
    /// The reprocessing pass is debounced by
    /// [`SLIDER_DEBOUNCE`](Self::SLIDER_DEBOUNCE); rapid changes
    /// coalesce to the latest value. During a stroke the request is
    /// deferred until the stroke ends so stamping latency stays flat.
    pub fn set_refine_params(&mut self, params: RefineParams) {
        let params = params.clamped();
        self.params = params;
        if self.drawing {
            self.deferred_params = Some(params);
        } else {
            self.slider.schedule(params, &self.clock);
        }
    }

    /// Host tick: fire due debounced work.
    ///
    /// Call once per frame (or timer tick). No-op while a stroke is in
    /// progress.
    pub fn poll(&mut self) {
        if self.drawing {
            return;
        }
        if let Some(params) = self.slider.poll(&self.clock) {
            self.params = params;
            self.recomposite_now();
        }
    }

    /// Step back one history entry. Returns `false` at the bottom of
    /// the stack.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(restore) => {
                self.apply_restored(restore);
                true
            }
            None => false,
        }
    }

    /// Step forward one history entry. Returns `false` at the tip.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(restore) => {
                self.apply_restored(restore);
                true
            }
            None => false,
        }
    }

    /// Discard all edits: neutral mask, fresh single-entry history.
    pub fn clear_edits(&mut self) {
        self.layers.reset_mask();
        self.history.clear(self.layers.mask());
        self.events
            .push_back(SessionEvent::HistoryChanged(self.history.status()));
        self.recomposite_now();
    }

    /// Encode the current preview as RGBA PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EmptyExport`] when there is nothing to
    /// export, or [`EngineError::PngEncode`] on encoder failure.
    /// (A constructed session always has a nonzero preview, so only
    /// the encoder failure is reachable here.)
    pub fn export_preview(&self) -> Result<Vec<u8>, EngineError> {
        raster::encode_png(self.layers.preview())
    }

    /// Map a client-space pointer position into the buffer, dropping
    /// positions outside it.
    fn map_pointer(&mut self, client_x: f64, client_y: f64) -> Option<Point> {
        let point = self.view.to_buffer(client_x, client_y);
        match point {
            Some(point) if self.view.contains(point) => Some(point),
            _ => {
                self.counters.dropped_points += 1;
                None
            }
        }
    }

    /// Run one tool application and recomposite.
    fn apply_tool(&mut self, tool: ToolKind, point: Point) {
        let (mask, original) = self.layers.stroke_targets();
        let outcome = tool.apply(mask, original, point, &self.tool_state);
        self.stroke_changed = true;
        if let ApplyOutcome::Filled(report) = outcome {
            if report.truncated {
                self.counters.truncated_fills += 1;
                self.events.push_back(SessionEvent::FillTruncated(report));
            }
        }
        self.recomposite_now();
    }

    /// Record the current mask as one undoable operation.
    fn commit_stroke(&mut self) {
        self.history.commit(self.layers.mask());
        self.stroke_changed = false;
        self.events
            .push_back(SessionEvent::HistoryChanged(self.history.status()));
    }

    /// Write restored snapshot bytes back into the mask and republish.
    fn apply_restored(&mut self, (bytes, how): (Vec<u8>, Restore)) {
        if how != Restore::Snapshot {
            self.counters.history_recoveries += 1;
            self.events.push_back(SessionEvent::HistoryRecovered(how));
        }
        if !self.layers.restore_mask(bytes) {
            // Snapshot bytes cannot form a buffer of the right size;
            // fall back to a neutral mask.
            self.layers.reset_mask();
            self.counters.history_recoveries += 1;
            self.events
                .push_back(SessionEvent::HistoryRecovered(Restore::Reinitialized));
        }
        self.events
            .push_back(SessionEvent::HistoryChanged(self.history.status()));
        self.recomposite_now();
    }

    /// Schedule parameters that arrived mid-stroke.
    fn flush_deferred_params(&mut self) {
        if let Some(params) = self.deferred_params.take() {
            self.slider.schedule(params, &self.clock);
        }
    }

    /// Recompute the preview from the current layers and parameters.
    fn recomposite_now(&mut self) {
        let preview = reprocess::recomposite(
            self.layers.processed(),
            self.layers.original(),
            self.layers.mask(),
            &self.params,
        );
        self.layers.set_preview(preview);
        self.events.push_back(SessionEvent::PreviewUpdated);
    }
}
