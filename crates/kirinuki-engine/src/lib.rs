//! kirinuki-engine: Interactive background-removal refinement (sans-IO).
//!
//! Takes an automatically cut-out image plus its original and lets a
//! host drive manual touch-up: brush and smart-fill tools write edit
//! intent into a mask, a slider-driven pipeline recomposites the
//! preview, and a bounded history provides undo/redo.
//!
//! This crate has **no I/O dependencies** -- no timers, no threads, no
//! platform clock. Pointer events, ticks, and a [`Clock`] come from
//! the host; the engine hands back buffers and [`SessionEvent`]s.

pub mod coords;
pub mod diagnostics;
pub mod flood;
pub mod history;
pub mod layers;
pub mod raster;
pub mod reprocess;
pub mod sched;
pub mod session;
pub mod tools;
pub mod types;

pub use coords::{DisplayRect, ViewTransform};
pub use diagnostics::{Clock, ReprocessDiagnostics, recomposite_with_diagnostics};
pub use flood::FillReport;
pub use history::{HistoryStatus, Restore};
pub use layers::{Layer, LayerStore, intent};
pub use reprocess::{ReprocessCounts, recomposite};
pub use session::{EditSession, SessionCounters, SessionEvent};
pub use types::{
    Dimensions, EngineError, GrayAlphaImage, Point, RefineParams, RgbaImage, ToolKind, ToolState,
};
