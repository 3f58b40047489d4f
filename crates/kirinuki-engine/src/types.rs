//! Shared types for the kirinuki mask-refinement engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can reference the
/// source/preview buffers without depending on `image` directly.
pub use image::RgbaImage;

/// Re-export `GrayAlphaImage`, the storage type of the edit-intent
/// mask (see [`crate::layers`] for the channel conventions).
pub use image::GrayAlphaImage;

/// A 2D point in buffer coordinates (pixels, origin top-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total pixel count (`width * height`).
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns `true` if either axis is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The active editing tool.
///
/// Each variant carries a uniform stamp implementation (see
/// [`ToolKind::apply`](crate::tools)); adding a tool means adding one
/// variant, not threading a branch through every call site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    /// Paint back foreground pixels the cutout removed.
    #[default]
    Restore,
    /// Mark residual background for removal.
    Erase,
    /// Smaller, full-strength brush that clears edit intent outright.
    PrecisionErase,
    /// Soft gradient brush that invites neighbor smoothing at edges.
    EdgeRefine,
    /// Single-click flood fill marking a background region for removal.
    SmartErase,
    /// Single-click flood fill restoring a region from the original.
    SmartRestore,
}

impl ToolKind {
    /// All tools, in toolbar order.
    pub const ALL: [Self; 6] = [
        Self::Restore,
        Self::Erase,
        Self::PrecisionErase,
        Self::EdgeRefine,
        Self::SmartErase,
        Self::SmartRestore,
    ];

    /// Display label for the tool.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Restore => "Restore",
            Self::Erase => "Erase",
            Self::PrecisionErase => "Precision erase",
            Self::EdgeRefine => "Edge refine",
            Self::SmartErase => "Smart background erase",
            Self::SmartRestore => "Smart background restore",
        }
    }

    /// Whether the tool is a single-click flood-fill tool rather than
    /// a stroke brush.
    #[must_use]
    pub const fn is_smart(self) -> bool {
        matches!(self, Self::SmartErase | Self::SmartRestore)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tool selection and brush parameters.
///
/// Exactly one tool is active at a time. All setters clamp to the
/// documented ranges, so a `ToolState` is valid by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolState {
    tool: ToolKind,
    brush_size: u32,
    tolerance: u8,
}

impl ToolState {
    /// Minimum brush diameter in pixels.
    pub const MIN_BRUSH_SIZE: u32 = 5;
    /// Maximum brush diameter in pixels.
    pub const MAX_BRUSH_SIZE: u32 = 100;
    /// Default brush diameter in pixels.
    pub const DEFAULT_BRUSH_SIZE: u32 = 20;

    /// Minimum flood-fill tolerance (% of the 255 color-distance range).
    pub const MIN_TOLERANCE: u8 = 1;
    /// Maximum flood-fill tolerance.
    pub const MAX_TOLERANCE: u8 = 50;
    /// Default flood-fill tolerance.
    pub const DEFAULT_TOLERANCE: u8 = 20;

    /// The active tool.
    #[must_use]
    pub const fn tool(&self) -> ToolKind {
        self.tool
    }

    /// Brush diameter in pixels.
    #[must_use]
    pub const fn brush_size(&self) -> u32 {
        self.brush_size
    }

    /// Flood-fill color tolerance (1–50).
    #[must_use]
    pub const fn tolerance(&self) -> u8 {
        self.tolerance
    }

    /// Select a tool. Never clears in-progress history.
    pub const fn set_tool(&mut self, tool: ToolKind) {
        self.tool = tool;
    }

    /// Set the brush diameter, clamped to 5–100 px.
    pub const fn set_brush_size(&mut self, size: u32) {
        self.brush_size = clamp_u32(size, Self::MIN_BRUSH_SIZE, Self::MAX_BRUSH_SIZE);
    }

    /// Set the flood-fill tolerance, clamped to 1–50.
    pub const fn set_tolerance(&mut self, tolerance: u8) {
        self.tolerance = clamp_u8(tolerance, Self::MIN_TOLERANCE, Self::MAX_TOLERANCE);
    }
}

impl Default for ToolState {
    fn default() -> Self {
        Self {
            tool: ToolKind::default(),
            brush_size: Self::DEFAULT_BRUSH_SIZE,
            tolerance: Self::DEFAULT_TOLERANCE,
        }
    }
}

/// Slider parameters driving the full-image reprocessing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefineParams {
    /// Background sensitivity, 0–100. Low values treat ambiguous
    /// semi-transparent pixels aggressively as background; 100 leaves
    /// them untouched.
    pub sensitivity: u8,
    /// Edge refinement strength, 0–100. Controls neighbor-based alpha
    /// smoothing at alpha discontinuities.
    pub edge_refinement: u8,
    /// Debug toggle: composite on top of the original photo instead of
    /// the processed cutout.
    pub show_original: bool,
}

impl RefineParams {
    /// Default background sensitivity.
    pub const DEFAULT_SENSITIVITY: u8 = 50;
    /// Default edge refinement strength.
    pub const DEFAULT_EDGE_REFINEMENT: u8 = 50;

    /// Upper bound of both slider ranges.
    pub const MAX: u8 = 100;

    /// Returns a copy with both sliders clamped to 0–100.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            sensitivity: self.sensitivity.min(Self::MAX),
            edge_refinement: self.edge_refinement.min(Self::MAX),
            show_original: self.show_original,
        }
    }
}

impl Default for RefineParams {
    fn default() -> Self {
        Self {
            sensitivity: Self::DEFAULT_SENSITIVITY,
            edge_refinement: Self::DEFAULT_EDGE_REFINEMENT,
            show_original: false,
        }
    }
}

/// Errors that can cross the engine boundary.
///
/// Pixel-level anomalies (out-of-bounds stroke points, truncated flood
/// fills, history snapshot recovery) are handled locally and never
/// appear here; only initialization and export failures are surfaced.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Failed to decode a source image.
    #[error("failed to decode source image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// A source image byte buffer was empty.
    #[error("source image data is empty")]
    EmptyInput,

    /// The two source images differ in intrinsic size.
    #[error("source images differ in size: original {original}, processed {processed}")]
    DimensionMismatch {
        /// Dimensions of the original photo.
        original: Dimensions,
        /// Dimensions of the processed cutout.
        processed: Dimensions,
    },

    /// A source image has zero area.
    #[error("source image has zero area ({0})")]
    ZeroArea(Dimensions),

    /// The preview buffer is uninitialized or zero-sized at export time.
    #[error("preview buffer is empty; nothing to export")]
    EmptyExport,

    /// PNG encoding failed during export.
    #[error("PNG encoding failed: {0}")]
    PngEncode(String),
}

/// `u32` clamp usable in a `const fn` (`Ord::clamp` is not const).
const fn clamp_u32(value: u32, min: u32, max: u32) -> u32 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// `u8` clamp usable in a `const fn`.
const fn clamp_u8(value: u8, min: u8, max: u8) -> u8 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_display_and_counts() {
        let d = Dimensions {
            width: 640,
            height: 480,
        };
        assert_eq!(d.to_string(), "640x480");
        assert_eq!(d.pixel_count(), 307_200);
        assert!(!d.is_empty());
        assert!(
            Dimensions {
                width: 0,
                height: 480
            }
            .is_empty()
        );
    }

    #[test]
    fn point_distance_squared() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance_squared(b) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn tool_all_contains_every_variant() {
        // If you add a variant to ToolKind, update ALL and this count.
        assert_eq!(ToolKind::ALL.len(), 6);
        let mut seen = std::collections::HashSet::new();
        for tool in ToolKind::ALL {
            assert!(seen.insert(tool), "duplicate tool in ALL: {tool}");
        }
    }

    #[test]
    fn smart_tools_are_flagged() {
        assert!(ToolKind::SmartErase.is_smart());
        assert!(ToolKind::SmartRestore.is_smart());
        assert!(!ToolKind::Restore.is_smart());
        assert!(!ToolKind::PrecisionErase.is_smart());
    }

    #[test]
    fn tool_state_defaults() {
        let state = ToolState::default();
        assert_eq!(state.tool(), ToolKind::Restore);
        assert_eq!(state.brush_size(), ToolState::DEFAULT_BRUSH_SIZE);
        assert_eq!(state.tolerance(), ToolState::DEFAULT_TOLERANCE);
    }

    #[test]
    fn brush_size_clamps_to_range() {
        let mut state = ToolState::default();
        state.set_brush_size(1);
        assert_eq!(state.brush_size(), ToolState::MIN_BRUSH_SIZE);
        state.set_brush_size(500);
        assert_eq!(state.brush_size(), ToolState::MAX_BRUSH_SIZE);
        state.set_brush_size(42);
        assert_eq!(state.brush_size(), 42);
    }

    #[test]
    fn tolerance_clamps_to_range() {
        let mut state = ToolState::default();
        state.set_tolerance(0);
        assert_eq!(state.tolerance(), ToolState::MIN_TOLERANCE);
        state.set_tolerance(200);
        assert_eq!(state.tolerance(), ToolState::MAX_TOLERANCE);
    }

    #[test]
    fn refine_params_clamped() {
        let params = RefineParams {
            sensitivity: 255,
            edge_refinement: 101,
            show_original: true,
        }
        .clamped();
        assert_eq!(params.sensitivity, 100);
        assert_eq!(params.edge_refinement, 100);
        assert!(params.show_original);
    }

    #[test]
    fn tool_kind_serde_kebab_case() {
        let json = serde_json::to_string(&ToolKind::SmartErase).unwrap();
        assert_eq!(json, "\"smart-erase\"");
        let back: ToolKind = serde_json::from_str("\"precision-erase\"").unwrap();
        assert_eq!(back, ToolKind::PrecisionErase);
    }

    #[test]
    fn refine_params_serde_round_trip() {
        let params = RefineParams {
            sensitivity: 30,
            edge_refinement: 70,
            show_original: false,
        };
        let json = serde_json::to_string(&params).unwrap();
        let back: RefineParams = serde_json::from_str(&json).unwrap();
        assert_eq!(params, back);
    }

    #[test]
    fn error_display_messages() {
        assert_eq!(
            EngineError::EmptyInput.to_string(),
            "source image data is empty"
        );
        let err = EngineError::DimensionMismatch {
            original: Dimensions {
                width: 10,
                height: 10,
            },
            processed: Dimensions {
                width: 20,
                height: 10,
            },
        };
        assert_eq!(
            err.to_string(),
            "source images differ in size: original 10x10, processed 20x10"
        );
        assert_eq!(
            EngineError::EmptyExport.to_string(),
            "preview buffer is empty; nothing to export"
        );
    }
}
