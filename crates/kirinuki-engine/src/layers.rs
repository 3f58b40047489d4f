//! The layer store: four same-sized buffers owned by an edit session.
//!
//! - `original` -- the source photo, immutable after load.
//! - `processed` -- the upstream cutout (RGBA with meaningful alpha),
//!   immutable after load.
//! - `mask` -- per-pixel edit intent, mutated by tools and flood fill.
//! - `preview` -- the composited display output, recomputed from the
//!   other three by [`crate::reprocess`]; never authoritative.
//!
//! All mutation is routed through the tool, flood-fill, and
//! reprocessing entry points -- no external writes.

use image::{GrayAlphaImage, LumaA, RgbaImage};

use crate::types::{Dimensions, EngineError};

/// Mask channel conventions.
///
/// The mask is a two-channel buffer: channel 0 is the intent *mode*,
/// channel 1 the intent *strength*. A strength of zero means the pixel
/// is untouched regardless of mode, so the all-zero buffer is the
/// neutral initial mask.
pub mod intent {
    /// Mode channel value marking erase intent.
    pub const MODE_ERASE: u8 = 0;
    /// Mode channel value marking restore intent. The edge-refine
    /// gradient writes intermediate values; anything at or above 128
    /// counts as restore.
    pub const MODE_RESTORE: u8 = 255;
    /// Strength channel value for an untouched pixel.
    pub const NONE: u8 = 0;
    /// Strength channel value for full intent.
    pub const FULL: u8 = 255;

    /// Whether a mode channel value expresses restore intent.
    #[must_use]
    pub const fn is_restore(mode: u8) -> bool {
        mode >= 128
    }
}

/// Identifier for one of the four layer buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    /// The source photo.
    Original,
    /// The upstream cutout.
    Processed,
    /// The edit-intent mask.
    Mask,
    /// The composited display output.
    Preview,
}

impl Layer {
    /// All layers, in compositing order.
    pub const ALL: [Self; 4] = [Self::Original, Self::Processed, Self::Mask, Self::Preview];

    /// Display label for the layer.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Original => "Original",
            Self::Processed => "Processed",
            Self::Mask => "Mask",
            Self::Preview => "Preview",
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Owner of the four layer buffers.
///
/// Created from a decoded image pair; validates that both sources
/// share the same nonzero intrinsic size. Dimensions are fixed for the
/// life of the store.
#[derive(Debug, Clone)]
pub struct LayerStore {
    original: RgbaImage,
    processed: RgbaImage,
    mask: GrayAlphaImage,
    preview: RgbaImage,
    dimensions: Dimensions,
}

impl LayerStore {
    /// Build a store from the decoded source pair.
    ///
    /// The mask starts neutral (all zero) and the preview starts as a
    /// copy of `processed`; callers run the reprocessing pipeline to
    /// materialize a real preview.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ZeroArea`] if either source has a zero
    /// axis, or [`EngineError::DimensionMismatch`] if the two sources
    /// differ in size.
    pub fn new(original: RgbaImage, processed: RgbaImage) -> Result<Self, EngineError> {
        let original_dims = Dimensions {
            width: original.width(),
            height: original.height(),
        };
        let processed_dims = Dimensions {
            width: processed.width(),
            height: processed.height(),
        };

        if original_dims.is_empty() {
            return Err(EngineError::ZeroArea(original_dims));
        }
        if processed_dims.is_empty() {
            return Err(EngineError::ZeroArea(processed_dims));
        }
        if original_dims != processed_dims {
            return Err(EngineError::DimensionMismatch {
                original: original_dims,
                processed: processed_dims,
            });
        }

        let mask = neutral_mask(original_dims);
        let preview = processed.clone();
        Ok(Self {
            original,
            processed,
            mask,
            preview,
            dimensions: original_dims,
        })
    }

    /// Buffer dimensions shared by all four layers.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// The source photo (read-only).
    #[must_use]
    pub const fn original(&self) -> &RgbaImage {
        &self.original
    }

    /// The upstream cutout (read-only).
    #[must_use]
    pub const fn processed(&self) -> &RgbaImage {
        &self.processed
    }

    /// The edit-intent mask.
    #[must_use]
    pub const fn mask(&self) -> &GrayAlphaImage {
        &self.mask
    }

    /// Split borrow for a stroke pass: the mask to write and the
    /// original to color-sample from.
    pub(crate) const fn stroke_targets(&mut self) -> (&mut GrayAlphaImage, &RgbaImage) {
        (&mut self.mask, &self.original)
    }

    /// The composited preview (read-only).
    #[must_use]
    pub const fn preview(&self) -> &RgbaImage {
        &self.preview
    }

    /// Replace the preview with a freshly composited buffer.
    pub(crate) fn set_preview(&mut self, preview: RgbaImage) {
        debug_assert_eq!(preview.width(), self.dimensions.width);
        debug_assert_eq!(preview.height(), self.dimensions.height);
        self.preview = preview;
    }

    /// Reset the mask to neutral (explicit "clear").
    pub(crate) fn reset_mask(&mut self) {
        self.mask = neutral_mask(self.dimensions);
    }

    /// Overwrite the mask from raw snapshot bytes.
    ///
    /// Returns `false` (leaving the mask untouched) if the byte length
    /// does not match the buffer -- the caller decides how to recover.
    #[must_use]
    pub(crate) fn restore_mask(&mut self, raw: Vec<u8>) -> bool {
        match GrayAlphaImage::from_raw(self.dimensions.width, self.dimensions.height, raw) {
            Some(mask) => {
                self.mask = mask;
                true
            }
            None => false,
        }
    }
}

/// An all-zero (untouched) mask of the given size.
fn neutral_mask(dimensions: Dimensions) -> GrayAlphaImage {
    GrayAlphaImage::from_pixel(
        dimensions.width,
        dimensions.height,
        LumaA([intent::MODE_ERASE, intent::NONE]),
    )
}
