//! The reprocessing pipeline: recompute the preview from scratch.
//!
//! Produces the `preview` buffer from `processed`, `original`, the
//! edit-intent mask, and the two slider parameters. Four steps:
//!
//! 1. Base: copy `processed` (or `original` under the debug toggle)
//! 2. Background sensitivity: tri-modal alpha policy on untouched
//!    semi-transparent pixels
//! 3. Edge refinement: neighbor-sampled alpha smoothing at
//!    discontinuities
//! 4. Mask application: restore from `original` / erase, per intent
//!
//! The whole pass is a pure function of its inputs -- the same inputs
//! always produce a byte-identical preview. It is also the hottest
//! path in the engine (the 3x3 neighbor sampling of step 3 dominates),
//! which is why slider changes reach it only through the debounce in
//! [`crate::sched`].

use image::{GrayAlphaImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::layers::intent;
use crate::types::RefineParams;

/// Alpha range (exclusive) treated as an edge pixel by step 3.
pub const EDGE_ALPHA_MIN: u8 = 10;
/// Upper bound (exclusive) of the edge-pixel alpha range.
pub const EDGE_ALPHA_MAX: u8 = 240;

/// Minimum |alpha - neighborhood mean| for a pixel to count as sitting
/// on a discontinuity worth smoothing.
pub const DISCONTINUITY_THRESHOLD: f64 = 8.0;

/// Mask strength at or above which restore intent copies the original
/// pixel verbatim instead of blending (0.9 of full). Only flood-fill
/// writes reach this; the restore brush stays in the blend regime.
pub const HARD_RESTORE_MIN: u8 = 230;

/// Per-step pixel counts from one reprocessing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReprocessCounts {
    /// Step 2: semi-transparent, untouched pixels considered.
    pub background_candidates: u64,
    /// Step 2: pixels reduced by the luminance-weighted hunt.
    pub background_hunted: u64,
    /// Step 2: pixels zeroed by the conservative threshold.
    pub background_zeroed: u64,
    /// Step 2: pixels reduced by the graded fade.
    pub background_faded: u64,
    /// Step 3: pixels in the edge alpha range.
    pub edge_candidates: u64,
    /// Step 3: pixels actually blended toward the neighborhood mean.
    pub edge_smoothed: u64,
    /// Step 4: pixels copied verbatim from the original.
    pub restored_hard: u64,
    /// Step 4: pixels content-aware blended toward the original.
    pub restored_soft: u64,
    /// Step 4: pixels with erase intent applied.
    pub erased: u64,
}

/// Run the full pipeline and return the new preview buffer.
///
/// Callers own scheduling: this is synchronous and unconditional.
/// Out-of-range slider values are clamped, never rejected.
#[must_use]
pub fn recomposite(
    processed: &RgbaImage,
    original: &RgbaImage,
    mask: &GrayAlphaImage,
    params: &RefineParams,
) -> RgbaImage {
    recomposite_counted(processed, original, mask, params).0
}

/// [`recomposite`] variant that also reports per-step pixel counts,
/// for diagnostics and the bench tool.
#[must_use]
pub fn recomposite_counted(
    processed: &RgbaImage,
    original: &RgbaImage,
    mask: &GrayAlphaImage,
    params: &RefineParams,
) -> (RgbaImage, ReprocessCounts) {
    let params = params.clamped();
    let mut counts = ReprocessCounts::default();

    // Step 1: base layer.
    let mut preview = if params.show_original {
        original.clone()
    } else {
        processed.clone()
    };

    apply_background_sensitivity(&mut preview, mask, params.sensitivity, &mut counts);
    refine_edges(&mut preview, params.edge_refinement, &mut counts);
    apply_mask_intent(&mut preview, original, processed, mask, &mut counts);

    (preview, counts)
}

/// Step 2: tri-modal background sensitivity policy.
///
/// Applies only where the mask is untouched and alpha is strictly
/// between 0 and 255. `aggressiveness = 1 - sensitivity/100`:
///
/// - above 0.5, actively hunt dark semi-transparent pixels -- reduce
///   alpha in proportion to `1 - luminance`
/// - below 0.3, conservative: zero pixels under the scaled threshold,
///   leave everything else alone
/// - in between, graded fade proportional to how far below the
///   threshold the alpha sits
pub(crate) fn apply_background_sensitivity(
    preview: &mut RgbaImage,
    mask: &GrayAlphaImage,
    sensitivity: u8,
    counts: &mut ReprocessCounts,
) {
    let aggressiveness = 1.0 - f64::from(sensitivity) / 100.0;
    if aggressiveness <= 0.0 {
        return;
    }
    let threshold = aggressiveness * 255.0;

    for (x, y, pixel) in preview.enumerate_pixels_mut() {
        if mask.get_pixel(x, y).0[1] != intent::NONE {
            continue;
        }
        let alpha = pixel.0[3];
        if alpha == 0 || alpha == u8::MAX {
            continue;
        }
        counts.background_candidates += 1;

        let af = f64::from(alpha);
        let new_alpha = if aggressiveness > 0.5 {
            let likelihood = (1.0 - luminance(pixel.0)).max(0.0);
            af - af * aggressiveness * likelihood
        } else if aggressiveness < 0.3 {
            if af < threshold { 0.0 } else { af }
        } else if af < threshold {
            af * (af / threshold)
        } else {
            af
        };

        // Counters track pixels the step actually changed, not every
        // candidate its branch looked at.
        let quantized = quantize_alpha(new_alpha);
        if quantized == alpha {
            continue;
        }
        if aggressiveness > 0.5 {
            counts.background_hunted += 1;
        } else if aggressiveness < 0.3 {
            counts.background_zeroed += 1;
        } else {
            counts.background_faded += 1;
        }
        pixel.0[3] = quantized;
    }
}

/// Step 3: neighbor-sampled edge smoothing.
///
/// For every pixel in the edge alpha range, compare its alpha to the
/// 3x3 neighborhood mean (clipped at borders, center included, read
/// from a frozen copy so visiting order cannot matter). Where the
/// difference exceeds [`DISCONTINUITY_THRESHOLD`], blend toward the
/// mean by `edge_refinement/100 * edge_strength` -- stronger
/// discontinuities get proportionally more smoothing.
pub(crate) fn refine_edges(
    preview: &mut RgbaImage,
    edge_refinement: u8,
    counts: &mut ReprocessCounts,
) {
    if edge_refinement == 0 {
        return;
    }
    let (width, height) = (preview.width(), preview.height());
    let frozen: Vec<u8> = preview.pixels().map(|p| p.0[3]).collect();
    let flat = |x: u32, y: u32| y as usize * width as usize + x as usize;
    let blend_scale = f64::from(edge_refinement) / 100.0;

    for y in 0..height {
        for x in 0..width {
            let alpha = frozen[flat(x, y)];
            if alpha <= EDGE_ALPHA_MIN || alpha >= EDGE_ALPHA_MAX {
                continue;
            }
            counts.edge_candidates += 1;

            let mean = neighborhood_mean(&frozen, width, height, x, y);
            let diff = f64::from(alpha) - mean;
            if diff.abs() <= DISCONTINUITY_THRESHOLD {
                continue;
            }
            counts.edge_smoothed += 1;

            let edge_strength = (diff.abs() / 255.0).min(1.0);
            let blend = blend_scale * edge_strength;
            let new_alpha = f64::from(alpha) + (mean - f64::from(alpha)) * blend;
            preview.get_pixel_mut(x, y).0[3] = quantize_alpha(new_alpha);
        }
    }
}

/// Step 4: apply edit intent from the mask.
///
/// Restore intent at or above [`HARD_RESTORE_MIN`] copies the original
/// RGBA verbatim. Softer restore strengths blend toward the original,
/// with the blend factor damped where original and processed luminance
/// disagree sharply (so a clearly-wrong pixel is never restored
/// wholesale). Erase intent scales the preview alpha down.
pub(crate) fn apply_mask_intent(
    preview: &mut RgbaImage,
    original: &RgbaImage,
    processed: &RgbaImage,
    mask: &GrayAlphaImage,
    counts: &mut ReprocessCounts,
) {
    for (x, y, pixel) in preview.enumerate_pixels_mut() {
        let [mode, strength] = mask.get_pixel(x, y).0;
        if strength == intent::NONE {
            continue;
        }

        if intent::is_restore(mode) {
            let source = original.get_pixel(x, y).0;
            if strength >= HARD_RESTORE_MIN {
                counts.restored_hard += 1;
                pixel.0 = source;
            } else {
                counts.restored_soft += 1;
                let agreement =
                    1.0 - (luminance(source) - luminance(processed.get_pixel(x, y).0)).abs();
                let factor = f64::from(strength) / 255.0 * agreement.max(0.0);
                for channel in 0..4 {
                    let current = f64::from(pixel.0[channel]);
                    let target = f64::from(source[channel]);
                    pixel.0[channel] = quantize_alpha(current + (target - current) * factor);
                }
            }
        } else {
            counts.erased += 1;
            let retained = 1.0 - f64::from(strength) / 255.0;
            pixel.0[3] = quantize_alpha(f64::from(pixel.0[3]) * retained);
        }
    }
}

/// Normalized luminance of an RGBA pixel (alpha ignored), 0.0–1.0.
fn luminance(pixel: [u8; 4]) -> f64 {
    let r = f64::from(pixel[0]);
    let g = f64::from(pixel[1]);
    let b = f64::from(pixel[2]);
    0.114f64.mul_add(b, 0.299f64.mul_add(r, 0.587 * g)) / 255.0
}

/// Mean alpha of the in-bounds 3x3 neighborhood around `(x, y)`,
/// center included.
fn neighborhood_mean(alphas: &[u8], width: u32, height: u32, x: u32, y: u32) -> f64 {
    let mut sum = 0u32;
    let mut count = 0u32;
    let x = i64::from(x);
    let y = i64::from(y);
    for dy in -1..=1i64 {
        for dx in -1..=1i64 {
            let nx = x + dx;
            let ny = y + dy;
            if nx < 0 || ny < 0 || nx >= i64::from(width) || ny >= i64::from(height) {
                continue;
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let idx = ny as usize * width as usize + nx as usize;
            sum += u32::from(alphas[idx]);
            count += 1;
        }
    }
    f64::from(sum) / f64::from(count)
}

/// Round and clamp a floating-point alpha back into `u8`.
fn quantize_alpha(value: f64) -> u8 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let quantized = value.round().clamp(0.0, 255.0) as u8;
    quantized
}
