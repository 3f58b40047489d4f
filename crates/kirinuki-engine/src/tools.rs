//! Per-tool stroke algorithms: how each tool writes edit intent into
//! the mask.
//!
//! Every tool funnels through the uniform [`ToolKind::apply`] entry
//! point, consuming one buffer-space point at a time (pointer-down and
//! each pointer-move yield one stamp). Same-mode brush stamps
//! saturate, so repainting an already saturated region changes
//! nothing, while an opposite-mode stamp always takes effect (latest
//! intent wins). The smart tools delegate to the flood-fill engine
//! instead of stamping.

use image::{GrayAlphaImage, RgbaImage};

use crate::flood::{self, FillReport};
use crate::layers::intent;
use crate::types::{Point, ToolKind, ToolState};

/// Strength written by the hard restore/erase brushes (0.8 of full).
pub const STAMP_STRENGTH: u8 = 204;

/// Peak strength of the edge-refine gradient brush (0.6 of full).
/// Kept below the hard-restore cutoff so the reprocessing pipeline
/// treats the region as a blend zone, never a verbatim copy.
pub const EDGE_REFINE_PEAK: u8 = 153;

/// Radius multiplier for the precision-erase brush.
pub const PRECISION_RADIUS_FACTOR: f64 = 0.7;

/// What a single [`ToolKind::apply`] call did to the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// A brush stamp was written (possibly a no-op on saturated pixels).
    Stamped,
    /// A flood fill ran; the report carries selection and truncation
    /// counts.
    Filled(FillReport),
}

impl ToolKind {
    /// Apply this tool at one buffer-space point.
    ///
    /// `point` is expected to be within buffer bounds (the session
    /// drops out-of-bounds points before dispatch); stamps whose
    /// *footprint* extends past an edge are clipped, which is normal
    /// near borders.
    pub fn apply(
        self,
        mask: &mut GrayAlphaImage,
        original: &RgbaImage,
        point: Point,
        state: &ToolState,
    ) -> ApplyOutcome {
        let radius = f64::from(state.brush_size()) / 2.0;
        match self {
            Self::Restore => {
                stamp_circle(mask, point, radius, intent::MODE_RESTORE, STAMP_STRENGTH);
                ApplyOutcome::Stamped
            }
            Self::Erase => {
                stamp_circle(mask, point, radius, intent::MODE_ERASE, STAMP_STRENGTH);
                ApplyOutcome::Stamped
            }
            Self::PrecisionErase => {
                stamp_clear(mask, point, radius * PRECISION_RADIUS_FACTOR);
                ApplyOutcome::Stamped
            }
            Self::EdgeRefine => {
                stamp_gradient(mask, point, radius, EDGE_REFINE_PEAK);
                ApplyOutcome::Stamped
            }
            Self::SmartErase => ApplyOutcome::Filled(flood::fill(
                original,
                mask,
                point,
                state.tolerance(),
                intent::MODE_ERASE,
            )),
            Self::SmartRestore => ApplyOutcome::Filled(flood::fill(
                original,
                mask,
                point,
                state.tolerance(),
                intent::MODE_RESTORE,
            )),
        }
    }
}

/// Write `(mode, strength)` into every mask pixel within `radius` of
/// `center`, saturating against the existing strength.
fn stamp_circle(mask: &mut GrayAlphaImage, center: Point, radius: f64, mode: u8, strength: u8) {
    for_each_in_circle(mask, center, radius, |pixel, _dist| {
        blend_intent(pixel, mode, strength);
    });
}

/// Write a radial gradient: full `peak` strength at the center falling
/// linearly to zero at `radius`. Mode is always restore -- the soft
/// intent marks a blend zone for the reprocessing pipeline.
fn stamp_gradient(mask: &mut GrayAlphaImage, center: Point, radius: f64, peak: u8) {
    for_each_in_circle(mask, center, radius, |pixel, dist| {
        let falloff = 1.0 - dist / radius;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let strength = (f64::from(peak) * falloff).round() as u8;
        blend_intent(pixel, intent::MODE_RESTORE, strength);
    });
}

/// Clear intent to neutral within `radius` of `center` (the
/// destination-out brush).
fn stamp_clear(mask: &mut GrayAlphaImage, center: Point, radius: f64) {
    for_each_in_circle(mask, center, radius, |pixel, _dist| {
        pixel.0 = [intent::MODE_ERASE, intent::NONE];
    });
}

/// Visit every mask pixel whose center lies within `radius` of
/// `center`, clipping the footprint at the buffer edges.
fn for_each_in_circle<F>(mask: &mut GrayAlphaImage, center: Point, radius: f64, mut visit: F)
where
    F: FnMut(&mut image::LumaA<u8>, f64),
{
    if radius <= 0.0 {
        return;
    }
    let (width, height) = (i64::from(mask.width()), i64::from(mask.height()));

    #[allow(clippy::cast_possible_truncation)]
    let x_min = ((center.x - radius).floor() as i64).max(0);
    #[allow(clippy::cast_possible_truncation)]
    let x_max = ((center.x + radius).ceil() as i64).min(width - 1);
    #[allow(clippy::cast_possible_truncation)]
    let y_min = ((center.y - radius).floor() as i64).max(0);
    #[allow(clippy::cast_possible_truncation)]
    let y_max = ((center.y + radius).ceil() as i64).min(height - 1);

    let radius_sq = radius * radius;
    for y in y_min..=y_max {
        for x in x_min..=x_max {
            #[allow(clippy::cast_precision_loss)]
            let sample = Point::new(x as f64, y as f64);
            let dist_sq = sample.distance_squared(center);
            if dist_sq <= radius_sq {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let pixel = mask.get_pixel_mut(x as u32, y as u32);
                visit(pixel, dist_sq.sqrt());
            }
        }
    }
}

/// Intent write for one stamped pixel.
///
/// Same-mode stamps saturate: the pixel is written only when the
/// incoming strength is at least the stored one, so repainting a
/// region never weakens it. An opposite-mode stamp always takes
/// effect regardless of strength -- the latest intent wins, so an
/// erase stroke over a fully restored region is never a silent no-op.
/// Both paths keep every stamp idempotent.
fn blend_intent(pixel: &mut image::LumaA<u8>, mode: u8, strength: u8) {
    let [stored_mode, stored_strength] = pixel.0;
    let opposing =
        stored_strength != intent::NONE && intent::is_restore(stored_mode) != intent::is_restore(mode);
    if opposing || strength >= stored_strength {
        pixel.0 = [mode, strength];
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Rgba;

    fn mask(w: u32, h: u32) -> GrayAlphaImage {
        GrayAlphaImage::new(w, h)
    }

    fn original(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([50, 50, 50, 255]))
    }

    fn state_with(tool: ToolKind, brush: u32) -> ToolState {
        let mut s = ToolState::default();
        s.set_tool(tool);
        s.set_brush_size(brush);
        s
    }

    #[test]
    fn restore_stamp_writes_restore_intent() {
        let mut m = mask(20, 20);
        let state = state_with(ToolKind::Restore, 10);
        ToolKind::Restore.apply(&mut m, &original(20, 20), Point::new(10.0, 10.0), &state);

        let center = m.get_pixel(10, 10).0;
        assert_eq!(center, [intent::MODE_RESTORE, STAMP_STRENGTH]);
        // A pixel well outside the 5px radius is untouched.
        assert_eq!(m.get_pixel(0, 0).0, [0, 0]);
    }

    #[test]
    fn erase_stamp_writes_erase_intent() {
        let mut m = mask(20, 20);
        let state = state_with(ToolKind::Erase, 10);
        ToolKind::Erase.apply(&mut m, &original(20, 20), Point::new(10.0, 10.0), &state);
        assert_eq!(
            m.get_pixel(10, 10).0,
            [intent::MODE_ERASE, STAMP_STRENGTH]
        );
    }

    #[test]
    fn restore_stamp_is_idempotent() {
        let mut m = mask(20, 20);
        let state = state_with(ToolKind::Restore, 12);
        let p = Point::new(9.0, 9.0);
        ToolKind::Restore.apply(&mut m, &original(20, 20), p, &state);
        let once = m.clone();
        ToolKind::Restore.apply(&mut m, &original(20, 20), p, &state);
        assert_eq!(m.as_raw(), once.as_raw(), "second stamp must be a no-op");
    }

    #[test]
    fn stamps_saturate_rather_than_accumulate() {
        let mut m = mask(20, 20);
        // Pre-saturate the center pixel at full strength.
        m.get_pixel_mut(10, 10).0 = [intent::MODE_RESTORE, intent::FULL];
        let state = state_with(ToolKind::Restore, 10);
        ToolKind::Restore.apply(&mut m, &original(20, 20), Point::new(10.0, 10.0), &state);
        // Weaker same-mode stamp neither lowers the strength nor
        // flips the mode.
        assert_eq!(m.get_pixel(10, 10).0, [intent::MODE_RESTORE, intent::FULL]);
    }

    #[test]
    fn erase_overrides_a_fully_restored_region() {
        let mut m = mask(20, 20);
        // A smart restore leaves full-strength restore intent, above
        // the brush stamp strength.
        m.get_pixel_mut(10, 10).0 = [intent::MODE_RESTORE, intent::FULL];

        let state = state_with(ToolKind::Erase, 10);
        ToolKind::Erase.apply(&mut m, &original(20, 20), Point::new(10.0, 10.0), &state);
        assert_eq!(
            m.get_pixel(10, 10).0,
            [intent::MODE_ERASE, STAMP_STRENGTH],
            "opposite-mode stroke must take effect"
        );

        // And it stays idempotent: a second erase stamp is a no-op.
        let once = m.clone();
        ToolKind::Erase.apply(&mut m, &original(20, 20), Point::new(10.0, 10.0), &state);
        assert_eq!(m.as_raw(), once.as_raw());
    }

    #[test]
    fn precision_erase_clears_intent_with_smaller_radius() {
        let mut m = mask(30, 30);
        // Fill a region with restore intent first.
        let state = state_with(ToolKind::Restore, 20);
        ToolKind::Restore.apply(&mut m, &original(30, 30), Point::new(15.0, 15.0), &state);

        let state = state_with(ToolKind::PrecisionErase, 20);
        ToolKind::PrecisionErase.apply(&mut m, &original(30, 30), Point::new(15.0, 15.0), &state);

        // Center is cleared.
        assert_eq!(m.get_pixel(15, 15).0, [0, 0]);
        // A pixel inside the restore radius (10) but outside the
        // precision radius (7) keeps its intent.
        assert_eq!(
            m.get_pixel(15 + 9, 15).0,
            [intent::MODE_RESTORE, STAMP_STRENGTH]
        );
    }

    #[test]
    fn edge_refine_gradient_falls_off_and_stays_soft() {
        let mut m = mask(40, 40);
        let state = state_with(ToolKind::EdgeRefine, 20);
        ToolKind::EdgeRefine.apply(&mut m, &original(40, 40), Point::new(20.0, 20.0), &state);

        let center = m.get_pixel(20, 20).0;
        assert_eq!(center, [intent::MODE_RESTORE, EDGE_REFINE_PEAK]);

        let mid = m.get_pixel(25, 20).0; // 5px out of a 10px radius
        assert!(mid[1] > 0 && mid[1] < EDGE_REFINE_PEAK, "got {}", mid[1]);

        // Every written strength stays at or below the soft peak.
        assert!(m.pixels().all(|p| p.0[1] <= EDGE_REFINE_PEAK));
    }

    #[test]
    fn footprint_is_clipped_at_buffer_edges() {
        let mut m = mask(10, 10);
        let state = state_with(ToolKind::Restore, 100);
        // Center well outside; part of the footprint still lands.
        ToolKind::Restore.apply(&mut m, &original(10, 10), Point::new(0.0, 0.0), &state);
        assert_eq!(m.get_pixel(0, 0).0, [intent::MODE_RESTORE, STAMP_STRENGTH]);
    }

    #[test]
    fn smart_tools_delegate_to_flood_fill() {
        let mut m = mask(10, 10);
        let state = state_with(ToolKind::SmartErase, 10);
        let outcome =
            ToolKind::SmartErase.apply(&mut m, &original(10, 10), Point::new(5.0, 5.0), &state);
        assert!(
            matches!(outcome, ApplyOutcome::Filled(report) if report.selected > 0),
            "smart tool must flood fill, got {outcome:?}"
        );
        assert_eq!(m.get_pixel(5, 5).0, [intent::MODE_ERASE, intent::FULL]);
    }
}
