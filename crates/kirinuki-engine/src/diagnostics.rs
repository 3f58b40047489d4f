//! Reprocessing diagnostics: per-step timing and pixel counts.
//!
//! These diagnostics are permanent instrumentation intended for
//! algorithm tuning and slider-response profiling. The interactive
//! session uses the plain [`recomposite`](crate::reprocess::recomposite)
//! path; the instrumented variant here is for hosts and tooling that
//! want the breakdown.
//!
//! Timestamps come from an injected [`Clock`] so the crate itself never
//! touches a platform time source. Durations are serialized as
//! fractional seconds (`f64`) for JSON compatibility, since
//! `std::time::Duration` does not implement serde traits.

use std::time::Duration;

use image::{GrayAlphaImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::reprocess::{self, ReprocessCounts};
use crate::types::{Dimensions, RefineParams};

/// Monotonic time source injected by the host.
///
/// The engine only ever asks "what time is it" and "how long since";
/// the associated `Instant` type stays opaque so native and embedded
/// hosts can supply whatever clock they have.
pub trait Clock {
    /// An opaque instant produced by [`now`](Self::now).
    type Instant;

    /// Capture the current instant.
    fn now(&self) -> Self::Instant;

    /// Elapsed time since a previously captured instant.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single instrumented reprocessing pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReprocessDiagnostics {
    /// Step 2: background sensitivity policy.
    pub sensitivity: StepDiagnostics,
    /// Step 3: edge refinement smoothing.
    pub edge_refinement: StepDiagnostics,
    /// Step 4: mask intent application.
    pub mask_intent: StepDiagnostics,
    /// Total wall-clock duration of the pass (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Raw per-step pixel counts.
    pub counts: ReprocessCounts,
    /// Input summary.
    pub summary: ReprocessSummary,
}

/// Timing and change count for one pipeline step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StepDiagnostics {
    /// Wall-clock duration of this step (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Pixels this step modified.
    pub pixels_changed: u64,
}

/// High-level summary of the instrumented pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReprocessSummary {
    /// Buffer width in pixels.
    pub width: u32,
    /// Buffer height in pixels.
    pub height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Effective (clamped) parameters the pass ran with.
    pub params: RefineParams,
}

impl ReprocessDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Reprocess Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Buffer: {}x{} ({} pixels)",
            self.summary.width, self.summary.height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Params: sensitivity={} edge_refinement={} show_original={}",
            self.summary.params.sensitivity,
            self.summary.params.edge_refinement,
            self.summary.params.show_original,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<20} {:>10} {:>10}  {}",
            "Step", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(72));

        let total_ms = duration_ms(self.total_duration);
        let steps: [(&str, &StepDiagnostics, String); 3] = [
            (
                "Sensitivity",
                &self.sensitivity,
                format!(
                    "candidates={} hunted={} zeroed={} faded={}",
                    self.counts.background_candidates,
                    self.counts.background_hunted,
                    self.counts.background_zeroed,
                    self.counts.background_faded,
                ),
            ),
            (
                "Edge Refinement",
                &self.edge_refinement,
                format!(
                    "candidates={} smoothed={}",
                    self.counts.edge_candidates, self.counts.edge_smoothed,
                ),
            ),
            (
                "Mask Intent",
                &self.mask_intent,
                format!(
                    "hard={} soft={} erased={}",
                    self.counts.restored_hard, self.counts.restored_soft, self.counts.erased,
                ),
            ),
        ];

        for (name, step, details) in &steps {
            let ms = duration_ms(step.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!("{name:<20} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Changed: {} sensitivity | {} edges | {} intent",
            self.sensitivity.pixels_changed,
            self.edge_refinement.pixels_changed,
            self.mask_intent.pixels_changed,
        ));

        lines.join("\n")
    }
}

/// Instrumented variant of [`recomposite`](crate::reprocess::recomposite):
/// runs the same steps in the same order, timing each against `clock`.
pub fn recomposite_with_diagnostics<C: Clock>(
    processed: &RgbaImage,
    original: &RgbaImage,
    mask: &GrayAlphaImage,
    params: &RefineParams,
    clock: &C,
) -> (RgbaImage, ReprocessDiagnostics) {
    let params = params.clamped();
    let mut counts = ReprocessCounts::default();
    let total_start = clock.now();

    let mut preview = if params.show_original {
        original.clone()
    } else {
        processed.clone()
    };

    let start = clock.now();
    reprocess::apply_background_sensitivity(&mut preview, mask, params.sensitivity, &mut counts);
    let sensitivity_duration = clock.elapsed(&start);

    let start = clock.now();
    reprocess::refine_edges(&mut preview, params.edge_refinement, &mut counts);
    let edge_duration = clock.elapsed(&start);

    let start = clock.now();
    reprocess::apply_mask_intent(&mut preview, original, processed, mask, &mut counts);
    let intent_duration = clock.elapsed(&start);

    let diagnostics = ReprocessDiagnostics {
        sensitivity: StepDiagnostics {
            duration: sensitivity_duration,
            pixels_changed: counts.background_hunted
                + counts.background_zeroed
                + counts.background_faded,
        },
        edge_refinement: StepDiagnostics {
            duration: edge_duration,
            pixels_changed: counts.edge_smoothed,
        },
        mask_intent: StepDiagnostics {
            duration: intent_duration,
            pixels_changed: counts.restored_hard + counts.restored_soft + counts.erased,
        },
        total_duration: clock.elapsed(&total_start),
        counts,
        summary: ReprocessSummary {
            width: preview.width(),
            height: preview.height(),
            pixel_count: Dimensions {
                width: preview.width(),
                height: preview.height(),
            }
            .pixel_count(),
            params,
        },
    };

    (preview, diagnostics)
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Rgba;

    use crate::sched::testing::ManualClock;

    #[test]
    fn duration_ms_converts_correctly() {
        let d = Duration::from_millis(1234);
        let ms = duration_ms(d);
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn instrumented_pass_matches_plain_recomposite() {
        let processed = RgbaImage::from_pixel(8, 8, Rgba([60, 120, 60, 140]));
        let original = RgbaImage::from_pixel(8, 8, Rgba([200, 180, 160, 255]));
        let mask = GrayAlphaImage::new(8, 8);
        let params = RefineParams {
            sensitivity: 40,
            edge_refinement: 60,
            show_original: false,
        };

        let plain = reprocess::recomposite(&processed, &original, &mask, &params);
        let clock = ManualClock::new();
        let (instrumented, diag) =
            recomposite_with_diagnostics(&processed, &original, &mask, &params, &clock);

        assert_eq!(plain.as_raw(), instrumented.as_raw());
        assert_eq!(diag.summary.pixel_count, 64);
        assert_eq!(diag.summary.params.sensitivity, 40);
    }

    #[test]
    fn step_durations_come_from_the_injected_clock() {
        let processed = RgbaImage::from_pixel(4, 4, Rgba([60, 60, 60, 140]));
        let original = RgbaImage::from_pixel(4, 4, Rgba([60, 60, 60, 255]));
        let mask = GrayAlphaImage::new(4, 4);

        let clock = ManualClock::new();
        clock.set_auto_advance(Duration::from_millis(2));
        let (_, diag) = recomposite_with_diagnostics(
            &processed,
            &original,
            &mask,
            &RefineParams::default(),
            &clock,
        );

        assert!(diag.sensitivity.duration >= Duration::from_millis(2));
        assert!(diag.total_duration >= diag.sensitivity.duration);
    }

    #[test]
    fn diagnostics_round_trip_through_json() {
        let diag = ReprocessDiagnostics {
            sensitivity: StepDiagnostics {
                duration: Duration::from_millis(3),
                pixels_changed: 12,
            },
            edge_refinement: StepDiagnostics {
                duration: Duration::from_millis(5),
                pixels_changed: 4,
            },
            mask_intent: StepDiagnostics {
                duration: Duration::from_millis(2),
                pixels_changed: 9,
            },
            total_duration: Duration::from_millis(10),
            counts: ReprocessCounts::default(),
            summary: ReprocessSummary {
                width: 16,
                height: 16,
                pixel_count: 256,
                params: RefineParams::default(),
            },
        };

        let json = serde_json::to_string(&diag).unwrap();
        let back: ReprocessDiagnostics = serde_json::from_str(&json).unwrap();
        assert_eq!(back.total_duration, Duration::from_millis(10));
        assert_eq!(back.mask_intent.pixels_changed, 9);
    }

    #[test]
    fn report_produces_nonempty_string() {
        let diag = ReprocessDiagnostics {
            sensitivity: StepDiagnostics {
                duration: Duration::from_millis(3),
                pixels_changed: 12,
            },
            edge_refinement: StepDiagnostics {
                duration: Duration::from_millis(5),
                pixels_changed: 4,
            },
            mask_intent: StepDiagnostics {
                duration: Duration::from_millis(2),
                pixels_changed: 9,
            },
            total_duration: Duration::from_millis(10),
            counts: ReprocessCounts::default(),
            summary: ReprocessSummary {
                width: 16,
                height: 16,
                pixel_count: 256,
                params: RefineParams::default(),
            },
        };

        let report = diag.report();
        assert!(report.contains("Reprocess Diagnostics Report"));
        assert!(report.contains("Edge Refinement"));
        assert!(report.contains("Mask Intent"));
    }
}
