//! Screen-space to buffer-space coordinate mapping.
//!
//! Pointer events arrive in client (screen) coordinates; tools operate
//! in the intrinsic pixel space of the layer buffers. The mapping
//! depends on the interactive element's on-screen rectangle, the
//! intrinsic buffer size, and the zoom factor -- all of which the host
//! must refresh whenever the container resizes or zoom changes. A
//! stale transform produces misaligned strokes and is a correctness
//! bug, not a cosmetic one.

use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, Point};

/// The interactive element's on-screen bounding rectangle, in client
/// (CSS pixel) coordinates, *before* zoom is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayRect {
    /// Left edge in client coordinates.
    pub left: f64,
    /// Top edge in client coordinates.
    pub top: f64,
    /// Unzoomed display width.
    pub width: f64,
    /// Unzoomed display height.
    pub height: f64,
}

/// Mapping between client coordinates and buffer pixel coordinates.
///
/// Pure value type: both directions are pure functions of the stored
/// rect, buffer dimensions, and zoom. Replace the whole transform via
/// [`crate::session::EditSession::set_view`] on resize or zoom change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    rect: DisplayRect,
    buffer: Dimensions,
    zoom: f64,
}

impl ViewTransform {
    /// Create a transform. Non-positive zoom values are snapped to 1.0
    /// so the mapping stays finite.
    #[must_use]
    pub fn new(rect: DisplayRect, buffer: Dimensions, zoom: f64) -> Self {
        let zoom = if zoom > 0.0 { zoom } else { 1.0 };
        Self { rect, buffer, zoom }
    }

    /// The intrinsic buffer dimensions this transform maps into.
    #[must_use]
    pub const fn buffer(&self) -> Dimensions {
        self.buffer
    }

    /// Map a client-space point to floating-point buffer coordinates.
    ///
    /// Returns `None` when the display rect or buffer is degenerate
    /// (zero-sized), since no meaningful mapping exists. The result is
    /// *not* clamped to the buffer: tools decide whether to drop or
    /// clamp out-of-range points.
    #[must_use]
    pub fn to_buffer(&self, client_x: f64, client_y: f64) -> Option<Point> {
        let display_w = self.rect.width * self.zoom;
        let display_h = self.rect.height * self.zoom;
        if display_w <= 0.0 || display_h <= 0.0 || self.buffer.is_empty() {
            return None;
        }

        let x = (client_x - self.rect.left) * f64::from(self.buffer.width) / display_w;
        let y = (client_y - self.rect.top) * f64::from(self.buffer.height) / display_h;
        Some(Point::new(x, y))
    }

    /// Map buffer coordinates back to client space (inverse of
    /// [`to_buffer`](Self::to_buffer)).
    #[must_use]
    pub fn to_client(&self, point: Point) -> Option<(f64, f64)> {
        if self.buffer.is_empty() {
            return None;
        }
        let display_w = self.rect.width * self.zoom;
        let display_h = self.rect.height * self.zoom;
        let x = point.x * display_w / f64::from(self.buffer.width) + self.rect.left;
        let y = point.y * display_h / f64::from(self.buffer.height) + self.rect.top;
        Some((x, y))
    }

    /// Whether a buffer-space point lies within `[0, width) x [0, height)`.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= 0.0
            && point.y >= 0.0
            && point.x < f64::from(self.buffer.width)
            && point.y < f64::from(self.buffer.height)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const BUFFER: Dimensions = Dimensions {
        width: 800,
        height: 600,
    };

    fn transform(zoom: f64) -> ViewTransform {
        ViewTransform::new(
            DisplayRect {
                left: 100.0,
                top: 50.0,
                width: 400.0,
                height: 300.0,
            },
            BUFFER,
            zoom,
        )
    }

    #[test]
    fn maps_rect_origin_to_buffer_origin() {
        let t = transform(1.0);
        let p = t.to_buffer(100.0, 50.0).unwrap();
        assert!(p.x.abs() < 1e-9);
        assert!(p.y.abs() < 1e-9);
    }

    #[test]
    fn maps_display_extent_to_buffer_extent() {
        let t = transform(1.0);
        // Bottom-right corner of the display rect maps to (800, 600).
        let p = t.to_buffer(500.0, 350.0).unwrap();
        assert!((p.x - 800.0).abs() < 1e-9);
        assert!((p.y - 600.0).abs() < 1e-9);
    }

    #[test]
    fn zoom_scales_the_display_rect() {
        let t = transform(2.0);
        // At 2x zoom the same client offset covers half the buffer.
        let p = t.to_buffer(500.0, 350.0).unwrap();
        assert!((p.x - 400.0).abs() < 1e-9);
        assert!((p.y - 300.0).abs() < 1e-9);
    }

    #[test]
    fn round_trip_within_tolerance() {
        let t = transform(1.5);
        for &(cx, cy) in &[(123.4, 87.6), (100.0, 50.0), (457.0, 312.9)] {
            let buf = t.to_buffer(cx, cy).unwrap();
            let (bx, by) = t.to_client(buf).unwrap();
            assert!((bx - cx).abs() < 1e-9, "x: {bx} != {cx}");
            assert!((by - cy).abs() < 1e-9, "y: {by} != {cy}");
        }
    }

    #[test]
    fn degenerate_rect_yields_none() {
        let t = ViewTransform::new(
            DisplayRect {
                left: 0.0,
                top: 0.0,
                width: 0.0,
                height: 300.0,
            },
            BUFFER,
            1.0,
        );
        assert!(t.to_buffer(10.0, 10.0).is_none());
    }

    #[test]
    fn non_positive_zoom_snaps_to_identity() {
        let t = ViewTransform::new(
            DisplayRect {
                left: 0.0,
                top: 0.0,
                width: 800.0,
                height: 600.0,
            },
            BUFFER,
            0.0,
        );
        let p = t.to_buffer(400.0, 300.0).unwrap();
        assert!((p.x - 400.0).abs() < 1e-9);
        assert!((p.y - 300.0).abs() < 1e-9);
    }

    #[test]
    fn contains_is_half_open() {
        let t = transform(1.0);
        assert!(t.contains(Point::new(0.0, 0.0)));
        assert!(t.contains(Point::new(799.9, 599.9)));
        assert!(!t.contains(Point::new(800.0, 0.0)));
        assert!(!t.contains(Point::new(0.0, -0.1)));
    }
}
