//! Flood-fill "smart background" selection.
//!
//! Region-grows a mask edit from a seed pixel: breadth-first over
//! 4-connected neighbors in the *original* image, selecting pixels
//! whose Euclidean RGB distance from the seed color is within the
//! user's tolerance. The erase and restore variants differ only in
//! which intent mode they write, not in the region-growing logic.
//!
//! A hard cap bounds the number of pixels examined so a near-uniform
//! image cannot stall the UI; hitting the cap truncates the fill
//! rather than erroring.

use std::collections::VecDeque;

use image::{GrayAlphaImage, RgbaImage};

use crate::layers::intent;
use crate::types::Point;

/// Hard cap on pixels examined per fill. Exceeding it truncates the
/// fill -- a deliberate bound, not an error.
pub const MAX_EXAMINED: usize = 10_000;

/// Counts from one flood-fill run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillReport {
    /// Pixels written into the mask.
    pub selected: usize,
    /// Pixels dequeued and color-tested (including the seed).
    pub examined: usize,
    /// Whether the fill stopped at [`MAX_EXAMINED`] with work left.
    pub truncated: bool,
}

/// Flood-fill intent into the mask starting at `seed`.
///
/// `tolerance` is a percentage of the 255 color-distance range
/// (1–50 from the UI); `mode` is [`intent::MODE_ERASE`] or
/// [`intent::MODE_RESTORE`]. The seed pixel itself is always selected
/// regardless of tolerance. Out-of-bounds seeds yield an empty report.
pub fn fill(
    original: &RgbaImage,
    mask: &mut GrayAlphaImage,
    seed: Point,
    tolerance: u8,
    mode: u8,
) -> FillReport {
    let (width, height) = (original.width(), original.height());
    let Some((seed_x, seed_y)) = round_to_pixel(seed, width, height) else {
        return FillReport::default();
    };

    let threshold = f64::from(tolerance) * 255.0 / 100.0;
    let threshold_sq = threshold * threshold;
    let seed_color = original.get_pixel(seed_x, seed_y).0;

    let mut visited = vec![false; width as usize * height as usize];
    let flat = |x: u32, y: u32| y as usize * width as usize + x as usize;

    let mut report = FillReport {
        selected: 1,
        examined: 1,
        truncated: false,
    };

    // The seed is always included, bypassing the tolerance test.
    mask.get_pixel_mut(seed_x, seed_y).0 = [mode, intent::FULL];
    visited[flat(seed_x, seed_y)] = true;

    let mut queue: VecDeque<(u32, u32)> = VecDeque::new();
    enqueue_neighbors(seed_x, seed_y, width, height, &mut visited, &mut queue);

    while let Some((x, y)) = queue.pop_front() {
        if report.examined >= MAX_EXAMINED {
            report.truncated = true;
            break;
        }
        report.examined += 1;

        if color_distance_sq(original.get_pixel(x, y).0, seed_color) <= threshold_sq {
            mask.get_pixel_mut(x, y).0 = [mode, intent::FULL];
            report.selected += 1;
            enqueue_neighbors(x, y, width, height, &mut visited, &mut queue);
        }
    }

    report
}

/// Squared Euclidean distance between two RGB colors (alpha ignored).
fn color_distance_sq(a: [u8; 4], b: [u8; 4]) -> f64 {
    let dr = f64::from(a[0]) - f64::from(b[0]);
    let dg = f64::from(a[1]) - f64::from(b[1]);
    let db = f64::from(a[2]) - f64::from(b[2]);
    db.mul_add(db, dr.mul_add(dr, dg * dg))
}

/// Round a buffer-space point to integer pixel coordinates, or `None`
/// if it lands outside the buffer.
fn round_to_pixel(point: Point, width: u32, height: u32) -> Option<(u32, u32)> {
    let x = point.x.round();
    let y = point.y.round();
    if x < 0.0 || y < 0.0 || x >= f64::from(width) || y >= f64::from(height) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let pixel = (x as u32, y as u32);
    Some(pixel)
}

/// Push the unvisited in-bounds 4-neighbors of `(x, y)`, marking them
/// visited at enqueue time so no pixel is queued twice.
fn enqueue_neighbors(
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    visited: &mut [bool],
    queue: &mut VecDeque<(u32, u32)>,
) {
    let flat = |x: u32, y: u32| y as usize * width as usize + x as usize;
    let mut push = |nx: u32, ny: u32| {
        let idx = flat(nx, ny);
        if !visited[idx] {
            visited[idx] = true;
            queue.push_back((nx, ny));
        }
    };

    if x > 0 {
        push(x - 1, y);
    }
    if x + 1 < width {
        push(x + 1, y);
    }
    if y > 0 {
        push(x, y - 1);
    }
    if y + 1 < height {
        push(x, y + 1);
    }
}
