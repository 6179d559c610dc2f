//! Pure calculation functions for mapping crops onto pixels.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::PixelRect;
use crate::geometry::CropRect;

/// Snap a fractional crop rectangle to whole source pixels.
///
/// Each edge is rounded to the nearest pixel boundary and clamped to the
/// source, and the region keeps at least one pixel in each direction. A
/// degenerate source (zero width or height) yields a zero-sized region.
///
/// # Examples
/// ```
/// # use iconcut::geometry::CropRect;
/// # use iconcut::imaging::{pixel_rect, PixelRect};
/// let r = pixel_rect(&CropRect::new(49.6, 0.2, 300.0, 300.0), 400, 300);
/// assert_eq!(r, PixelRect { x: 50, y: 0, width: 300, height: 300 });
/// ```
pub fn pixel_rect(crop: &CropRect, source_w: u32, source_h: u32) -> PixelRect {
    let (x, width) = snap_axis(crop.x, crop.width, source_w);
    let (y, height) = snap_axis(crop.y, crop.height, source_h);
    PixelRect {
        x,
        y,
        width,
        height,
    }
}

/// Round `[start, start + len]` to pixel edges within `[0, limit]`.
fn snap_axis(start: f64, len: f64, limit: u32) -> (u32, u32) {
    if limit == 0 {
        return (0, 0);
    }
    let limit_f = f64::from(limit);
    let clamp = |v: f64| {
        if v.is_nan() {
            0.0
        } else {
            v.round().clamp(0.0, limit_f)
        }
    };
    let lo = clamp(start);
    let hi = clamp(start + len);
    let lo = lo.min(limit_f - 1.0) as u32;
    let hi = (hi as u32).max(lo + 1);
    (lo, hi - lo)
}
