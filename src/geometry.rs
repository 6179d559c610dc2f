//! Rectangle math for the crop selection.
//!
//! Everything here is pure and infallible: out-of-range input is clamped,
//! never rejected. Coordinates are `f64` source pixels; a rectangle can be
//! fractional while it is being dragged and is only rounded for display
//! ([`CropRect::rounded`]) or when the pipeline maps it onto whole pixels.

use serde::{Deserialize, Serialize};

/// A position in some 2D coordinate space (rendered or source pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// The selected region, in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// True when `p` lies inside the rectangle and not on its border.
    pub fn contains_strictly(&self, p: Point) -> bool {
        p.x > self.x && p.x < self.right() && p.y > self.y && p.y < self.bottom()
    }

    /// True when the rectangle sits inside `[0, w] x [0, h]` and both sides
    /// are at least `min_dim`.
    pub fn is_valid_within(&self, min_dim: f64, w: f64, h: f64) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.right() <= w
            && self.bottom() <= h
            && self.width >= min_dim
            && self.height >= min_dim
    }

    /// Whole-pixel version for display, `(x, y, width, height)`.
    pub fn rounded(&self) -> (i64, i64, i64, i64) {
        (
            self.x.round() as i64,
            self.y.round() as i64,
            self.width.round() as i64,
            self.height.round() as i64,
        )
    }
}

/// One of the eight resize grips around the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    N,
    S,
    E,
    W,
    NE,
    NW,
    SE,
    SW,
}

impl Handle {
    /// Corners first: hit-testing walks this order, so a corner wins when
    /// its hit box overlaps an edge midpoint on a small selection.
    pub const ALL: [Handle; 8] = [
        Handle::NW,
        Handle::NE,
        Handle::SW,
        Handle::SE,
        Handle::N,
        Handle::S,
        Handle::W,
        Handle::E,
    ];

    pub fn moves_left(self) -> bool {
        matches!(self, Handle::W | Handle::NW | Handle::SW)
    }

    pub fn moves_right(self) -> bool {
        matches!(self, Handle::E | Handle::NE | Handle::SE)
    }

    pub fn moves_top(self) -> bool {
        matches!(self, Handle::N | Handle::NE | Handle::NW)
    }

    pub fn moves_bottom(self) -> bool {
        matches!(self, Handle::S | Handle::SE | Handle::SW)
    }

    /// Where this grip sits on `rect`.
    pub fn anchor_on(self, rect: &CropRect) -> Point {
        let x = if self.moves_left() {
            rect.x
        } else if self.moves_right() {
            rect.right()
        } else {
            rect.x + rect.width / 2.0
        };
        let y = if self.moves_top() {
            rect.y
        } else if self.moves_bottom() {
            rect.bottom()
        } else {
            rect.y + rect.height / 2.0
        };
        Point::new(x, y)
    }
}

/// Replace NaN with `fallback`; infinities pass through and get clamped later.
fn finite_or(v: f64, fallback: f64) -> f64 {
    if v.is_nan() { fallback } else { v }
}

/// Clamp `rect`'s position so it lies inside `bounds_w x bounds_h`.
///
/// `x` ends up in `[0, bounds_w - width]` and `y` in `[0, bounds_h - height]`.
/// A rectangle larger than the bounds is shrunk to them first, so the result
/// is always contained.
pub fn clamp_rect_to_bounds(rect: CropRect, bounds_w: f64, bounds_h: f64) -> CropRect {
    let bounds_w = finite_or(bounds_w, 0.0).max(0.0);
    let bounds_h = finite_or(bounds_h, 0.0).max(0.0);
    let width = finite_or(rect.width, 0.0).max(0.0).min(bounds_w);
    let height = finite_or(rect.height, 0.0).max(0.0).min(bounds_h);
    CropRect {
        x: finite_or(rect.x, 0.0).min(bounds_w - width).max(0.0),
        y: finite_or(rect.y, 0.0).min(bounds_h - height).max(0.0),
        width,
        height,
    }
}

/// Floor both sides at `min_dim`, cap them at the bounds, then clamp.
///
/// `min_dim` itself is capped at the bounds, so a source smaller than the
/// minimum still yields a rectangle covering the whole source.
pub fn constrain(rect: CropRect, min_dim: f64, bounds_w: f64, bounds_h: f64) -> CropRect {
    let min_w = min_dim.min(bounds_w);
    let min_h = min_dim.min(bounds_h);
    let sized = CropRect {
        width: finite_or(rect.width, 0.0).max(min_w),
        height: finite_or(rect.height, 0.0).max(min_h),
        ..rect
    };
    clamp_rect_to_bounds(sized, bounds_w, bounds_h)
}

/// Resize `rect` by dragging `handle` through `(dx, dy)` source pixels.
///
/// The edges named by the handle move; the opposite edges stay where they
/// are, so dragging a corner never moves the diagonally opposite corner and
/// dragging an edge never changes the other dimension. A moving edge stops
/// at the image border and at `min_dim` from its opposite edge.
pub fn apply_resize(
    rect: CropRect,
    handle: Handle,
    dx: f64,
    dy: f64,
    min_dim: f64,
    bounds_w: f64,
    bounds_h: f64,
) -> CropRect {
    let start = constrain(rect, min_dim, bounds_w, bounds_h);
    let min_w = min_dim.min(bounds_w);
    let min_h = min_dim.min(bounds_h);
    let dx = finite_or(dx, 0.0);
    let dy = finite_or(dy, 0.0);

    let mut left = start.x;
    let mut right = start.right();
    let mut top = start.y;
    let mut bottom = start.bottom();

    if handle.moves_left() {
        left = (left + dx).min(right - min_w).max(0.0);
    }
    if handle.moves_right() {
        right = (right + dx).max(left + min_w).min(bounds_w);
    }
    if handle.moves_top() {
        top = (top + dy).min(bottom - min_h).max(0.0);
    }
    if handle.moves_bottom() {
        bottom = (bottom + dy).max(top + min_h).min(bounds_h);
    }

    clamp_rect_to_bounds(
        CropRect::new(left, top, right - left, bottom - top),
        bounds_w,
        bounds_h,
    )
}

/// The largest square that fits, centered.
///
/// ```
/// # use iconcut::geometry::{centered_square, CropRect};
/// assert_eq!(centered_square(400.0, 300.0), CropRect::new(50.0, 0.0, 300.0, 300.0));
/// ```
pub fn centered_square(width: f64, height: f64) -> CropRect {
    let side = width.min(height).max(0.0);
    CropRect::new((width - side) / 2.0, (height - side) / 2.0, side, side)
}
