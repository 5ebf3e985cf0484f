//! Cohen-Sutherland segment clipping with boundary snapping.
//!
//! Clips world-pixel segments to an axis-aligned rectangle. Accepted
//! endpoints within [`SNAP_EPSILON`] of an edge are snapped exactly onto
//! it, so both tiles adjacent to a shared edge round a boundary crossing
//! to the same world pixel.

use crate::mercator::PixelRect;

/// Tolerance for edge comparisons and boundary snapping, in world pixels.
pub const SNAP_EPSILON: f64 = 1e-9;

const INSIDE: u8 = 0;
const LEFT: u8 = 1;
const RIGHT: u8 = 2;
const ABOVE: u8 = 4; // y < min_y (world-pixel y grows southward)
const BELOW: u8 = 8;

#[inline]
fn outcode(rect: &PixelRect, x: f64, y: f64) -> u8 {
    let mut code = INSIDE;
    if x < rect.min_x - SNAP_EPSILON {
        code |= LEFT;
    } else if x > rect.max_x + SNAP_EPSILON {
        code |= RIGHT;
    }
    if y < rect.min_y - SNAP_EPSILON {
        code |= ABOVE;
    } else if y > rect.max_y + SNAP_EPSILON {
        code |= BELOW;
    }
    code
}

#[inline]
fn snap(value: f64, edge: f64) -> f64 {
    if (value - edge).abs() < SNAP_EPSILON {
        edge
    } else {
        value
    }
}

#[inline]
fn snap_point(rect: &PixelRect, (x, y): (f64, f64)) -> (f64, f64) {
    let x = snap(snap(x, rect.min_x), rect.max_x);
    let y = snap(snap(y, rect.min_y), rect.max_y);
    (x, y)
}

/// Clip the segment `p0 -> p1` to `rect`.
///
/// Returns `None` when the segment lies entirely outside, otherwise the
/// clipped segment with both endpoints inside the rectangle (inclusive).
pub fn clip_segment(
    rect: &PixelRect,
    mut p0: (f64, f64),
    mut p1: (f64, f64),
) -> Option<((f64, f64), (f64, f64))> {
    let mut code0 = outcode(rect, p0.0, p0.1);
    let mut code1 = outcode(rect, p1.0, p1.1);

    loop {
        if code0 | code1 == INSIDE {
            return Some((snap_point(rect, p0), snap_point(rect, p1)));
        }
        if code0 & code1 != INSIDE {
            return None;
        }

        let code_out = if code0 != INSIDE { code0 } else { code1 };
        let (dx, dy) = (p1.0 - p0.0, p1.1 - p0.1);

        let (x, y) = if code_out & ABOVE != 0 {
            let x = if dy.abs() > SNAP_EPSILON {
                p0.0 + dx * (rect.min_y - p0.1) / dy
            } else {
                p0.0
            };
            (x, rect.min_y)
        } else if code_out & BELOW != 0 {
            let x = if dy.abs() > SNAP_EPSILON {
                p0.0 + dx * (rect.max_y - p0.1) / dy
            } else {
                p0.0
            };
            (x, rect.max_y)
        } else if code_out & RIGHT != 0 {
            let y = if dx.abs() > SNAP_EPSILON {
                p0.1 + dy * (rect.max_x - p0.0) / dx
            } else {
                p0.1
            };
            (rect.max_x, y)
        } else {
            let y = if dx.abs() > SNAP_EPSILON {
                p0.1 + dy * (rect.min_x - p0.0) / dx
            } else {
                p0.1
            };
            (rect.min_x, y)
        };

        if code_out == code0 {
            p0 = (x, y);
            code0 = outcode(rect, p0.0, p0.1);
        } else {
            p1 = (x, y);
            code1 = outcode(rect, p1.0, p1.1);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
