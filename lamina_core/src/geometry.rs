// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rectangle helpers with "empty-aware" semantics.
//!
//! Layer bounds use [`kurbo::Rect`], but the compositor treats any rectangle
//! with non-positive width or height, or any non-finite coordinate, as
//! *empty*. An empty rectangle never stretches a union and never intersects
//! anything. These helpers encode that rule in one place so every layer
//! degrades the same way on degenerate geometry.

use kurbo::{Rect, Vec2};
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// A rectangle large enough to act as "no culling".
///
/// Used as the initial cull rect of a frame and as the fallback cull rect
/// below a transform that cannot be inverted.
pub const GIANT_RECT: Rect = Rect::new(-1.0e9, -1.0e9, 1.0e9, 1.0e9);

/// The canonical empty rectangle.
pub const EMPTY_RECT: Rect = Rect::ZERO;

/// Returns `true` if `r` covers no area.
///
/// NaN coordinates compare false and therefore count as empty.
#[inline]
#[must_use]
pub fn is_empty(r: Rect) -> bool {
    !(r.x1 > r.x0 && r.y1 > r.y0)
}

/// Returns `true` if every coordinate of `r` is finite.
#[inline]
#[must_use]
pub fn is_finite(r: Rect) -> bool {
    r.x0.is_finite() && r.y0.is_finite() && r.x1.is_finite() && r.y1.is_finite()
}

/// Returns `r` if it is finite and non-empty, or [`EMPTY_RECT`] otherwise.
#[inline]
#[must_use]
pub fn sanitize(r: Rect) -> Rect {
    if is_finite(r) && !is_empty(r) {
        r
    } else {
        EMPTY_RECT
    }
}

/// Union of two rectangles where empty operands are ignored.
#[must_use]
pub fn join(a: Rect, b: Rect) -> Rect {
    let a = sanitize(a);
    let b = sanitize(b);
    match (is_empty(a), is_empty(b)) {
        (true, true) => EMPTY_RECT,
        (true, false) => b,
        (false, true) => a,
        (false, false) => a.union(b),
    }
}

/// Intersection of two rectangles, or [`EMPTY_RECT`] if they do not overlap.
#[must_use]
pub fn intersect(a: Rect, b: Rect) -> Rect {
    let a = sanitize(a);
    let b = sanitize(b);
    if is_empty(a) || is_empty(b) {
        return EMPTY_RECT;
    }
    sanitize(a.intersect(b))
}

/// Returns `true` if the two rectangles share some area.
#[inline]
#[must_use]
pub fn intersects(a: Rect, b: Rect) -> bool {
    !is_empty(intersect(a, b))
}

/// Translates `r`, keeping empty rectangles empty.
#[inline]
#[must_use]
pub fn offset(r: Rect, by: Vec2) -> Rect {
    let r = sanitize(r);
    if is_empty(r) { r } else { r + by }
}

/// Grows `r` by `dx` horizontally and `dy` vertically on each side.
///
/// Negative amounts shrink; a rectangle shrunk past zero becomes empty.
#[must_use]
pub fn outset(r: Rect, dx: f64, dy: f64) -> Rect {
    let r = sanitize(r);
    if is_empty(r) {
        return r;
    }
    sanitize(Rect::new(r.x0 - dx, r.y0 - dy, r.x1 + dx, r.y1 + dy))
}

/// Rounds `r` outward to integer coordinates.
#[must_use]
pub fn round_out(r: Rect) -> Rect {
    let r = sanitize(r);
    if is_empty(r) {
        return r;
    }
    Rect::new(r.x0.floor(), r.y0.floor(), r.x1.ceil(), r.y1.ceil())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_rect_is_empty() {
        let r = Rect::new(f64::NAN, 0.0, 10.0, 10.0);
        assert!(is_empty(r));
        assert_eq!(sanitize(r), EMPTY_RECT);
    }

    #[test]
    fn inverted_rect_is_empty() {
        assert!(is_empty(Rect::new(10.0, 0.0, 0.0, 10.0)));
        assert!(is_empty(Rect::new(0.0, 0.0, 0.0, 10.0)));
    }

    #[test]
    fn join_ignores_empty_operands() {
        let a = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert_eq!(join(a, EMPTY_RECT), a);
        assert_eq!(join(EMPTY_RECT, a), a);
        // An empty rect at the origin must not pull the union toward (0, 0).
        assert_eq!(join(a, Rect::new(0.0, 0.0, 0.0, 0.0)), a);
        assert_eq!(join(EMPTY_RECT, EMPTY_RECT), EMPTY_RECT);
    }

    #[test]
    fn join_unions_non_empty() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 30.0, 20.0);
        assert_eq!(join(a, b), Rect::new(0.0, 0.0, 30.0, 20.0));
    }

    #[test]
    fn disjoint_intersection_is_empty() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(intersect(a, b), EMPTY_RECT);
        assert!(!intersects(a, b));
    }

    #[test]
    fn touching_edges_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 20.0, 10.0);
        assert!(!intersects(a, b));
    }

    #[test]
    fn round_out_expands_fractional_edges() {
        let r = Rect::new(0.5, 1.2, 9.1, 9.9);
        assert_eq!(round_out(r), Rect::new(0.0, 1.0, 10.0, 10.0));
    }

    #[test]
    fn outset_past_zero_is_empty() {
        let r = Rect::new(0.0, 0.0, 4.0, 4.0);
        assert_eq!(outset(r, -3.0, -3.0), EMPTY_RECT);
        assert_eq!(outset(r, 1.0, 2.0), Rect::new(-1.0, -2.0, 5.0, 6.0));
    }

    #[test]
    fn offset_keeps_empty_empty() {
        assert_eq!(offset(EMPTY_RECT, Vec2::new(5.0, 5.0)), EMPTY_RECT);
        assert_eq!(
            offset(Rect::new(0.0, 0.0, 1.0, 1.0), Vec2::new(5.0, 5.0)),
            Rect::new(5.0, 5.0, 6.0, 6.0)
        );
    }
}
