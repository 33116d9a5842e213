// Geometry primitives shared by the locator, calculator and applier.
// Point/Size mirror CoreGraphics types (f64 fields) so platform layers can
// convert AXValue payloads without rounding.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A point in screen coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// Construct a point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1},{:.1})", self.x, self.y)
    }
}

/// A width/height pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// Width in points.
    pub width: f64,
    /// Height in points.
    pub height: f64,
}

impl Size {
    /// Construct a size.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when both dimensions are strictly positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}x{:.0}", self.width, self.height)
    }
}

/// Axis-aligned rectangle. `y` grows upward in bottom-left coordinates and
/// downward in AX top-left coordinates; callers know which space they hold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Origin x.
    pub x: f64,
    /// Origin y.
    pub y: f64,
    /// Width.
    pub w: f64,
    /// Height.
    pub h: f64,
}

impl Rect {
    /// Construct a rectangle from origin and extent.
    #[must_use]
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Build a rectangle from an origin point and a size.
    #[must_use]
    pub const fn from_parts(origin: Point, size: Size) -> Self {
        Self {
            x: origin.x,
            y: origin.y,
            w: size.width,
            h: size.height,
        }
    }

    /// Left edge.
    #[inline]
    pub fn left(&self) -> f64 {
        self.x
    }
    /// Right edge.
    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.w
    }
    /// Lower y edge.
    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y
    }
    /// Upper y edge.
    #[inline]
    pub fn top(&self) -> f64 {
        self.y + self.h
    }

    /// Origin as a point.
    #[must_use]
    pub const fn origin(&self) -> Point {
        Point {
            x: self.x,
            y: self.y,
        }
    }

    /// Extent as a size.
    #[must_use]
    pub const fn size(&self) -> Size {
        Size {
            width: self.w,
            height: self.h,
        }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.1},{:.1},{:.1},{:.1})",
            self.x, self.y, self.w, self.h
        )
    }
}

impl From<(Point, Size)> for Rect {
    fn from(v: (Point, Size)) -> Self {
        Self::from_parts(v.0, v.1)
    }
}

/// Scalar equality within `eps`.
#[inline]
pub fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps
}

/// Size equality within `eps` on both axes.
#[inline]
pub fn size_approx_eq(a: Size, b: Size, eps: f64) -> bool {
    approx_eq(a.width, b.width, eps) && approx_eq(a.height, b.height, eps)
}

/// Convert a bottom-left-origin point for content of `size` into the AX
/// top-left coordinate space anchored at the primary screen.
#[inline]
pub fn to_ax_origin(p: Point, size: Size, primary_height: f64) -> Point {
    Point {
        x: p.x,
        y: primary_height - (p.y + size.height),
    }
}

/// Inverse of [`to_ax_origin`].
#[inline]
pub fn from_ax_origin(p: Point, size: Size, primary_height: f64) -> Point {
    Point {
        x: p.x,
        y: primary_height - p.y - size.height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approx_eq_works() {
        assert!(approx_eq(1.0, 1.0, 0.0));
        assert!(approx_eq(1.0, 1.000_5, 0.001));
        assert!(!approx_eq(1.0, 1.01, 0.001));
    }

    #[test]
    fn rect_edges() {
        let r = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(r.left(), 10.0);
        assert_eq!(r.right(), 40.0);
        assert_eq!(r.bottom(), 20.0);
        assert_eq!(r.top(), 60.0);
        assert_eq!(r.size(), Size::new(30.0, 40.0));
    }

    #[test]
    fn ax_flip_is_an_involution() {
        let size = Size::new(300.0, 80.0);
        let p = Point::new(1600.0, 50.0);
        let ax = to_ax_origin(p, size, 1080.0);
        assert_eq!(ax, Point::new(1600.0, 950.0));
        assert_eq!(from_ax_origin(ax, size, 1080.0), p);
    }
}
