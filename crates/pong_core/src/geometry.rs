//! Point / Rect math and normalized ↔ view conversions
//!
//! Two coordinate spaces are in play:
//! - **normalized**: detector output, `0.0..=1.0` on both axes, origin bottom-left (y-up)
//! - **view**: pixel space of the preview surface, origin top-left (y-down)
//!
//! All region bookkeeping (ROI, throw/target regions, accumulated paths) lives in
//! view space. Detector output is converted once on entry via [`ViewTransform`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Absolute angle of the segment `self → other` against the x axis, in degrees,
    /// rounded to two decimals.
    pub fn angle_from_horizontal(&self, other: Point) -> f64 {
        let angle = (other.y - self.y).atan2(other.x - self.x);
        let deg = angle.to_degrees().abs();
        (deg * 100.0).round() / 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Axis-aligned rectangle (origin + size).
///
/// Width and height are expected to be non-negative. A rectangle with zero area
/// contains no point, which is what an unset region should behave like.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const EMPTY: Rect = Rect { origin: Point::ZERO, size: Size { width: 0.0, height: 0.0 } };

    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { origin: Point { x, y }, size: Size { width, height } }
    }

    pub fn min_x(&self) -> f64 {
        self.origin.x
    }

    pub fn min_y(&self) -> f64 {
        self.origin.y
    }

    pub fn max_x(&self) -> f64 {
        self.origin.x + self.size.width
    }

    pub fn max_y(&self) -> f64 {
        self.origin.y + self.size.height
    }

    pub fn mid_x(&self) -> f64 {
        self.origin.x + self.size.width / 2.0
    }

    pub fn width(&self) -> f64 {
        self.size.width
    }

    pub fn height(&self) -> f64 {
        self.size.height
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }

    /// Half-open containment: `[min, max)` on both axes.
    pub fn contains(&self, p: Point) -> bool {
        !self.is_empty()
            && p.x >= self.min_x()
            && p.x < self.max_x()
            && p.y >= self.min_y()
            && p.y < self.max_y()
    }

    /// True when `self` lies entirely within `outer`.
    pub fn is_inside(&self, outer: &Rect) -> bool {
        !self.is_empty()
            && !outer.is_empty()
            && self.min_x() >= outer.min_x()
            && self.min_y() >= outer.min_y()
            && self.max_x() <= outer.max_x()
            && self.max_y() <= outer.max_y()
    }

    /// Smallest rectangle covering both. An empty operand is ignored.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let min_x = self.min_x().min(other.min_x());
        let min_y = self.min_y().min(other.min_y());
        let max_x = self.max_x().max(other.max_x());
        let max_y = self.max_y().max(other.max_y());
        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Shrinks by `dx`/`dy` on every side (negative values grow the rect).
    pub fn inset(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(
            self.origin.x + dx,
            self.origin.y + dy,
            (self.size.width - 2.0 * dx).max(0.0),
            (self.size.height - 2.0 * dy).max(0.0),
        )
    }

    /// Bounding box of a point set. `None` for an empty iterator.
    ///
    /// A single point produces a zero-area rect at that point.
    pub fn bounding(points: impl IntoIterator<Item = Point>) -> Option<Rect> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in iter {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }
}

/// Converts between normalized detector space and view space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub size: Size,
}

impl ViewTransform {
    pub fn new(size: Size) -> Self {
        Self { size }
    }

    /// Flip the vertical axis, then scale to the view bounds.
    pub fn to_view(&self, p: Point) -> Point {
        Point::new(p.x * self.size.width, (1.0 - p.y) * self.size.height)
    }

    /// Inverse of [`to_view`](Self::to_view).
    pub fn to_normalized(&self, p: Point) -> Point {
        if self.size.is_empty() {
            return Point::ZERO;
        }
        Point::new(p.x / self.size.width, 1.0 - p.y / self.size.height)
    }

    /// A normalized rect's origin is its bottom-left corner; the flipped
    /// view rect's origin is its top-left.
    pub fn rect_to_view(&self, r: Rect) -> Rect {
        Rect::new(
            r.origin.x * self.size.width,
            (1.0 - r.origin.y - r.size.height) * self.size.height,
            r.size.width * self.size.width,
            r.size.height * self.size.height,
        )
    }
}

// ========== Tests ==========
