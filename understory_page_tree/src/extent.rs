// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Query-space rectangles and their quadrant split.

use kurbo::{Point, Rect};

/// Axis-aligned rectangle in query-space coordinates.
///
/// The y axis grows north, as in projected map coordinates, so `min_y` is the
/// southern edge. Inputs are assumed finite; [`Extent::is_degenerate`] reports
/// extents that cannot be split.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Extent {
    /// Minimum x (west)
    pub min_x: f64,
    /// Minimum y (south)
    pub min_y: f64,
    /// Maximum x (east)
    pub max_x: f64,
    /// Maximum y (north)
    pub max_y: f64,
}

/// One of the four children produced by [`Extent::split`].
///
/// The declaration order is the split order and therefore the order in which
/// siblings appear in a frontier.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Quadrant {
    /// `(min_x, min_y)` to the center.
    SouthWest,
    /// `(center_x, min_y)` to `(max_x, center_y)`.
    SouthEast,
    /// `(min_x, center_y)` to `(center_x, max_y)`.
    NorthWest,
    /// The center to `(max_x, max_y)`.
    NorthEast,
}

impl Quadrant {
    /// All quadrants in split order.
    pub const ALL: [Self; 4] = [
        Self::SouthWest,
        Self::SouthEast,
        Self::NorthWest,
        Self::NorthEast,
    ];

    /// Position of this quadrant in the split order.
    pub const fn index(self) -> usize {
        match self {
            Self::SouthWest => 0,
            Self::SouthEast => 1,
            Self::NorthWest => 2,
            Self::NorthEast => 3,
        }
    }
}

impl Extent {
    /// Create an extent from min/max corners.
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Create an extent from a Kurbo rectangle, normalizing its corners.
    pub fn from_rect(rect: Rect) -> Self {
        let r = rect.abs();
        Self::new(r.x0, r.y0, r.x1, r.y1)
    }

    /// This extent as a Kurbo rectangle.
    pub const fn to_rect(&self) -> Rect {
        Rect::new(self.min_x, self.min_y, self.max_x, self.max_y)
    }

    /// Width along x.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height along y.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Area; zero for degenerate extents.
    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Geometric center.
    pub fn center(&self) -> Point {
        Point::new(
            0.5 * (self.min_x + self.max_x),
            0.5 * (self.min_y + self.max_y),
        )
    }

    /// Whether this extent has no area or non-finite coordinates.
    pub fn is_degenerate(&self) -> bool {
        !(self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite())
            || self.max_x <= self.min_x
            || self.max_y <= self.min_y
    }

    /// Inclusive containment: points on any edge are inside.
    ///
    /// Sibling quadrants share their split lines, so a point on one is
    /// contained by every quadrant touching it.
    pub fn contains(&self, pt: Point) -> bool {
        self.min_x <= pt.x && pt.x <= self.max_x && self.min_y <= pt.y && pt.y <= self.max_y
    }

    /// Whether `other` lies entirely within this extent (edges inclusive).
    pub fn contains_extent(&self, other: &Self) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && other.max_x <= self.max_x
            && other.max_y <= self.max_y
    }

    /// The overlapping region, or `None` when the extents are disjoint.
    ///
    /// Extents that only touch along an edge intersect in a zero-area extent.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let r = Self::new(
            self.min_x.max(other.min_x),
            self.min_y.max(other.min_y),
            self.max_x.min(other.max_x),
            self.max_y.min(other.max_y),
        );
        (r.min_x <= r.max_x && r.min_y <= r.max_y).then_some(r)
    }

    /// Squared distance from `pt` to the closest point of this extent.
    pub fn distance_squared_to(&self, pt: Point) -> f64 {
        let dx = (self.min_x - pt.x).max(pt.x - self.max_x).max(0.0);
        let dy = (self.min_y - pt.y).max(pt.y - self.max_y).max(0.0);
        dx * dx + dy * dy
    }

    /// Split at the center into four children in [`Quadrant::ALL`] order.
    ///
    /// The children exactly partition `self` and only share boundaries.
    /// Returns `None` if `self` is degenerate or too small to halve at `f64`
    /// resolution.
    pub fn split(&self) -> Option<[Self; 4]> {
        if self.is_degenerate() {
            return None;
        }
        let c = self.center();
        let halves_x = self.min_x < c.x && c.x < self.max_x;
        let halves_y = self.min_y < c.y && c.y < self.max_y;
        if !(halves_x && halves_y) {
            return None;
        }
        Some([
            Self::new(self.min_x, self.min_y, c.x, c.y),
            Self::new(c.x, self.min_y, self.max_x, c.y),
            Self::new(self.min_x, c.y, c.x, self.max_y),
            Self::new(c.x, c.y, self.max_x, self.max_y),
        ])
    }

    /// The quadrant of [`Extent::split`] containing `pt`.
    ///
    /// Points on a shared edge belong to the first quadrant in split order.
    pub fn quadrant_of(&self, pt: Point) -> Option<Quadrant> {
        if !self.contains(pt) {
            return None;
        }
        let c = self.center();
        let east = pt.x > c.x;
        let north = pt.y > c.y;
        Some(match (east, north) {
            (false, false) => Quadrant::SouthWest,
            (true, false) => Quadrant::SouthEast,
            (false, true) => Quadrant::NorthWest,
            (true, true) => Quadrant::NorthEast,
        })
    }
}

impl From<Rect> for Extent {
    fn from(rect: Rect) -> Self {
        Self::from_rect(rect)
    }
}

impl From<Extent> for Rect {
    fn from(extent: Extent) -> Self {
        extent.to_rect()
    }
}

impl core::fmt::Display for Extent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "({}, {})-({}, {})",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}
