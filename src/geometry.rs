//! Poses and bounding boxes on the turtle's plane.
//!
//! Every summary in the table is expressed in its own local frame: the
//! turtle starts at the origin facing heading 0 (along +x).  Placing a
//! summary into a parent frame means rotating it by the parent's
//! current heading and translating it by the parent's position.

use itertools::{Itertools, MinMaxResult};
use std::f64::consts::PI;

const FULL_TURN: f64 = 2.0 * PI;

/// Bring a heading into `(-2π, 2π)`, keeping its sign.
pub fn normalize_heading(heading: f64) -> f64 {
    heading % FULL_TURN
}

/// Map a vector from a child frame into a parent frame whose turtle is
/// facing `heading`.  The coefficients are those of a rotation by
/// `-heading` written with the sine terms transposed, which amounts to
/// turning the vector counter-clockwise by `heading`: the child's
/// `(1, 0)` lands on `(cos heading, sin heading)`, exactly where a
/// forward move would have taken it.
#[inline]
pub fn rotate(x: f64, y: f64, heading: f64) -> (f64, f64) {
    let (sin, cos) = (-heading).sin_cos();
    (cos * x + sin * y, -sin * x + cos * y)
}

/// Where the turtle is and which way it faces.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct Pose {
    /// Position along the x axis.
    pub x: f64,
    /// Position along the y axis.
    pub y: f64,
    /// Heading in radians, counter-clockwise from +x.
    pub heading: f64,
}

impl Pose {
    /// At the origin, facing +x.
    pub const ORIGIN: Pose = Pose {
        x: 0.0,
        y: 0.0,
        heading: 0.0,
    };

    /// Construct a pose.
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Pose { x, y, heading }
    }

    /// Take one unit step in the direction the turtle is facing.
    #[inline]
    pub fn advance(&mut self) {
        let (sin, cos) = self.heading.sin_cos();
        self.x += cos;
        self.y += sin;
    }

    /// The same pose with its heading normalized.
    pub fn normalized(self) -> Self {
        Pose {
            heading: normalize_heading(self.heading),
            ..self
        }
    }
}

/// An axis-aligned box.  Boxes built by the table always contain the
/// local origin, which is where every drawing begins.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    /// Left edge.
    pub min_x: f64,
    /// Right edge.
    pub max_x: f64,
    /// Bottom edge.
    pub min_y: f64,
    /// Top edge.
    pub max_y: f64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        BoundingBox::ORIGIN
    }
}

impl BoundingBox {
    /// The degenerate box around the origin.
    pub const ORIGIN: BoundingBox = BoundingBox {
        min_x: 0.0,
        max_x: 0.0,
        min_y: 0.0,
        max_y: 0.0,
    };

    /// Grow the box to cover a point.
    pub fn include(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }

    /// Grow the box to cover another box.
    pub fn union(&mut self, other: &BoundingBox) {
        self.include(other.min_x, other.min_y);
        self.include(other.max_x, other.max_y);
    }

    /// Does the box cover the point, give or take `epsilon`?
    pub fn contains(&self, x: f64, y: f64, epsilon: f64) -> bool {
        x >= self.min_x - epsilon
            && x <= self.max_x + epsilon
            && y >= self.min_y - epsilon
            && y <= self.max_y + epsilon
    }

    /// Horizontal extent.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Vertical extent.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// The four corners.
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.max_x, self.min_y),
            (self.min_x, self.min_y),
            (self.max_x, self.max_y),
            (self.min_x, self.max_y),
        ]
    }

    /// Place this box, expressed in a child frame, into the parent
    /// frame at `pose`.  The corners are rotated, re-boxed, and shifted.
    pub fn placed_at(&self, pose: &Pose) -> BoundingBox {
        let rotated: Vec<(f64, f64)> = self
            .corners()
            .iter()
            .map(|&(x, y)| rotate(x, y, pose.heading))
            .collect();
        let (min_x, max_x) = span(rotated.iter().map(|c| c.0));
        let (min_y, max_y) = span(rotated.iter().map(|c| c.1));
        BoundingBox {
            min_x: pose.x + min_x,
            max_x: pose.x + max_x,
            min_y: pose.y + min_y,
            max_y: pose.y + max_y,
        }
    }
}

fn span<I: Iterator<Item = f64>>(values: I) -> (f64, f64) {
    match values.minmax_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal)) {
        MinMaxResult::NoElements => (0.0, 0.0),
        MinMaxResult::OneElement(v) => (v, v),
        MinMaxResult::MinMax(lo, hi) => (lo, hi),
    }
}
