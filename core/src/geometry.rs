//! Pixel-space geometry primitives shared by the world and the systems.

use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// Pair of real numbers describing a point or displacement in pixel space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    /// Horizontal component, growing to the right.
    pub x: f64,
    /// Vertical component, growing downwards.
    pub y: f64,
}

impl Vector2 {
    /// Vector with both components set to zero.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Creates a vector from its components.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean length of the vector.
    #[must_use]
    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Euclidean length of the vector.
    #[must_use]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Euclidean distance between `self` and `other`.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (other - self).length()
    }

    /// Returns a unit vector pointing in the same direction.
    ///
    /// The zero vector has no direction and is returned unchanged.
    #[must_use]
    pub fn normalized(self) -> Self {
        let length = self.length();
        if length == 0.0 {
            return self;
        }
        Self::new(self.x / length, self.y / length)
    }

    /// Reports whether both components are finite numbers.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vector2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vector2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vector2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Vector2 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl Mul<f64> for Vector2 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// Euclidean distance between two points.
#[must_use]
pub fn distance(a: Vector2, b: Vector2) -> f64 {
    a.distance(b)
}

/// Reports whether `b` lies inside the closed square of half-side `range`
/// centred on `a`.
///
/// The relation is symmetric: swapping `a` and `b` never changes the result.
#[must_use]
pub fn chebyshev_within(a: Vector2, b: Vector2, range: f64) -> bool {
    (b.x - a.x).abs() <= range && (b.y - a.y).abs() <= range
}

/// Axis-aligned rectangle anchored at its top-left corner.
///
/// Containment is inclusive on the top and left edges and exclusive on the
/// bottom and right edges.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    origin: Vector2,
    width: f64,
    height: f64,
}

impl Rect {
    /// Creates a rectangle from its top-left corner and dimensions.
    #[must_use]
    pub const fn new(origin: Vector2, width: f64, height: f64) -> Self {
        Self {
            origin,
            width,
            height,
        }
    }

    /// Creates a rectangle of the given dimensions centred on `centre`.
    #[must_use]
    pub fn centered(centre: Vector2, width: f64, height: f64) -> Self {
        Self::new(
            Vector2::new(centre.x - width / 2.0, centre.y - height / 2.0),
            width,
            height,
        )
    }

    /// Top-left corner of the rectangle.
    #[must_use]
    pub const fn origin(&self) -> Vector2 {
        self.origin
    }

    /// Horizontal extent of the rectangle.
    #[must_use]
    pub const fn width(&self) -> f64 {
        self.width
    }

    /// Vertical extent of the rectangle.
    #[must_use]
    pub const fn height(&self) -> f64 {
        self.height
    }

    /// Centre point of the rectangle.
    #[must_use]
    pub fn centre(&self) -> Vector2 {
        Vector2::new(
            self.origin.x + self.width / 2.0,
            self.origin.y + self.height / 2.0,
        )
    }

    /// Reports whether `point` lies inside the rectangle.
    #[must_use]
    pub fn contains(&self, point: Vector2) -> bool {
        self.origin.x <= point.x
            && point.x < self.origin.x + self.width
            && self.origin.y <= point.y
            && point.y < self.origin.y + self.height
    }

    /// Reports whether the two rectangles overlap.
    #[must_use]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.origin.x < other.origin.x + other.width
            && other.origin.x < self.origin.x + self.width
            && self.origin.y < other.origin.y + other.height
            && other.origin.y < self.origin.y + self.height
    }
}
