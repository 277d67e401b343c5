//! Geometry primitives shared by the simulation and presentation layers.
//!
//! World space is measured in tiles with the y axis pointing up, so a rect's
//! [`Rect::bottom`] is its smallest y coordinate and [`Rect::top`] its largest.

use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by geometric operations that are undefined for their input.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum GeometryError {
    /// The vector has no magnitude and therefore no direction.
    #[error("cannot normalize a zero-length vector")]
    ZeroLength,
}

/// Two-component vector expressed in world units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    /// Horizontal component.
    pub x: f32,
    /// Vertical component, positive upwards.
    pub y: f32,
}

impl Vector2 {
    /// Vector with both components set to zero.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Creates a vector from its components.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Creates a vector pointing along `radians` with the provided length.
    #[must_use]
    pub fn from_rotation(radians: f32, magnitude: f32) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self::new(cos * magnitude, sin * magnitude)
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Euclidean length of the vector.
    #[must_use]
    pub fn magnitude(self) -> f32 {
        self.x.hypot(self.y)
    }

    /// Returns the vector scaled to unit length.
    ///
    /// Fails with [`GeometryError::ZeroLength`] when the vector has no length.
    pub fn unit(self) -> Result<Self, GeometryError> {
        let magnitude = self.magnitude();
        if magnitude == 0.0 || !magnitude.is_finite() {
            return Err(GeometryError::ZeroLength);
        }
        Ok(Self::new(self.x / magnitude, self.y / magnitude))
    }

    /// Angle in degrees measured from the positive y axis towards positive x.
    #[must_use]
    pub fn rotation(self) -> f32 {
        self.x.atan2(self.y).to_degrees()
    }

    /// Rotates the vector counter-clockwise by `degrees` around `pivot`.
    #[must_use]
    pub fn rotate(self, degrees: f32, pivot: Self) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let local = self - pivot;
        Self::new(
            local.x * cos - local.y * sin,
            local.y * cos + local.x * sin,
        ) + pivot
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

impl SubAssign for Vector2 {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Vector2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vector2 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// Axis-aligned rectangle in world units anchored at its bottom-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f32,
    /// Bottom edge.
    pub y: f32,
    /// Horizontal extent.
    pub width: f32,
    /// Vertical extent.
    pub height: f32,
}

impl Rect {
    /// Creates a rect from its bottom-left corner and size.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rect of the provided size centred on `center`.
    #[must_use]
    pub fn from_center(center: Vector2, size: Vector2) -> Self {
        Self::new(
            center.x - size.x / 2.0,
            center.y - size.y / 2.0,
            size.x,
            size.y,
        )
    }

    /// Smallest x coordinate.
    #[must_use]
    pub fn left(&self) -> f32 {
        self.x
    }

    /// Largest x coordinate.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Smallest y coordinate.
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y
    }

    /// Largest y coordinate.
    #[must_use]
    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    /// Centre point.
    #[must_use]
    pub fn center(&self) -> Vector2 {
        Vector2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Bottom-left corner.
    #[must_use]
    pub fn min(&self) -> Vector2 {
        Vector2::new(self.left(), self.bottom())
    }

    /// Top-right corner.
    #[must_use]
    pub fn max(&self) -> Vector2 {
        Vector2::new(self.right(), self.top())
    }

    /// Width and height packed into a vector.
    #[must_use]
    pub fn size(&self) -> Vector2 {
        Vector2::new(self.width, self.height)
    }

    /// Moves the rect so its left edge sits at `value`.
    pub fn set_left(&mut self, value: f32) {
        self.x = value;
    }

    /// Moves the rect so its right edge sits at `value`.
    pub fn set_right(&mut self, value: f32) {
        self.x = value - self.width;
    }

    /// Moves the rect so its bottom edge sits at `value`.
    pub fn set_bottom(&mut self, value: f32) {
        self.y = value;
    }

    /// Moves the rect so its top edge sits at `value`.
    pub fn set_top(&mut self, value: f32) {
        self.y = value - self.height;
    }

    /// Moves the rect so its centre sits at `value`.
    pub fn set_center(&mut self, value: Vector2) {
        self.x = value.x - self.width / 2.0;
        self.y = value.y - self.height / 2.0;
    }

    /// Moves the rect so its bottom-left corner sits at `value`.
    pub fn set_min(&mut self, value: Vector2) {
        self.x = value.x;
        self.y = value.y;
    }

    /// Moves the rect so its top-right corner sits at `value`.
    pub fn set_max(&mut self, value: Vector2) {
        self.x = value.x - self.width;
        self.y = value.y - self.height;
    }

    /// Shifts the rect by `delta`.
    pub fn translate(&mut self, delta: Vector2) {
        self.x += delta.x;
        self.y += delta.y;
    }

    /// Reports whether the projections of both rects overlap on each axis.
    ///
    /// Touching edges count as a collision.
    #[must_use]
    pub fn collides(&self, other: &Rect) -> bool {
        self.left() <= other.right()
            && other.left() <= self.right()
            && self.bottom() <= other.top()
            && other.bottom() <= self.top()
    }
}

/// Integer pixel offset used when placing images on a surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelOffset {
    /// Horizontal pixel offset, positive to the right.
    pub x: i32,
    /// Vertical pixel offset, positive downwards.
    pub y: i32,
}

impl PixelOffset {
    /// Creates a new pixel offset.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::{GeometryError, Rect, Vector2};

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn unit_of_zero_vector_is_rejected() {
        assert_eq!(Vector2::ZERO.unit(), Err(GeometryError::ZeroLength));
    }

    #[test]
    fn unit_vector_has_length_one() {
        let unit = Vector2::new(3.0, -4.0).unit().expect("non-zero vector");
        assert!(approx(unit.magnitude(), 1.0));
        assert!(approx(unit.x, 0.6));
        assert!(approx(unit.y, -0.8));
    }

    #[test]
    fn rotation_about_pivot_turns_counter_clockwise() {
        let rotated = Vector2::new(2.0, 1.0).rotate(90.0, Vector2::new(1.0, 1.0));
        assert!(approx(rotated.x, 1.0));
        assert!(approx(rotated.y, 2.0));
    }

    #[test]
    fn rotation_is_measured_from_the_y_axis() {
        assert!(approx(Vector2::new(1.0, 0.0).rotation(), 90.0));
        assert!(approx(Vector2::new(0.0, 1.0).rotation(), 0.0));
        let from = Vector2::from_rotation(0.0, 2.0);
        assert!(approx(from.x, 2.0) && approx(from.y, 0.0));
    }

    #[test]
    fn dot_product_matches_components() {
        assert!(approx(Vector2::new(1.0, 2.0).dot(Vector2::new(3.0, 4.0)), 11.0));
    }

    #[test]
    fn edge_setters_preserve_size() {
        let mut rect = Rect::new(0.0, 0.0, 2.0, 3.0);
        rect.set_right(10.0);
        assert_eq!(rect.x, 8.0);
        rect.set_top(5.0);
        assert_eq!(rect.y, 2.0);
        rect.set_max(Vector2::new(4.0, 4.0));
        assert_eq!(rect.min(), Vector2::new(2.0, 1.0));
        rect.set_center(Vector2::new(0.0, 0.0));
        assert_eq!(rect.min(), Vector2::new(-1.0, -1.5));
        assert_eq!(rect.size(), Vector2::new(2.0, 3.0));
    }

    #[test]
    fn touching_rects_collide() {
        let a = Rect::new(0.0, 0.0, 1.0, 1.0);
        let beside = Rect::new(1.0, 0.0, 1.0, 1.0);
        let above = Rect::new(0.0, 1.0, 1.0, 1.0);
        let corner = Rect::new(1.0, 1.0, 1.0, 1.0);
        assert!(a.collides(&beside));
        assert!(a.collides(&above));
        assert!(a.collides(&corner));
    }

    #[test]
    fn separated_rects_do_not_collide() {
        let a = Rect::new(0.0, 0.0, 1.0, 1.0);
        let b = Rect::new(1.01, 0.0, 1.0, 1.0);
        assert!(!a.collides(&b));
        assert!(!b.collides(&a));
    }

    #[test]
    fn crossing_rects_collide() {
        let tall = Rect::new(1.0, -1.0, 1.0, 4.0);
        let wide = Rect::new(0.0, 0.0, 4.0, 1.0);
        assert!(tall.collides(&wide));
        assert!(wide.collides(&tall));
    }

    #[test]
    fn rect_round_trips_through_bincode() {
        let rect = Rect::from_center(Vector2::new(3.5, 54.0), Vector2::new(0.75, 2.0));
        let bytes = bincode::serialize(&rect).expect("serialize");
        let restored: Rect = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, rect);
    }
}
