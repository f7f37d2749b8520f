//! Planar geometry kit.
//!
//! Shapes are resolved in world space: configuration carries local
//! [`ShapeConfig`](crate::schema::ShapeConfig) descriptions that are placed with
//! a [`Transform`]. The kit covers exactly what the logic engines need:
//! intersection tests, distances, uniform expansion and penetration vectors for
//! collision response.

use std::f32::consts::{PI, TAU};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

const EPSILON: f32 = 1e-5;

/// Two-dimensional vector in world units.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `angle` (radians, counter-clockwise from +x).
    pub fn from_angle(angle: f32) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn distance(self, other: Self) -> f32 {
        (other - self).length()
    }

    pub fn distance_squared(self, other: Self) -> f32 {
        (other - self).length_squared()
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Returns the unit vector in the same direction, or zero for a zero vector.
    pub fn normalized(self) -> Self {
        let length = self.length();
        if length < EPSILON {
            Self::ZERO
        } else {
            self / length
        }
    }

    pub fn rotated(self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Angle of this vector in radians.
    pub fn angle(self) -> f32 {
        self.y.atan2(self.x)
    }

    /// Angle of the direction from `self` towards `other`.
    pub fn direction_to(self, other: Self) -> f32 {
        (other - self).angle()
    }

    /// Averages a set of points; `None` when the set is empty.
    pub fn mean(points: impl IntoIterator<Item = Vector2>) -> Option<Self> {
        let mut sum = Self::ZERO;
        let mut count = 0usize;
        for point in points {
            sum += point;
            count += 1;
        }
        (count > 0).then(|| sum / count as f32)
    }
}

impl Add for Vector2 {
    type Output = Vector2;
    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vector2 {
    fn add_assign(&mut self, rhs: Vector2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vector2 {
    type Output = Vector2;
    fn sub(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vector2 {
    fn sub_assign(&mut self, rhs: Vector2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Vector2 {
    type Output = Vector2;
    fn mul(self, rhs: f32) -> Vector2 {
        Vector2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Vector2 {
    type Output = Vector2;
    fn div(self, rhs: f32) -> Vector2 {
        Vector2::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vector2 {
    type Output = Vector2;
    fn neg(self) -> Vector2 {
        Vector2::new(-self.x, -self.y)
    }
}

/// Wraps an angle into `(-PI, PI]`.
pub fn normalize_angle(angle: f32) -> f32 {
    let mut wrapped = angle % TAU;
    if wrapped > PI {
        wrapped -= TAU;
    } else if wrapped <= -PI {
        wrapped += TAU;
    }
    wrapped
}

/// Signed shortest rotation from `from` to `to`.
pub fn angle_difference(from: f32, to: f32) -> f32 {
    normalize_angle(to - from)
}

/// Rigid placement of a logic entity: translation plus rotation in radians.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    pub translation: Vector2,
    pub rotation: f32,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vector2::ZERO,
        rotation: 0.0,
    };

    pub const fn new(translation: Vector2, rotation: f32) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// Maps a local point into this transform's frame.
    pub fn apply(&self, point: Vector2) -> Vector2 {
        self.translation + point.rotated(self.rotation)
    }

    /// Composes `local` inside this frame.
    pub fn compose(&self, local: &Transform) -> Transform {
        Transform::new(
            self.apply(local.translation),
            normalize_angle(self.rotation + local.rotation),
        )
    }
}

/// Axis-aligned rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub min: Vector2,
    pub max: Vector2,
}

impl Rect {
    pub const fn new(min: Vector2, max: Vector2) -> Self {
        Self { min, max }
    }

    pub fn from_center(center: Vector2, width: f32, height: f32) -> Self {
        let half = Vector2::new(width * 0.5, height * 0.5);
        Self::new(center - half, center + half)
    }

    /// Smallest rectangle containing every point.
    pub fn bounding(points: &[Vector2]) -> Self {
        let mut min = Vector2::new(f32::MAX, f32::MAX);
        let mut max = Vector2::new(f32::MIN, f32::MIN);
        for point in points {
            min.x = min.x.min(point.x);
            min.y = min.y.min(point.y);
            max.x = max.x.max(point.x);
            max.y = max.y.max(point.y);
        }
        Self::new(min, max)
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Vector2 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, point: Vector2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Strict overlap; rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }

    pub fn expanded(&self, amount: f32) -> Rect {
        let delta = Vector2::new(amount, amount);
        Rect::new(self.min - delta, self.max + delta)
    }

    pub fn translated(&self, offset: Vector2) -> Rect {
        Rect::new(self.min + offset, self.max + offset)
    }

    fn corners(&self) -> [Vector2; 4] {
        [
            self.min,
            Vector2::new(self.max.x, self.min.y),
            self.max,
            Vector2::new(self.min.x, self.max.y),
        ]
    }

    fn closest_point(&self, point: Vector2) -> Vector2 {
        Vector2::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
        )
    }
}

/// World-space collision/intersection shape.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Shape {
    Point(Vector2),
    Circle { center: Vector2, radius: f32 },
    Rect(Rect),
}

impl Default for Shape {
    fn default() -> Self {
        Shape::Point(Vector2::ZERO)
    }
}

impl Shape {
    pub fn circle(center: Vector2, radius: f32) -> Self {
        Shape::Circle { center, radius }
    }

    pub fn bounds(&self) -> Rect {
        match *self {
            Shape::Point(point) => Rect::new(point, point),
            Shape::Circle { center, radius } => Rect::from_center(center, radius * 2.0, radius * 2.0),
            Shape::Rect(rect) => rect,
        }
    }

    pub fn center(&self) -> Vector2 {
        match *self {
            Shape::Point(point) => point,
            Shape::Circle { center, .. } => center,
            Shape::Rect(rect) => rect.center(),
        }
    }

    pub fn translated(&self, offset: Vector2) -> Shape {
        match *self {
            Shape::Point(point) => Shape::Point(point + offset),
            Shape::Circle { center, radius } => Shape::Circle {
                center: center + offset,
                radius,
            },
            Shape::Rect(rect) => Shape::Rect(rect.translated(offset)),
        }
    }

    /// Uniformly grows the shape; points become circles.
    pub fn expanded(&self, amount: f32) -> Shape {
        if amount <= 0.0 {
            return *self;
        }
        match *self {
            Shape::Point(center) => Shape::Circle {
                center,
                radius: amount,
            },
            Shape::Circle { center, radius } => Shape::Circle {
                center,
                radius: radius + amount,
            },
            Shape::Rect(rect) => Shape::Rect(rect.expanded(amount)),
        }
    }

    /// Places a local shape into `transform`'s frame.
    ///
    /// Rotated rectangles are approximated by their axis-aligned bounds.
    pub fn transformed(&self, transform: &Transform) -> Shape {
        match *self {
            Shape::Point(point) => Shape::Point(transform.apply(point)),
            Shape::Circle { center, radius } => Shape::Circle {
                center: transform.apply(center),
                radius,
            },
            Shape::Rect(rect) => {
                let corners = rect.corners().map(|corner| transform.apply(corner));
                Shape::Rect(Rect::bounding(&corners))
            }
        }
    }

    pub fn intersects(&self, other: &Shape) -> bool {
        match (*self, *other) {
            (Shape::Point(a), Shape::Point(b)) => a.distance_squared(b) < EPSILON * EPSILON,
            (Shape::Point(p), Shape::Circle { center, radius })
            | (Shape::Circle { center, radius }, Shape::Point(p)) => {
                p.distance_squared(center) <= radius * radius
            }
            (Shape::Point(p), Shape::Rect(rect)) | (Shape::Rect(rect), Shape::Point(p)) => {
                rect.contains(p)
            }
            (
                Shape::Circle {
                    center: a,
                    radius: ra,
                },
                Shape::Circle {
                    center: b,
                    radius: rb,
                },
            ) => a.distance_squared(b) < (ra + rb) * (ra + rb),
            (Shape::Circle { center, radius }, Shape::Rect(rect))
            | (Shape::Rect(rect), Shape::Circle { center, radius }) => {
                rect.closest_point(center).distance_squared(center) < radius * radius
            }
            (Shape::Rect(a), Shape::Rect(b)) => a.intersects(&b),
        }
    }

    /// Vector that moves `self` out of `other`, or `None` when they do not overlap.
    pub fn penetration(&self, other: &Shape) -> Option<Vector2> {
        match (self.as_circle(), other.as_circle()) {
            (Some((a, ra)), Some((b, rb))) => circle_circle(a, ra, b, rb),
            (Some((center, radius)), None) => circle_rect(center, radius, &other.bounds()),
            (None, Some((center, radius))) => {
                circle_rect(center, radius, &self.bounds()).map(|push| -push)
            }
            (None, None) => rect_rect(&self.bounds(), &other.bounds()),
        }
    }

    fn as_circle(&self) -> Option<(Vector2, f32)> {
        match *self {
            Shape::Point(point) => Some((point, 0.0)),
            Shape::Circle { center, radius } => Some((center, radius)),
            Shape::Rect(_) => None,
        }
    }
}

fn circle_circle(a: Vector2, ra: f32, b: Vector2, rb: f32) -> Option<Vector2> {
    let offset = a - b;
    let distance = offset.length();
    let overlap = ra + rb - distance;
    if overlap <= 0.0 {
        return None;
    }
    let direction = if distance > EPSILON {
        offset / distance
    } else {
        Vector2::new(1.0, 0.0)
    };
    Some(direction * overlap)
}

fn circle_rect(center: Vector2, radius: f32, rect: &Rect) -> Option<Vector2> {
    if !rect.contains(center) {
        let offset = center - rect.closest_point(center);
        let distance = offset.length();
        let overlap = radius - distance;
        return (overlap > 0.0 && distance > EPSILON).then(|| offset / distance * overlap);
    }
    // Center inside: leave through the nearest side.
    let exits = [
        (center.x - rect.min.x, Vector2::new(-1.0, 0.0)),
        (rect.max.x - center.x, Vector2::new(1.0, 0.0)),
        (center.y - rect.min.y, Vector2::new(0.0, -1.0)),
        (rect.max.y - center.y, Vector2::new(0.0, 1.0)),
    ];
    exits
        .into_iter()
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(depth, direction)| direction * (depth + radius))
}

fn rect_rect(a: &Rect, b: &Rect) -> Option<Vector2> {
    if !a.intersects(b) {
        return None;
    }
    let overlap_x = a.max.x.min(b.max.x) - a.min.x.max(b.min.x);
    let overlap_y = a.max.y.min(b.max.y) - a.min.y.max(b.min.y);
    let delta = a.center() - b.center();
    if overlap_x < overlap_y {
        Some(Vector2::new(overlap_x.copysign(delta.x), 0.0))
    } else {
        Some(Vector2::new(0.0, overlap_y.copysign(delta.y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn normalize_angle_wraps_into_half_open_range() {
        assert!(approx(normalize_angle(1.5 * PI), -0.5 * PI));
        assert!(approx(normalize_angle(-PI), PI));
        assert!(approx(normalize_angle(PI / 2.0 + TAU), PI / 2.0));
    }

    #[test]
    fn transform_rotates_before_translating() {
        let transform = Transform::new(Vector2::new(1.0, 1.0), PI / 2.0);
        let point = transform.apply(Vector2::new(1.0, 0.0));
        assert!(approx(point.x, 1.0));
        assert!(approx(point.y, 2.0));
    }

    #[test]
    fn touching_rectangles_do_not_intersect() {
        let a = Shape::Rect(Rect::new(Vector2::ZERO, Vector2::new(1.0, 1.0)));
        let b = Shape::Rect(Rect::new(Vector2::new(1.0, 0.0), Vector2::new(2.0, 1.0)));
        assert!(!a.intersects(&b));
        assert!(a.intersects(&b.translated(Vector2::new(-0.5, 0.0))));
    }

    #[test]
    fn circle_penetration_pushes_apart() {
        let a = Shape::circle(Vector2::new(0.5, 0.0), 1.0);
        let b = Shape::circle(Vector2::ZERO, 1.0);
        let push = a.penetration(&b).unwrap();
        assert!(approx(push.x, 1.5));
        assert!(approx(push.y, 0.0));
    }

    #[test]
    fn circle_inside_rect_exits_through_nearest_side() {
        let wall = Shape::Rect(Rect::new(Vector2::ZERO, Vector2::new(4.0, 4.0)));
        let body = Shape::circle(Vector2::new(3.5, 2.0), 0.25);
        let push = body.penetration(&wall).unwrap();
        assert!(approx(push.x, 0.75));
        assert!(approx(push.y, 0.0));
    }

    #[test]
    fn rotated_rect_uses_axis_aligned_bounds() {
        let local = Shape::Rect(Rect::from_center(Vector2::ZERO, 2.0, 1.0));
        let placed = local.transformed(&Transform::new(Vector2::new(5.0, 5.0), PI / 2.0));
        let bounds = placed.bounds();
        assert!(approx(bounds.width(), 1.0));
        assert!(approx(bounds.height(), 2.0));
        assert!(approx(bounds.center().x, 5.0));
    }
}
