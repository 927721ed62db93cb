use crate::{Interval, Vec3};

/// A ray in 3D space with a valid parameter range.
///
/// Intersection queries shrink `tfar` to the distance of the nearest hit,
/// so after a successful query `ray.at(ray.tfar)` is the hit point.
/// `time` is carried through untouched.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Direction vector (not necessarily normalized)
    pub direction: Vec3,
    pub tnear: f32,
    pub tfar: f32,
    pub time: f32,
}

impl Ray {
    /// Create a ray covering `[tnear, tfar]` at time 0.
    pub fn new(origin: Vec3, direction: Vec3, tnear: f32, tfar: f32) -> Self {
        Self {
            origin,
            direction,
            tnear,
            tfar,
            time: 0.0,
        }
    }

    /// Create a ray starting at `tnear` and unbounded towards the far end.
    pub fn unbounded(origin: Vec3, direction: Vec3, tnear: f32) -> Self {
        Self::new(origin, direction, tnear, f32::MAX)
    }

    /// Set the time value.
    pub fn with_time(mut self, time: f32) -> Self {
        self.time = time;
        self
    }

    /// Get the origin point of the ray.
    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Get the direction vector of the ray.
    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// The current valid parameter range.
    #[inline]
    pub fn interval(&self) -> Interval {
        Interval::new(self.tnear, self.tfar)
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// The point at the far end of the valid range.
    #[inline]
    pub fn end_point(&self) -> Vec3 {
        self.at(self.tfar)
    }
}
