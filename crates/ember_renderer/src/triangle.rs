//! Ray-triangle intersection.
//!
//! Uses the Möller-Trumbore algorithm.

use ember_math::{Aabb, Ray, Vec3};

/// Parametric distance and barycentrics of a ray-triangle hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub t: f32,
    pub u: f32,
    pub v: f32,
}

/// Intersect a ray with triangle `[v0, v1, v2]` inside the ray's range.
///
/// Both faces are hit; the integrator orients normals itself.
#[inline]
pub fn intersect_triangle(ray: &Ray, [v0, v1, v2]: [Vec3; 3]) -> Option<TriangleHit> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = ray.direction.cross(edge2);
    let a = edge1.dot(h);

    // Ray is parallel to triangle
    if a.abs() < 1e-12 {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    if !ray.interval().contains(t) {
        return None;
    }

    Some(TriangleHit { t, u, v })
}

/// Bounding box of a triangle, padded on flat axes.
pub fn triangle_bounds([v0, v1, v2]: [Vec3; 3]) -> Aabb {
    Aabb::from_points(v0.min(v1).min(v2), v0.max(v1).max(v2))
}
