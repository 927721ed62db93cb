//! The intersection interface the integrator shades against.

use ember_core::{Material, Mesh};
use ember_math::{Ray, Vec2, Vec3};

/// Nearest intersection found by [`Scene::intersect`].
///
/// `u` and `v` are barycentric: the hit point is
/// `(1 - u - v) * v0 + u * v1 + v * v2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Surface (geometry) index
    pub geom_id: u32,
    /// Triangle index within the surface
    pub prim_id: u32,
    pub u: f32,
    pub v: f32,
}

/// Per-vertex attributes interpolated at a hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceAttributes {
    /// Unit shading normal, not yet oriented against the ray
    pub normal: Vec3,
    pub tex_coord: Vec2,
}

/// A committed, read-only scene that can be queried from many threads.
pub trait Scene: Send + Sync {
    /// Find the nearest hit within `[ray.tnear, ray.tfar]`.
    ///
    /// On a hit `ray.tfar` is shrunk to the hit distance.
    fn intersect(&self, ray: &mut Ray) -> Option<Hit>;

    /// Test for any hit within `[ray.tnear, ray.tfar]`.
    ///
    /// When something blocks the ray `ray.tfar` is set to negative infinity.
    fn occluded(&self, ray: &mut Ray) -> bool;

    /// Interpolated normal and texture coordinate at a hit.
    fn interpolate(&self, hit: &Hit) -> SurfaceAttributes;

    /// Material of the surface that was hit.
    fn material_for(&self, hit: &Hit) -> &Material;
}

/// Barycentric blend of three vertex attributes.
#[inline]
pub(crate) fn barycentric<T>(hit: &Hit, a: T, b: T, c: T) -> T
where
    T: std::ops::Mul<f32, Output = T> + std::ops::Add<Output = T>,
{
    a * (1.0 - hit.u - hit.v) + b * hit.u + c * hit.v
}

/// Interpolate a mesh's vertex attributes at a hit on one of its triangles.
///
/// Falls back to the face normal when the mesh has no normals or they
/// cancel out, and to `(0, 0)` without UVs.
pub(crate) fn interpolate_mesh(mesh: &Mesh, hit: &Hit) -> SurfaceAttributes {
    let prim = hit.prim_id as usize;
    let [i0, i1, i2] = mesh.triangle(prim);

    let normal = match &mesh.normals {
        Some(n) => barycentric(hit, n[i0], n[i1], n[i2]).normalize_or_zero(),
        None => Vec3::ZERO,
    };
    let normal = if normal == Vec3::ZERO {
        mesh.face_normal(prim)
    } else {
        normal
    };

    let tex_coord = match &mesh.uvs {
        Some(uv) => barycentric(hit, uv[i0], uv[i1], uv[i2]),
        None => Vec2::ZERO,
    };

    SurfaceAttributes { normal, tex_coord }
}
