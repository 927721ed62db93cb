//! Pure-Rust scene backend: every surface's triangles in one BVH.

use ember_core::{Material, SceneDescription, Surface};
use ember_math::{Aabb, Ray, Vec3};

use crate::bvh::{BvhNode, PrimRef};
use crate::scene::{interpolate_mesh, Hit, Scene, SurfaceAttributes};
use crate::triangle::{intersect_triangle, triangle_bounds};

/// A committed triangle scene backed by a [`BvhNode`].
pub struct MeshScene {
    surfaces: Vec<Surface>,
    bvh: BvhNode,
}

impl MeshScene {
    /// Build the acceleration structure for a loaded scene.
    pub fn new(description: SceneDescription) -> Self {
        let start = std::time::Instant::now();
        let surfaces = description.surfaces;

        let mut prims = Vec::new();
        for (geom_id, surface) in surfaces.iter().enumerate() {
            for prim_id in 0..surface.mesh.triangle_count() {
                prims.push(PrimRef {
                    geom_id: geom_id as u32,
                    prim_id: prim_id as u32,
                    bbox: triangle_bounds(surface.mesh.triangle_positions(prim_id)),
                });
            }
        }

        let triangle_count = prims.len();
        let bvh = BvhNode::new(prims);

        log::info!(
            "Built BVH over {} triangles in {} surfaces ({:.2?})",
            triangle_count,
            surfaces.len(),
            start.elapsed()
        );
        log::debug!("BVH depth {}", bvh.depth());

        Self { surfaces, bvh }
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    pub fn bounds(&self) -> Aabb {
        self.bvh.bounding_box()
    }

    fn surface(&self, hit: &Hit) -> &Surface {
        &self.surfaces[hit.geom_id as usize]
    }

    fn positions(&self, prim: &PrimRef) -> [Vec3; 3] {
        self.surfaces[prim.geom_id as usize]
            .mesh
            .triangle_positions(prim.prim_id as usize)
    }
}

impl Scene for MeshScene {
    fn intersect(&self, ray: &mut Ray) -> Option<Hit> {
        let mut closest = None;

        self.bvh.traverse(ray, false, &mut |prim, ray| {
            match intersect_triangle(ray, self.positions(prim)) {
                Some(tri) => {
                    ray.tfar = tri.t;
                    closest = Some(Hit {
                        geom_id: prim.geom_id,
                        prim_id: prim.prim_id,
                        u: tri.u,
                        v: tri.v,
                    });
                    true
                }
                None => false,
            }
        });

        closest
    }

    fn occluded(&self, ray: &mut Ray) -> bool {
        let blocked = self.bvh.traverse(ray, true, &mut |prim, ray| {
            intersect_triangle(ray, self.positions(prim)).is_some()
        });

        if blocked {
            ray.tfar = f32::NEG_INFINITY;
        }
        blocked
    }

    fn interpolate(&self, hit: &Hit) -> SurfaceAttributes {
        interpolate_mesh(&self.surface(hit).mesh, hit)
    }

    fn material_for(&self, hit: &Hit) -> &Material {
        &self.surface(hit).material
    }
}
