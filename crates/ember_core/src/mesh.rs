//! Triangle mesh geometry.
//!
//! Meshes are populated from OBJ files or built procedurally and handed to
//! an intersection backend by the renderer.

use std::f32::consts::PI;

use ember_math::{Aabb, Vec2, Vec3};

/// An indexed triangle mesh with optional per-vertex normals and UVs.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals, one per position when present
    pub normals: Option<Vec<Vec3>>,

    /// Texture coordinates, one per position when present
    pub uvs: Option<Vec<Vec2>>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    /// Axis-aligned bounding box
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a new mesh from positions and indices, optionally with normals.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, normals: Option<Vec<Vec3>>) -> Self {
        Self::new_with_uvs(positions, indices, normals, None)
    }

    /// Create a new mesh with UV coordinates.
    pub fn new_with_uvs(
        positions: Vec<Vec3>,
        indices: Vec<u32>,
        normals: Option<Vec<Vec3>>,
        uvs: Option<Vec<Vec2>>,
    ) -> Self {
        let bounds = Aabb::from_point_cloud(&positions);
        Self {
            positions,
            normals,
            uvs,
            indices,
            bounds,
        }
    }

    /// Two-triangle quad spanning `corner`, `corner + edge_u`,
    /// `corner + edge_u + edge_v`, `corner + edge_v`.
    ///
    /// The face normal is `edge_u × edge_v`.
    pub fn quad(corner: Vec3, edge_u: Vec3, edge_v: Vec3) -> Self {
        let normal = edge_u.cross(edge_v).normalize();
        let positions = vec![
            corner,
            corner + edge_u,
            corner + edge_u + edge_v,
            corner + edge_v,
        ];
        let uvs = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];
        Self::new_with_uvs(
            positions,
            vec![0, 1, 2, 0, 2, 3],
            Some(vec![normal; 4]),
            Some(uvs),
        )
    }

    /// Latitude/longitude sphere with smooth normals, poles on the Z axis.
    pub fn uv_sphere(center: Vec3, radius: f32, segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);

        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut uvs = Vec::new();

        for ring in 0..=rings {
            let theta = PI * ring as f32 / rings as f32;
            for segment in 0..=segments {
                let phi = 2.0 * PI * segment as f32 / segments as f32;
                let n = Vec3::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos());
                positions.push(center + radius * n);
                normals.push(n);
                uvs.push(Vec2::new(
                    segment as f32 / segments as f32,
                    1.0 - ring as f32 / rings as f32,
                ));
            }
        }

        let row = segments + 1;
        let mut indices = Vec::new();
        for ring in 0..rings {
            for segment in 0..segments {
                let a = ring * row + segment;
                let b = a + row;
                // Counter-clockwise seen from outside
                if ring != 0 {
                    indices.extend_from_slice(&[a, b, a + 1]);
                }
                if ring != rings - 1 {
                    indices.extend_from_slice(&[a + 1, b, b + 1]);
                }
            }
        }

        Self::new_with_uvs(positions, indices, Some(normals), Some(uvs))
    }

    /// Compute smooth vertex normals by averaging counter-clockwise face normals.
    pub fn compute_normals(&mut self) {
        let vertex_count = self.positions.len();
        let mut normals = vec![Vec3::ZERO; vertex_count];

        for face in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [face[0] as usize, face[1] as usize, face[2] as usize];
            if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                continue;
            }

            let p0 = self.positions[i0];
            let face_normal = (self.positions[i1] - p0).cross(self.positions[i2] - p0);

            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        for normal in &mut normals {
            *normal = normal.try_normalize().unwrap_or(Vec3::Z);
        }

        self.normals = Some(normals);
    }

    /// Ensure the mesh has one normal per vertex, computing them if necessary.
    pub fn ensure_normals(&mut self) {
        let matches = self
            .normals
            .as_ref()
            .is_some_and(|normals| normals.len() == self.positions.len());

        if !matches {
            if let Some(normals) = &self.normals {
                log::debug!(
                    "Normals array length ({}) doesn't match vertex count ({}), computing smooth normals",
                    normals.len(),
                    self.positions.len()
                );
            }
            self.compute_normals();
        }
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Vertex indices of triangle `prim`.
    #[inline]
    pub fn triangle(&self, prim: usize) -> [usize; 3] {
        let i = prim * 3;
        [
            self.indices[i] as usize,
            self.indices[i + 1] as usize,
            self.indices[i + 2] as usize,
        ]
    }

    /// Positions of triangle `prim`.
    #[inline]
    pub fn triangle_positions(&self, prim: usize) -> [Vec3; 3] {
        let [a, b, c] = self.triangle(prim);
        [self.positions[a], self.positions[b], self.positions[c]]
    }

    /// Unit geometric normal of triangle `prim` (counter-clockwise winding).
    pub fn face_normal(&self, prim: usize) -> Vec3 {
        let [p0, p1, p2] = self.triangle_positions(prim);
        (p1 - p0).cross(p2 - p0).normalize_or_zero()
    }

    /// Check that every index refers to an existing vertex.
    pub fn indices_in_bounds(&self) -> bool {
        self.indices
            .iter()
            .all(|&i| (i as usize) < self.positions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_creation() {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let mesh = Mesh::new(positions, vec![0, 1, 2], None);

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(mesh.normals.is_none());
        assert!(mesh.indices_in_bounds());
    }

    #[test]
    fn test_compute_normals_ccw() {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let mut mesh = Mesh::new(positions, vec![0, 1, 2], None);
        mesh.ensure_normals();

        // Counter-clockwise seen from +Z
        for normal in mesh.normals.as_ref().unwrap() {
            assert!((normal.z - 1.0).abs() < 0.001);
        }
        assert!((mesh.face_normal(0) - Vec3::Z).length() < 0.001);
    }

    #[test]
    fn test_bounds_computation() {
        let positions = vec![
            Vec3::new(-1.0, -2.0, -3.0),
            Vec3::new(4.0, 5.0, 6.0),
            Vec3::new(0.0, 0.0, 0.0),
        ];
        let mesh = Mesh::new(positions, vec![0, 1, 2], None);

        assert!((mesh.bounds.x.min - (-1.0)).abs() < 0.001);
        assert!((mesh.bounds.y.max - 5.0).abs() < 0.001);
        assert!((mesh.bounds.z.min - (-3.0)).abs() < 0.001);
    }

    #[test]
    fn test_quad_normal_and_layout() {
        let quad = Mesh::quad(Vec3::new(-1.0, -1.0, 0.0), Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(quad.triangle_count(), 2);
        assert_eq!(quad.face_normal(0), Vec3::Z);
        assert_eq!(quad.face_normal(1), Vec3::Z);
        assert_eq!(quad.triangle_positions(1)[1], Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_uv_sphere_faces_point_outward() {
        let sphere = Mesh::uv_sphere(Vec3::ZERO, 1.0, 16, 8);
        assert!(sphere.indices_in_bounds());
        // Two pole fans plus two triangles per inner quad
        assert_eq!(sphere.triangle_count(), (16 * 2 + 16 * 6 * 2) as usize);

        for prim in 0..sphere.triangle_count() {
            let [p0, p1, p2] = sphere.triangle_positions(prim);
            let centroid = (p0 + p1 + p2) / 3.0;
            assert!(sphere.face_normal(prim).dot(centroid) > 0.0, "triangle {} faces inward", prim);
        }
    }
}
