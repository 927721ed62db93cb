//! Renderer-agnostic scene description.
//!
//! A scene is a flat list of surfaces, each a mesh paired with the material
//! every one of its triangles uses. Backends in the renderer crate build
//! their acceleration structures from this.

use std::sync::Arc;

use ember_math::Aabb;

use crate::material::Material;
use crate::mesh::Mesh;

/// A mesh and the material shared by all of its triangles.
#[derive(Clone, Debug)]
pub struct Surface {
    pub name: String,
    pub mesh: Mesh,
    pub material: Arc<Material>,
}

impl Surface {
    pub fn new(name: impl Into<String>, mesh: Mesh, material: Arc<Material>) -> Self {
        Self {
            name: name.into(),
            mesh,
            material,
        }
    }
}

/// Everything loaded for a render.
#[derive(Clone, Debug, Default)]
pub struct SceneDescription {
    pub surfaces: Vec<Surface>,
    pub materials: Vec<Arc<Material>>,
}

impl SceneDescription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a surface, registering its material if it is new.
    pub fn add(&mut self, surface: Surface) {
        if !self.materials.iter().any(|m| Arc::ptr_eq(m, &surface.material)) {
            self.materials.push(surface.material.clone());
        }
        self.surfaces.push(surface);
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.surfaces.iter().map(|s| s.mesh.triangle_count()).sum()
    }

    /// World bounds of all surfaces.
    pub fn bounds(&self) -> Aabb {
        self.surfaces
            .iter()
            .fold(Aabb::EMPTY, |acc, s| Aabb::surrounding(&acc, &s.mesh.bounds))
    }

    /// Replace every material's shader, e.g. to preview a scene with one model.
    pub fn override_shader(&mut self, shader: crate::material::Shader) {
        // (original, replacement) pairs so shared materials stay shared
        let mut replaced: Vec<(Arc<Material>, Arc<Material>)> = Vec::new();

        for surface in &mut self.surfaces {
            let existing = replaced
                .iter()
                .find(|(old, _)| Arc::ptr_eq(old, &surface.material))
                .map(|(_, new)| new.clone());

            surface.material = match existing {
                Some(new) => new,
                None => {
                    let mut material = (*surface.material).clone();
                    material.shader = shader;
                    let new = Arc::new(material);
                    replaced.push((surface.material.clone(), new.clone()));
                    new
                }
            };
        }

        self.materials = replaced.into_iter().map(|(_, new)| new).collect();
    }
}
