//! Wavefront OBJ/MTL loading.
//!
//! Each OBJ model becomes one [`Surface`]. MTL materials map onto
//! [`Material`]; the shading model comes from a custom `shader` statement
//! when present, otherwise from the `illum` number.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ember_math::{Vec2, Vec3};
use thiserror::Error;

use crate::material::{Material, Shader};
use crate::mesh::Mesh;
use crate::scene::{SceneDescription, Surface};
use crate::texture::{Texture, TextureError};

/// Errors raised while loading a scene file.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read OBJ {path}: {source}")]
    Obj {
        path: String,
        #[source]
        source: tobj::LoadError,
    },

    #[error("OBJ {0} contains no geometry")]
    NoGeometry(String),

    #[error("Model '{model}' has an index out of range")]
    BadIndices { model: String },

    #[error(transparent)]
    Texture(#[from] TextureError),
}

pub type LoadResult<T> = Result<T, LoadError>;

/// Options applied while converting an OBJ file.
#[derive(Debug, Clone, Default)]
pub struct ObjOptions {
    /// Shader used for every material, ignoring the MTL file
    pub shader_override: Option<Shader>,
    /// Shader used when the MTL names neither `shader` nor `illum`
    pub default_shader: Shader,
}

/// Load an OBJ file and its materials.
pub fn load_obj(path: impl AsRef<Path>, options: &ObjOptions) -> LoadResult<SceneDescription> {
    let path = path.as_ref();
    let display = path.display().to_string();

    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ..Default::default()
        },
    )
    .map_err(|source| LoadError::Obj {
        path: display.clone(),
        source,
    })?;

    if models.is_empty() {
        return Err(LoadError::NoGeometry(display));
    }

    let mtl_materials = materials.unwrap_or_else(|err| {
        log::warn!("No usable MTL for {}: {}", display, err);
        Vec::new()
    });

    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut textures = TextureCache::new(base_dir);

    let converted = mtl_materials
        .iter()
        .map(|m| convert_material(m, options, &mut textures).map(Arc::new))
        .collect::<LoadResult<Vec<_>>>()?;
    let fallback = Arc::new(Material {
        name: "default".to_string(),
        shader: options.shader_override.unwrap_or(options.default_shader),
        ..Default::default()
    });

    let mut scene = SceneDescription::new();
    for model in models {
        let mesh = convert_mesh(&model)?;
        if mesh.triangle_count() == 0 {
            log::warn!("Skipping empty model '{}'", model.name);
            continue;
        }

        let material = model
            .mesh
            .material_id
            .and_then(|id| converted.get(id).cloned())
            .unwrap_or_else(|| fallback.clone());

        log::debug!(
            "Model '{}': {} triangles, material '{}' ({})",
            model.name,
            mesh.triangle_count(),
            material.name,
            material.shader
        );
        scene.add(Surface::new(model.name, mesh, material));
    }

    if scene.surfaces.is_empty() {
        return Err(LoadError::NoGeometry(display));
    }

    log::debug!(
        "Converted {}: {} surfaces, {} materials, {} triangles",
        display,
        scene.surface_count(),
        scene.material_count(),
        scene.triangle_count()
    );
    Ok(scene)
}

fn convert_mesh(model: &tobj::Model) -> LoadResult<Mesh> {
    let src = &model.mesh;

    let positions: Vec<Vec3> = src
        .positions
        .chunks_exact(3)
        .map(|p| Vec3::new(p[0], p[1], p[2]))
        .collect();
    let normals: Option<Vec<Vec3>> = (!src.normals.is_empty()).then(|| {
        src.normals
            .chunks_exact(3)
            .map(|n| Vec3::new(n[0], n[1], n[2]).normalize_or_zero())
            .collect()
    });
    let uvs: Option<Vec<Vec2>> = (!src.texcoords.is_empty()).then(|| {
        src.texcoords
            .chunks_exact(2)
            .map(|t| Vec2::new(t[0], t[1]))
            .collect()
    });

    let mut mesh = Mesh::new_with_uvs(positions, src.indices.clone(), normals, uvs);
    if !mesh.indices_in_bounds() {
        return Err(LoadError::BadIndices {
            model: model.name.clone(),
        });
    }
    mesh.ensure_normals();
    Ok(mesh)
}

fn convert_material(
    src: &tobj::Material,
    options: &ObjOptions,
    textures: &mut TextureCache,
) -> LoadResult<Material> {
    let defaults = Material::default();

    let shader = match options.shader_override {
        Some(shader) => shader,
        None => explicit_shader(src)
            .or_else(|| src.illumination_model.map(Shader::from_illum))
            .unwrap_or(options.default_shader),
    };

    let diffuse_texture = match &src.diffuse_texture {
        Some(name) if !name.is_empty() => Some(textures.load(name)?),
        _ => None,
    };

    Ok(Material {
        name: src.name.clone(),
        shader,
        ambient: src.ambient.map(Vec3::from).unwrap_or(defaults.ambient),
        diffuse: src.diffuse.map(Vec3::from).unwrap_or(defaults.diffuse),
        specular: src.specular.map(Vec3::from).unwrap_or(defaults.specular),
        emission: src
            .emissive
            .map(Vec3::from)
            .or_else(|| unknown_vec3(src, "Ke"))
            .unwrap_or(defaults.emission),
        shininess: src.shininess.unwrap_or(defaults.shininess),
        reflectivity: unknown_f32(src, "reflectivity").unwrap_or(defaults.reflectivity),
        ior: src.optical_density.unwrap_or(defaults.ior),
        diffuse_texture,
    })
}

fn explicit_shader(src: &tobj::Material) -> Option<Shader> {
    let name = src.unknown_param.get("shader")?;
    match name.parse() {
        Ok(shader) => Some(shader),
        Err(err) => {
            log::warn!("Material '{}': {}, using lambert", src.name, err);
            Some(Shader::Lambert)
        }
    }
}

fn unknown_f32(src: &tobj::Material, key: &str) -> Option<f32> {
    src.unknown_param.get(key)?.trim().parse().ok()
}

fn unknown_vec3(src: &tobj::Material, key: &str) -> Option<Vec3> {
    let values: Vec<f32> = src
        .unknown_param
        .get(key)?
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    match values.as_slice() {
        [v] => Some(Vec3::splat(*v)),
        [r, g, b] => Some(Vec3::new(*r, *g, *b)),
        _ => None,
    }
}

/// Diffuse maps shared between materials that reference the same file.
struct TextureCache {
    base_dir: PathBuf,
    textures: HashMap<String, Arc<Texture>>,
}

impl TextureCache {
    fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            textures: HashMap::new(),
        }
    }

    fn load(&mut self, name: &str) -> LoadResult<Arc<Texture>> {
        if let Some(texture) = self.textures.get(name) {
            return Ok(texture.clone());
        }

        let path = Path::new(name);
        let full_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        };

        let texture = Arc::new(Texture::load(&full_path)?);
        self.textures.insert(name.to_string(), texture.clone());
        Ok(texture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_scene(dir: &Path) -> PathBuf {
        fs::write(
            dir.join("scene.mtl"),
            "newmtl floor\nKd 0.8 0.8 0.8\nillum 2\nNs 20\n\n\
             newmtl lamp\nKd 0.1 0.1 0.1\nKe 5 5 5\nshader pathtracer\n\n\
             newmtl lens\nKd 1 1 1\nNi 1.33\nillum 7\n",
        )
        .unwrap();
        fs::write(
            dir.join("scene.obj"),
            "mtllib scene.mtl\n\
             o floor\nv 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nusemtl floor\nf 1 2 3 4\n\
             o lamp\nv 0 0 2\nv 1 0 2\nv 0 1 2\nusemtl lamp\nf 5 6 7\n\
             o lens\nv 0 0 1\nv 1 0 1\nv 0 1 1\nusemtl lens\nf 8 9 10\n",
        )
        .unwrap();
        dir.join("scene.obj")
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ember_obj_{}_{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_load_obj_maps_materials() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = temp_dir("materials");
        let scene = load_obj(write_scene(&dir), &ObjOptions::default()).unwrap();

        assert_eq!(scene.surface_count(), 3);
        assert_eq!(scene.triangle_count(), 4);

        let by_name = |name: &str| {
            scene
                .surfaces
                .iter()
                .find(|s| s.name == name)
                .map(|s| s.material.clone())
                .unwrap()
        };

        let floor = by_name("floor");
        assert_eq!(floor.shader, Shader::Phong);
        assert_eq!(floor.shininess, 20.0);

        let lamp = by_name("lamp");
        assert_eq!(lamp.shader, Shader::Pathtracer);
        assert_eq!(lamp.emission, Vec3::splat(5.0));
        assert!(lamp.is_emissive());

        let lens = by_name("lens");
        assert_eq!(lens.shader, Shader::Glass);
        assert!((lens.ior - 1.33).abs() < 1e-6);

        // Normals are generated when the file has none
        assert!(scene.surfaces.iter().all(|s| s.mesh.normals.is_some()));
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_emission_from_ke() {
        let dir = temp_dir("emission");
        fs::write(
            dir.join("light.mtl"),
            "newmtl light\nKd 1 1 1\nKe 1 2 3\nshader pathtracer\n\n\
             newmtl dark\nKd 0.5 0.5 0.5\nshader pathtracer\n",
        )
        .unwrap();
        fs::write(
            dir.join("light.obj"),
            "mtllib light.mtl\n\
             o light\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl light\nf 1 2 3\n\
             o dark\nv 0 0 1\nv 1 0 1\nv 0 1 1\nusemtl dark\nf 4 5 6\n",
        )
        .unwrap();

        let scene = load_obj(dir.join("light.obj"), &ObjOptions::default()).unwrap();
        let material = |name: &str| {
            scene
                .surfaces
                .iter()
                .find(|s| s.name == name)
                .map(|s| s.material.clone())
                .unwrap()
        };

        let light = material("light");
        assert_eq!(light.emission, Vec3::new(1.0, 2.0, 3.0));
        assert!(light.is_emissive());

        let dark = material("dark");
        assert_eq!(dark.emission, Vec3::ZERO);
        assert!(!dark.is_emissive());
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_shader_override() {
        let dir = temp_dir("override");
        let options = ObjOptions {
            shader_override: Some(Shader::Normal),
            ..Default::default()
        };
        let scene = load_obj(write_scene(&dir), &options).unwrap();

        assert!(scene.surfaces.iter().all(|s| s.material.shader == Shader::Normal));
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = load_obj("/definitely/not/here.obj", &ObjOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::Obj { .. }));
    }
}
