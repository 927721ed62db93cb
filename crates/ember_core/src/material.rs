//! Surface materials and the shading model each one selects.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use ember_math::{Vec2, Vec3};

use crate::texture::Texture;

/// Refractive index of the ambient medium.
pub const IOR_AIR: f32 = 1.0;

/// The light-transport model evaluated for a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Shader {
    /// Debug view of the shading normal
    Normal,
    /// Diffuse direct light, unshadowed
    #[default]
    Lambert,
    /// Ambient + diffuse + specular direct light with a shadow ray
    Phong,
    /// Perfect specular reflection
    Mirror,
    /// Fresnel-weighted reflection and refraction
    Glass,
    /// Refraction only
    ClearGlass,
    /// Emission or one Monte-Carlo diffuse bounce
    Pathtracer,
}

impl Shader {
    pub const ALL: [Shader; 7] = [
        Shader::Normal,
        Shader::Lambert,
        Shader::Phong,
        Shader::Mirror,
        Shader::Glass,
        Shader::ClearGlass,
        Shader::Pathtracer,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Shader::Normal => "normal",
            Shader::Lambert => "lambert",
            Shader::Phong => "phong",
            Shader::Mirror => "mirror",
            Shader::Glass => "glass",
            Shader::ClearGlass => "clear_glass",
            Shader::Pathtracer => "pathtracer",
        }
    }

    /// Pick a shader from an MTL illumination model number.
    pub fn from_illum(illum: u8) -> Self {
        match illum {
            2 => Shader::Phong,
            3 => Shader::Mirror,
            4 | 6 | 7 => Shader::Glass,
            _ => Shader::Lambert,
        }
    }
}

impl fmt::Display for Shader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown shader name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown shader '{0}'")]
pub struct UnknownShader(pub String);

impl FromStr for Shader {
    type Err = UnknownShader;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "normal" => Ok(Shader::Normal),
            "lambert" => Ok(Shader::Lambert),
            "phong" => Ok(Shader::Phong),
            "mirror" => Ok(Shader::Mirror),
            "glass" => Ok(Shader::Glass),
            "clear_glass" | "clearglass" => Ok(Shader::ClearGlass),
            "pathtracer" | "path" => Ok(Shader::Pathtracer),
            _ => Err(UnknownShader(s.to_string())),
        }
    }
}

/// Shading parameters shared by every triangle of a surface.
///
/// Colours are linear RGB.
#[derive(Clone, Debug)]
pub struct Material {
    pub name: String,
    pub shader: Shader,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub emission: Vec3,
    pub shininess: f32,
    /// Overall multiplier applied by the Phong model
    pub reflectivity: f32,
    /// Index of refraction
    pub ior: f32,
    pub diffuse_texture: Option<Arc<Texture>>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            shader: Shader::Lambert,
            ambient: Vec3::ZERO,
            diffuse: Vec3::splat(0.5), // Grey default
            specular: Vec3::ZERO,
            emission: Vec3::ZERO,
            shininess: 1.0,
            reflectivity: 1.0,
            ior: 1.5,
            diffuse_texture: None,
        }
    }
}

impl Material {
    /// Create a material with a name, shader and diffuse colour.
    pub fn new(name: impl Into<String>, shader: Shader, diffuse: Vec3) -> Self {
        Self {
            name: name.into(),
            shader,
            diffuse,
            ..Default::default()
        }
    }

    pub fn with_ior(mut self, ior: f32) -> Self {
        self.ior = ior;
        self
    }

    pub fn with_emission(mut self, emission: Vec3) -> Self {
        self.emission = emission;
        self
    }

    pub fn with_specular(mut self, specular: Vec3, shininess: f32) -> Self {
        self.specular = specular;
        self.shininess = shininess;
        self
    }

    pub fn with_texture(mut self, texture: Arc<Texture>) -> Self {
        self.diffuse_texture = Some(texture);
        self
    }

    /// Diffuse reflectance at a texture coordinate.
    ///
    /// The texture wins over the constant colour when one is attached.
    pub fn diffuse_albedo(&self, tex_coord: Vec2) -> Vec3 {
        match &self.diffuse_texture {
            Some(texture) => texture.sample(tex_coord.x, tex_coord.y).to_vec3(),
            None => self.diffuse,
        }
    }

    /// True only when all three emission channels are non-zero.
    ///
    /// A coloured emitter with a zero channel counts as non-emissive.
    pub fn is_emissive(&self) -> bool {
        self.emission.x != 0.0 && self.emission.y != 0.0 && self.emission.z != 0.0
    }
}
