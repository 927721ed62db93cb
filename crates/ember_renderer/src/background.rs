//! Environment seen by rays that leave the scene.

use std::f32::consts::PI;
use std::path::Path;

use ember_core::color::Color;
use ember_core::texture::{Texture, TextureResult};
use ember_math::Vec3;

/// Radiance arriving from infinitely far away.
#[derive(Clone, Debug)]
pub enum Background {
    /// Equirectangular image, Z up
    Image(Texture),
    /// Same colour in every direction
    Solid(Color),
}

impl Default for Background {
    fn default() -> Self {
        Background::Solid(Color::BLACK)
    }
}

impl Background {
    /// Load an equirectangular environment image.
    pub fn load(path: impl AsRef<Path>) -> TextureResult<Self> {
        let texture = Texture::load(path.as_ref())?;
        log::info!(
            "Background {} ({}x{})",
            path.as_ref().display(),
            texture.width(),
            texture.height()
        );
        Ok(Background::Image(texture))
    }

    pub fn solid(color: Color) -> Self {
        Background::Solid(color.opaque())
    }

    /// Linear radiance from `direction`.
    ///
    /// The direction is normalised here; `θ = acos(z)` measures from +Z and
    /// `φ = atan2(y, x) + π` runs around it.
    pub fn radiance(&self, direction: Vec3) -> Color {
        match self {
            Background::Solid(color) => *color,
            Background::Image(texture) => {
                let (u, v) = equirect_coords(direction.normalize_or_zero());
                texture.sample(u, v)
            }
        }
    }
}

/// Texture coordinates of a unit direction in an equirectangular map.
fn equirect_coords(d: Vec3) -> (f32, f32) {
    let theta = d.z.clamp(-1.0, 1.0).acos();
    let phi = d.y.atan2(d.x) + PI;
    (1.0 - phi / (2.0 * PI), theta / PI)
}
