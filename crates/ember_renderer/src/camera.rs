//! Pinhole camera for primary ray generation.

use ember_math::{Mat3, Ray, Vec3};
use serde::{Deserialize, Serialize};

/// Near bound of primary rays.
const PRIMARY_TNEAR: f32 = 0.001;

/// Where the camera stands and what it looks at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    /// Vertical field of view in degrees
    pub fov_y: f32,
    pub view_from: Vec3,
    pub view_at: Vec3,
    #[serde(default = "default_up")]
    pub up: Vec3,
}

fn default_up() -> Vec3 {
    Vec3::Z
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_y: 45.0,
            view_from: Vec3::new(3.0, 0.0, 0.0),
            view_at: Vec3::ZERO,
            up: Vec3::Z,
        }
    }
}

/// Camera for generating rays into the scene.
#[derive(Debug, Clone)]
pub struct Camera {
    pub image_width: u32,
    pub image_height: u32,

    view_from: Vec3,
    /// Camera-to-world rotation, columns are the x, y, z basis
    basis: Mat3,
    /// Focal length in pixels
    f_y: f32,
}

impl Camera {
    /// Create a camera with +Z as up; `fov_y` is in radians.
    pub fn new(width: u32, height: u32, fov_y: f32, view_from: Vec3, view_at: Vec3) -> Self {
        Self::with_up(width, height, fov_y, view_from, view_at, Vec3::Z)
    }

    /// Create a camera with an explicit up vector.
    pub fn with_up(
        width: u32,
        height: u32,
        fov_y: f32,
        view_from: Vec3,
        view_at: Vec3,
        up: Vec3,
    ) -> Self {
        let z = (view_from - view_at).normalize();
        // Looking along `up` leaves the roll free; any perpendicular will do
        let x = up
            .cross(z)
            .try_normalize()
            .unwrap_or_else(|| z.any_orthonormal_vector());
        let y = z.cross(x);

        Self {
            image_width: width,
            image_height: height,
            view_from,
            basis: Mat3::from_cols(x, y, z),
            f_y: height as f32 / (2.0 * (fov_y / 2.0).tan()),
        }
    }

    pub fn from_settings(width: u32, height: u32, settings: &CameraSettings) -> Self {
        Self::with_up(
            width,
            height,
            settings.fov_y.to_radians(),
            settings.view_from,
            settings.view_at,
            settings.up,
        )
    }

    /// Ray through image position `(x, y)`, measured in pixels from the top
    /// left corner. Callers add their own sub-pixel jitter.
    pub fn generate_ray(&self, x: f32, y: f32) -> Ray {
        let w = self.image_width as f32;
        let h = self.image_height as f32;
        let local = Vec3::new(x - w / 2.0, h / 2.0 - y, -self.f_y).normalize();

        Ray::unbounded(self.view_from, self.basis * local, PRIMARY_TNEAR)
    }

    pub fn view_from(&self) -> Vec3 {
        self.view_from
    }

    /// Focal length in pixels.
    pub fn focal_length(&self) -> f32 {
        self.f_y
    }
}
