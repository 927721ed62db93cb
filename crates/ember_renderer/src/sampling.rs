//! Random streams and direction sampling.

use std::f32::consts::PI;

use ember_math::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Density of [`sample_hemisphere`] over solid angle.
pub const HEMISPHERE_PDF: f32 = 1.0 / (2.0 * PI);

/// Uniform direction on the hemisphere around `normal`.
///
/// A point on the unit sphere is drawn from two uniform numbers and flipped
/// into the hemisphere when it points away from `normal`.
pub fn sample_hemisphere(normal: Vec3, rng: &mut dyn RngCore) -> Vec3 {
    let u: f32 = rng.gen();
    let v: f32 = rng.gen();

    let r = 2.0 * (v * (1.0 - v)).sqrt();
    let phi = 2.0 * PI * u;
    let dir = Vec3::new(r * phi.cos(), r * phi.sin(), 1.0 - 2.0 * v).normalize();

    if dir.dot(normal) < 0.0 {
        -dir
    } else {
        dir
    }
}

/// SplitMix64 finaliser, used to spread seeds.
#[inline]
pub fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// Independent random stream for one pixel of a render with `seed`.
///
/// Depends only on its arguments, so a render is reproducible whatever
/// order the pixels run in.
pub fn pixel_rng(seed: u64, x: u32, y: u32) -> StdRng {
    let pixel = ((y as u64) << 32) | x as u64;
    StdRng::seed_from_u64(splitmix64(seed ^ splitmix64(pixel)))
}
