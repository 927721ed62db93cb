//! RGBA colour and sRGB transfer functions.
//!
//! Colours are linear unless a function says otherwise. Arithmetic acts on
//! the RGB channels and carries the alpha of the left operand through.

use std::ops::{Add, AddAssign, Div, Mul};

use ember_math::Vec3;

/// Exponent applied to environment lookups before they are re-encoded.
pub const BACKGROUND_GAMMA: f32 = 2.2;

/// Four channel floating point colour.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque colour.
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Opaque colour from an RGB vector.
    pub fn from_vec3(v: Vec3) -> Self {
        Self::rgb(v.x, v.y, v.z)
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.r, self.g, self.b)
    }

    /// Apply `f` to the colour channels, keeping alpha.
    pub fn map_rgb(self, f: impl Fn(f32) -> f32) -> Self {
        Self::new(f(self.r), f(self.g), f(self.b), self.a)
    }

    /// Same colour with alpha forced to 1.
    pub fn opaque(self) -> Self {
        Self { a: 1.0, ..self }
    }

    /// Largest colour channel.
    pub fn max_channel(&self) -> f32 {
        self.r.max(self.g).max(self.b)
    }

    /// Quantise to 8-bit sRGB for display or file output.
    pub fn to_rgba8(self) -> [u8; 4] {
        let encode = |c: f32| (255.0 * linear_to_srgb(c.clamp(0.0, 1.0)) + 0.5) as u8;
        [
            encode(self.r),
            encode(self.g),
            encode(self.b),
            (255.0 * self.a.clamp(0.0, 1.0) + 0.5) as u8,
        ]
    }
}

impl Add for Color {
    type Output = Color;

    fn add(self, rhs: Color) -> Color {
        Color::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b, self.a)
    }
}

impl AddAssign for Color {
    fn add_assign(&mut self, rhs: Color) {
        *self = *self + rhs;
    }
}

impl Mul for Color {
    type Output = Color;

    fn mul(self, rhs: Color) -> Color {
        Color::new(self.r * rhs.r, self.g * rhs.g, self.b * rhs.b, self.a)
    }
}

impl Mul<f32> for Color {
    type Output = Color;

    fn mul(self, rhs: f32) -> Color {
        self.map_rgb(|c| c * rhs)
    }
}

impl Mul<Color> for Vec3 {
    type Output = Color;

    /// Tint a colour by an RGB reflectance. The colour's alpha is kept.
    fn mul(self, rhs: Color) -> Color {
        Color::new(self.x * rhs.r, self.y * rhs.g, self.z * rhs.b, rhs.a)
    }
}

impl Div<f32> for Color {
    type Output = Color;

    fn div(self, rhs: f32) -> Color {
        self.map_rgb(|c| c / rhs)
    }
}

/// Decode one sRGB-encoded channel in `[0, 1]` to linear.
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Encode one linear channel to sRGB.
pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Raise the colour channels to [`BACKGROUND_GAMMA`].
pub fn change_gamma(color: Color) -> Color {
    color.map_rgb(|c| c.powf(BACKGROUND_GAMMA))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srgb_round_trip() {
        for i in 0..=20 {
            let c = i as f32 / 20.0;
            let back = srgb_to_linear(linear_to_srgb(c));
            assert!((back - c).abs() < 1e-5, "c={} back={}", c, back);
        }
    }

    #[test]
    fn test_srgb_endpoints_and_midpoint() {
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-6);
        assert!((linear_to_srgb(1.0) - 1.0).abs() < 1e-6);

        // Mid-gray is darker in linear
        let mid = srgb_to_linear(0.5);
        assert!(mid > 0.2 && mid < 0.22);
    }

    #[test]
    fn test_arithmetic_keeps_left_alpha() {
        let a = Color::new(0.2, 0.4, 0.6, 0.5);
        let b = Color::rgb(0.1, 0.1, 0.1);

        let sum = a + b;
        assert!((sum.r - 0.3).abs() < 1e-6);
        assert_eq!(sum.a, 0.5);

        let scaled = a * 2.0;
        assert!((scaled.b - 1.2).abs() < 1e-6);
        assert_eq!(scaled.a, 0.5);

        let tinted = Vec3::new(0.5, 1.0, 0.0) * b;
        assert_eq!(tinted, Color::rgb(0.05, 0.1, 0.0));
    }

    #[test]
    fn test_change_gamma() {
        let c = change_gamma(Color::new(0.5, 1.0, 0.0, 0.25));
        assert!((c.r - 0.5f32.powf(2.2)).abs() < 1e-6);
        assert_eq!(c.g, 1.0);
        assert_eq!(c.b, 0.0);
        assert_eq!(c.a, 0.25);
    }

    #[test]
    fn test_to_rgba8_clamps() {
        assert_eq!(Color::rgb(2.0, -1.0, 1.0).to_rgba8(), [255, 0, 255, 255]);
        assert_eq!(Color::BLACK.to_rgba8(), [0, 0, 0, 255]);
    }
}
