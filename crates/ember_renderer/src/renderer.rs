//! Frame rendering.
//!
//! Implements the outer loop around the integrator:
//! - Jittered supersampling per pixel
//! - Buckets rendered in parallel with rayon
//! - Conversion to 8-bit sRGB and PNG output

use std::path::Path;
use std::time::Instant;

use ember_core::Color;
use ember_math::Vec3;
use rand::{Rng, RngCore};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bucket::{generate_buckets, render_bucket, BucketResult, DEFAULT_BUCKET_SIZE};
use crate::camera::{Camera, CameraSettings};
use crate::integrator::{Integrator, RayMedium, DEFAULT_LIGHT_POSITION};

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Jittered samples averaged per pixel
    pub samples_per_pixel: u32,
    /// Recursion budget of primary rays
    pub max_depth: u32,
    /// Seed of the per-pixel random streams
    pub seed: u64,
    pub light_position: Vec3,
    pub bucket_size: u32,
    pub camera: CameraSettings,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            samples_per_pixel: 1,
            max_depth: 4,
            seed: 0,
            light_position: DEFAULT_LIGHT_POSITION,
            bucket_size: DEFAULT_BUCKET_SIZE,
            camera: CameraSettings::default(),
        }
    }
}

impl RenderConfig {
    /// Camera described by this configuration.
    pub fn build_camera(&self) -> Camera {
        Camera::from_settings(self.width, self.height, &self.camera)
    }
}

/// Read-only state shared by every pixel of a frame.
pub struct RenderContext<'a> {
    pub camera: &'a Camera,
    pub integrator: &'a Integrator<'a>,
    pub config: &'a RenderConfig,
}

/// Render a single pixel with jittered multi-sampling.
pub fn render_pixel(ctx: &RenderContext<'_>, x: u32, y: u32, rng: &mut dyn RngCore) -> Color {
    let samples = ctx.config.samples_per_pixel.max(1);
    let mut pixel_color = Color::BLACK;

    for _ in 0..samples {
        let jitter_x: f32 = rng.gen();
        let jitter_y: f32 = rng.gen();
        let ray = ctx
            .camera
            .generate_ray(x as f32 + jitter_x, y as f32 + jitter_y);

        pixel_color += ctx.integrator.shade(
            RayMedium::in_air(ray),
            ctx.config.max_depth as i32,
            rng,
        );
    }

    // Average the samples
    pixel_color / samples as f32
}

/// Simple image buffer for storing render output.
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::BLACK; (width * height) as usize],
        }
    }

    /// Get the pixel at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Set the pixel at (x, y).
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.pixels[(y * self.width + x) as usize] = color;
    }

    /// Copy a finished bucket into place.
    pub fn write_bucket(&mut self, result: &BucketResult) {
        let bucket = &result.bucket;
        for (i, color) in result.pixels.iter().enumerate() {
            let x = bucket.x + i as u32 % bucket.width;
            let y = bucket.y + i as u32 / bucket.width;
            self.set(x, y, *color);
        }
    }

    /// Convert to 8-bit sRGB RGBA bytes.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity((self.width * self.height * 4) as usize);
        for color in &self.pixels {
            bytes.extend_from_slice(&color.to_rgba8());
        }
        bytes
    }

    /// Write the image as an 8-bit PNG.
    pub fn save_png(&self, path: impl AsRef<Path>) -> image::ImageResult<()> {
        image::save_buffer_with_format(
            path,
            &self.to_rgba8(),
            self.width,
            self.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
    }
}

/// Render the whole frame, buckets in parallel.
pub fn render(ctx: &RenderContext<'_>) -> ImageBuffer {
    let width = ctx.camera.image_width;
    let height = ctx.camera.image_height;
    let buckets = generate_buckets(width, height, ctx.config.bucket_size);

    log::info!(
        "Rendering {}x{} at {} spp, depth {} ({} buckets on {} threads)",
        width,
        height,
        ctx.config.samples_per_pixel.max(1),
        ctx.config.max_depth,
        buckets.len(),
        rayon::current_num_threads()
    );
    let start = Instant::now();

    let results: Vec<BucketResult> = buckets
        .par_iter()
        .map(|bucket| BucketResult::new(*bucket, render_bucket(bucket, ctx)))
        .collect();

    let mut image = ImageBuffer::new(width, height);
    for result in &results {
        image.write_bucket(result);
    }

    log::info!("Render finished in {:.2?}", start.elapsed());
    image
}
