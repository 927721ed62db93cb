//! Decoded images used as diffuse maps and environment backgrounds.
//!
//! Texels are kept as raw bytes in BGR(A) order, top row first, the layout
//! the sampler reads directly. Sampling converts to linear RGB.

use std::path::Path;

use thiserror::Error;

use crate::color::{srgb_to_linear, Color};

/// Errors that can occur during texture loading.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Failed to load texture {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Texture {0} has no pixels")]
    Empty(String),

    #[error("Texture buffer too small: {len} bytes for {height} rows of {stride} bytes")]
    BufferTooSmall { len: usize, height: u32, stride: usize },

    #[error("Unsupported pixel size: {0} bytes (expected 3 or 4)")]
    UnsupportedPixelSize(usize),
}

pub type TextureResult<T> = Result<T, TextureError>;

/// A loaded texture with raw pixel data.
#[derive(Clone, Debug)]
pub struct Texture {
    width: u32,
    height: u32,
    /// Bytes per row, including padding
    stride: usize,
    /// Bytes per pixel (3 = BGR, 4 = BGRA)
    pixel_size: usize,
    data: Vec<u8>,
}

impl Texture {
    /// Wrap an existing BGR(A) byte buffer.
    pub fn new(
        width: u32,
        height: u32,
        stride: usize,
        pixel_size: usize,
        data: Vec<u8>,
    ) -> TextureResult<Self> {
        if pixel_size != 3 && pixel_size != 4 {
            return Err(TextureError::UnsupportedPixelSize(pixel_size));
        }
        if width == 0 || height == 0 {
            return Err(TextureError::Empty(format!("{}x{}", width, height)));
        }
        if stride < width as usize * pixel_size || data.len() < stride * height as usize {
            return Err(TextureError::BufferTooSmall {
                len: data.len(),
                height,
                stride,
            });
        }

        Ok(Self {
            width,
            height,
            stride,
            pixel_size,
            data,
        })
    }

    /// Load and decode an image file.
    pub fn load(path: impl AsRef<Path>) -> TextureResult<Self> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|source| TextureError::Load {
            path: path.display().to_string(),
            source,
        })?;

        let texture = Self::from_image(&img)?;
        log::debug!(
            "Loaded texture: {} ({}x{}, {} bpp, {:.1} KB)",
            path.display(),
            texture.width,
            texture.height,
            texture.pixel_size * 8,
            texture.data.len() as f32 / 1024.0
        );
        Ok(texture)
    }

    /// Repack a decoded image into BGR(A) rows padded to 4 bytes.
    pub fn from_image(img: &image::DynamicImage) -> TextureResult<Self> {
        let with_alpha = img.color().has_alpha();
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        let pixel_size = if with_alpha { 4 } else { 3 };
        let stride = (width as usize * pixel_size + 3) & !3;
        let mut data = vec![0u8; stride * height as usize];

        for (x, y, p) in rgba.enumerate_pixels() {
            let offset = y as usize * stride + x as usize * pixel_size;
            data[offset] = p[2];
            data[offset + 1] = p[1];
            data[offset + 2] = p[0];
            if with_alpha {
                data[offset + 3] = p[3];
            }
        }

        Self::new(width, height, stride, pixel_size, data)
    }

    /// Single-texel texture holding an sRGB-encoded colour.
    pub fn solid(rgb: [u8; 3]) -> Self {
        Self {
            width: 1,
            height: 1,
            stride: 4,
            pixel_size: 3,
            data: vec![rgb[2], rgb[1], rgb[0], 0],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bilinear lookup returning linear RGB.
    ///
    /// `u` and `v` are expected in `[0, 1]` with `v = 0` at the top row.
    /// Coordinates outside are clamped to the border texels.
    pub fn sample(&self, u: f32, v: f32) -> Color {
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;
        let x = (u * self.width as f32).min(max_x).max(0.0);
        let y = (v * self.height as f32).min(max_y).max(0.0);

        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        let kx = x - x0 as f32;
        let ky = y - y0 as f32;

        let p1 = self.texel(x0, y0);
        let p2 = self.texel(x1, y0);
        let p3 = self.texel(x1, y1);
        let p4 = self.texel(x0, y1);

        let mut blended = [0.0f32; 3];
        for (c, out) in blended.iter_mut().enumerate() {
            *out = (p1[c] * (1.0 - kx) * (1.0 - ky)
                + p2[c] * kx * (1.0 - ky)
                + p3[c] * kx * ky
                + p4[c] * (1.0 - kx) * ky)
                / 255.0;
        }

        // Stored order is BGR
        Color::rgb(
            srgb_to_linear(blended[2]),
            srgb_to_linear(blended[1]),
            srgb_to_linear(blended[0]),
        )
    }

    /// First three stored channels of a texel, unnormalised.
    fn texel(&self, x: u32, y: u32) -> [f32; 3] {
        let offset = y as usize * self.stride + x as usize * self.pixel_size;
        let p = &self.data[offset..offset + 3];
        [p[0] as f32, p[1] as f32, p[2] as f32]
    }
}
