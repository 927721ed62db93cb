//! Ember Renderer - recursive ray tracing on the CPU
//!
//! Shades triangle scenes with a per-material integrator:
//! - Normal, Lambert and Phong shading with a single point light
//! - Mirror and dielectric (Fresnel) surfaces
//! - A unidirectional Monte Carlo path tracer
//! - Equirectangular environment lighting
//!
//! Intersection goes through the [`Scene`] trait. [`MeshScene`] is the
//! built-in BVH backend; with the `embree` feature, `EmbreeScene` traces
//! through Intel Embree 4 instead.

mod background;
mod bucket;
mod bvh;
mod camera;
#[cfg(feature = "embree")]
mod embree;
mod integrator;
mod mesh_scene;
pub mod optics;
mod renderer;
pub mod sampling;
mod scene;
mod triangle;

pub use background::Background;
pub use bucket::{generate_buckets, render_bucket, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
pub use bvh::{BvhNode, PrimRef};
pub use camera::{Camera, CameraSettings};
#[cfg(feature = "embree")]
pub use embree::{EmbreeScene, SceneError, SceneResult};
pub use integrator::{
    Integrator, RayMedium, DEFAULT_LIGHT_POSITION, SECONDARY_TNEAR, SHADOW_TNEAR,
};
pub use mesh_scene::MeshScene;
pub use renderer::{render, render_pixel, ImageBuffer, RenderConfig, RenderContext};
pub use scene::{Hit, Scene, SurfaceAttributes};
pub use triangle::{intersect_triangle, TriangleHit};

/// Re-export the math and scene types the renderer API is written in
pub use ember_core::{Color, Material, SceneDescription, Shader};
pub use ember_math::{Ray, Vec3};
