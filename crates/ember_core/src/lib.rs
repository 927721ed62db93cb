//! Ember Core - scene data for the Ember ray tracer.
//!
//! This crate provides:
//!
//! - **Colour handling**: linear RGBA `Color` and sRGB transfer functions
//! - **Textures**: decoded BGR(A) images with a bilinear, linearising sampler
//! - **Materials**: shading parameters and the `Shader` each surface uses
//! - **Geometry**: indexed triangle meshes and the `SceneDescription`
//! - **Loading**: Wavefront OBJ/MTL through `tobj`
//!
//! # Example
//!
//! ```ignore
//! use ember_core::obj::{load_obj, ObjOptions};
//!
//! let scene = load_obj("ship.obj", &ObjOptions::default())?;
//! println!("Loaded {} surfaces, {} materials",
//!     scene.surface_count(),
//!     scene.material_count());
//! ```

pub mod color;
pub mod material;
pub mod mesh;
pub mod obj;
pub mod scene;
pub mod texture;

// Re-export commonly used types
pub use color::Color;
pub use material::{Material, Shader, IOR_AIR};
pub use mesh::Mesh;
pub use obj::{load_obj, LoadError, ObjOptions};
pub use scene::{SceneDescription, Surface};
pub use texture::{Texture, TextureError};
