//! Ember math types.
//!
//! Re-exports glam and adds the ray and bounds types shared by the
//! scene and renderer crates.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod interval;
mod ray;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::Ray;
