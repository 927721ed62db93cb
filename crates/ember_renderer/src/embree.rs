//! Intel Embree 4 scene backend.
//!
//! Manual FFI bindings to the Embree 4 library, avoiding a bindgen
//! dependency. Only the calls needed to build a single-level triangle scene
//! and trace single rays are declared. Attribute interpolation happens on
//! the Rust side from the retained meshes.

use std::ffi::{c_char, c_void};

use ember_core::{Material, SceneDescription, Surface};
use ember_math::{Aabb, Ray, Vec3};
use thiserror::Error;

use crate::scene::{interpolate_mesh, Hit, Scene, SurfaceAttributes};

// ============================================================================
// Embree FFI Bindings
// ============================================================================

#[allow(non_camel_case_types)]
type RTCDevice = *mut c_void;

#[allow(non_camel_case_types)]
type RTCScene = *mut c_void;

#[allow(non_camel_case_types)]
type RTCGeometry = *mut c_void;

// Embree geometry types (from rtcore_geometry.h)
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum RTCGeometryType {
    Triangle = 0, // RTC_GEOMETRY_TYPE_TRIANGLE
}

// Embree buffer type
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum RTCBufferType {
    Index = 0,
    Vertex = 1,
}

// Embree buffer format (from rtcore_common.h)
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum RTCFormat {
    UInt3 = 0x5003,
    Float3 = 0x9003,
}

// Ray structure matching Embree's RTCRay
#[repr(C, align(16))]
#[derive(Debug, Copy, Clone)]
struct RTCRay {
    org_x: f32,
    org_y: f32,
    org_z: f32,
    tnear: f32,

    dir_x: f32,
    dir_y: f32,
    dir_z: f32,
    time: f32,

    tfar: f32,
    mask: u32,
    id: u32,
    flags: u32,
}

// Hit structure matching Embree's RTCHit
#[repr(C, align(16))]
#[derive(Debug, Copy, Clone)]
struct RTCHit {
    ng_x: f32,
    ng_y: f32,
    ng_z: f32,

    u: f32,
    v: f32,

    prim_id: u32,
    geom_id: u32,
    inst_id: [u32; 1],
    inst_prim_id: [u32; 1],
}

// Combined ray-hit structure for rtcIntersect1
#[repr(C, align(16))]
#[derive(Debug, Copy, Clone)]
struct RTCRayHit {
    ray: RTCRay,
    hit: RTCHit,
}

// Bounds structure for rtcGetSceneBounds
#[repr(C, align(16))]
#[derive(Debug, Copy, Clone, Default)]
struct RTCBounds {
    lower_x: f32,
    lower_y: f32,
    lower_z: f32,
    align0: f32,

    upper_x: f32,
    upper_y: f32,
    upper_z: f32,
    align1: f32,
}

// Invalid geometry ID constant
const RTC_INVALID_GEOMETRY_ID: u32 = 0xFFFFFFFF;

// Embree C API functions
#[link(name = "embree4")]
extern "C" {
    fn rtcNewDevice(config: *const c_char) -> RTCDevice;
    fn rtcReleaseDevice(device: RTCDevice);
    fn rtcGetDeviceError(device: RTCDevice) -> i32;

    fn rtcNewScene(device: RTCDevice) -> RTCScene;
    fn rtcReleaseScene(scene: RTCScene);
    fn rtcCommitScene(scene: RTCScene);
    fn rtcGetSceneBounds(scene: RTCScene, bounds: *mut RTCBounds);

    fn rtcNewGeometry(device: RTCDevice, geom_type: RTCGeometryType) -> RTCGeometry;
    fn rtcReleaseGeometry(geom: RTCGeometry);
    fn rtcCommitGeometry(geom: RTCGeometry);
    fn rtcAttachGeometryByID(scene: RTCScene, geom: RTCGeometry, geom_id: u32);

    fn rtcSetSharedGeometryBuffer(
        geom: RTCGeometry,
        buffer_type: u32,
        slot: u32,
        format: u32,
        ptr: *const c_void,
        byte_offset: usize,
        byte_stride: usize,
        item_count: usize,
    );

    fn rtcIntersect1(scene: RTCScene, rayhit: *mut RTCRayHit, args: *const c_void);
    fn rtcOccluded1(scene: RTCScene, ray: *mut RTCRay, args: *const c_void);
}

fn error_name(code: i32) -> &'static str {
    match code {
        1 => "RTC_ERROR_UNKNOWN",
        2 => "RTC_ERROR_INVALID_ARGUMENT",
        3 => "RTC_ERROR_INVALID_OPERATION",
        4 => "RTC_ERROR_OUT_OF_MEMORY",
        5 => "RTC_ERROR_UNSUPPORTED_CPU",
        6 => "RTC_ERROR_CANCELLED",
        _ => "UNKNOWN_ERROR",
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

impl RTCRay {
    fn from_ray(ray: &Ray) -> Self {
        Self {
            org_x: ray.origin.x,
            org_y: ray.origin.y,
            org_z: ray.origin.z,
            tnear: ray.tnear,

            dir_x: ray.direction.x,
            dir_y: ray.direction.y,
            dir_z: ray.direction.z,
            time: ray.time,

            tfar: ray.tfar,
            mask: u32::MAX,
            id: 0,
            flags: 0,
        }
    }
}

impl RTCRayHit {
    fn from_ray(ray: &Ray) -> Self {
        Self {
            ray: RTCRay::from_ray(ray),
            hit: RTCHit {
                ng_x: 0.0,
                ng_y: 0.0,
                ng_z: 0.0,
                u: 0.0,
                v: 0.0,
                prim_id: RTC_INVALID_GEOMETRY_ID,
                geom_id: RTC_INVALID_GEOMETRY_ID,
                inst_id: [RTC_INVALID_GEOMETRY_ID],
                inst_prim_id: [RTC_INVALID_GEOMETRY_ID],
            },
        }
    }
}

// ============================================================================
// EmbreeScene
// ============================================================================

/// Errors raised while setting up the Embree device or scene.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("Failed to create Embree device: {0}")]
    Device(&'static str),

    #[error("Failed to create Embree scene")]
    Scene,

    #[error("Embree rejected surface '{surface}': {code}")]
    Geometry { surface: String, code: &'static str },
}

pub type SceneResult<T> = Result<T, SceneError>;

/// Vertex and index buffers Embree reads in place.
struct SharedBuffers {
    /// Positions padded to 16 bytes, which Embree requires of shared buffers
    vertices: Vec<[f32; 4]>,
    indices: Vec<u32>,
}

/// Scene traced by Intel Embree, one triangle geometry per surface.
///
/// The geometry id of a surface is its index, so hits map straight back to
/// the retained meshes.
pub struct EmbreeScene {
    device: RTCDevice,
    scene: RTCScene,
    surfaces: Vec<Surface>,
    // Embree holds pointers into these until the scene is released
    _buffers: Vec<SharedBuffers>,
}

impl EmbreeScene {
    /// Create the device, upload every surface and commit the scene.
    pub fn new(description: SceneDescription) -> SceneResult<Self> {
        let start = std::time::Instant::now();
        let surfaces = description.surfaces;

        unsafe {
            let device = rtcNewDevice(std::ptr::null());
            if device.is_null() {
                return Err(SceneError::Device(error_name(rtcGetDeviceError(
                    std::ptr::null_mut(),
                ))));
            }

            let scene = rtcNewScene(device);
            if scene.is_null() {
                rtcReleaseDevice(device);
                return Err(SceneError::Scene);
            }

            // From here Drop releases the handles on early return
            let mut this = Self {
                device,
                scene,
                surfaces: Vec::new(),
                _buffers: Vec::with_capacity(surfaces.len()),
            };

            for (geom_id, surface) in surfaces.iter().enumerate() {
                let buffers = SharedBuffers {
                    vertices: surface
                        .mesh
                        .positions
                        .iter()
                        .map(|p| [p.x, p.y, p.z, 0.0])
                        .collect(),
                    indices: surface.mesh.indices.clone(),
                };
                this.attach(geom_id as u32, surface, &buffers)?;
                this._buffers.push(buffers);
            }

            rtcCommitScene(scene);
            this.surfaces = surfaces;

            log::info!(
                "Embree scene created: {} surfaces, {} triangles ({:.2?})",
                this.surfaces.len(),
                this.surfaces
                    .iter()
                    .map(|s| s.mesh.triangle_count())
                    .sum::<usize>(),
                start.elapsed()
            );
            Ok(this)
        }
    }

    unsafe fn attach(
        &self,
        geom_id: u32,
        surface: &Surface,
        buffers: &SharedBuffers,
    ) -> SceneResult<()> {
        let geometry_error = |code: i32| SceneError::Geometry {
            surface: surface.name.clone(),
            code: error_name(code),
        };

        let geom = rtcNewGeometry(self.device, RTCGeometryType::Triangle);
        if geom.is_null() {
            return Err(geometry_error(rtcGetDeviceError(self.device)));
        }

        rtcSetSharedGeometryBuffer(
            geom,
            RTCBufferType::Vertex as u32,
            0,
            RTCFormat::Float3 as u32,
            buffers.vertices.as_ptr() as *const c_void,
            0,
            std::mem::size_of::<[f32; 4]>(),
            buffers.vertices.len(),
        );
        rtcSetSharedGeometryBuffer(
            geom,
            RTCBufferType::Index as u32,
            0,
            RTCFormat::UInt3 as u32,
            buffers.indices.as_ptr() as *const c_void,
            0,
            3 * std::mem::size_of::<u32>(),
            buffers.indices.len() / 3,
        );

        rtcCommitGeometry(geom);
        rtcAttachGeometryByID(self.scene, geom, geom_id);
        rtcReleaseGeometry(geom);

        let err = rtcGetDeviceError(self.device);
        if err != 0 {
            return Err(geometry_error(err));
        }

        log::debug!(
            "Attached '{}' as geometry {}: {} vertices, {} triangles",
            surface.name,
            geom_id,
            buffers.vertices.len(),
            buffers.indices.len() / 3
        );
        Ok(())
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    pub fn bounds(&self) -> Aabb {
        let mut bounds = RTCBounds::default();
        unsafe { rtcGetSceneBounds(self.scene, &mut bounds) };

        Aabb::from_points(
            Vec3::new(bounds.lower_x, bounds.lower_y, bounds.lower_z),
            Vec3::new(bounds.upper_x, bounds.upper_y, bounds.upper_z),
        )
    }

    fn surface(&self, hit: &Hit) -> &Surface {
        &self.surfaces[hit.geom_id as usize]
    }
}

impl Scene for EmbreeScene {
    fn intersect(&self, ray: &mut Ray) -> Option<Hit> {
        let mut rayhit = RTCRayHit::from_ray(ray);
        unsafe { rtcIntersect1(self.scene, &mut rayhit, std::ptr::null()) };

        if rayhit.hit.geom_id == RTC_INVALID_GEOMETRY_ID {
            return None;
        }

        ray.tfar = rayhit.ray.tfar;
        Some(Hit {
            geom_id: rayhit.hit.geom_id,
            prim_id: rayhit.hit.prim_id,
            u: rayhit.hit.u,
            v: rayhit.hit.v,
        })
    }

    fn occluded(&self, ray: &mut Ray) -> bool {
        let mut rtc_ray = RTCRay::from_ray(ray);
        unsafe { rtcOccluded1(self.scene, &mut rtc_ray, std::ptr::null()) };

        // Embree marks a blocked ray with tfar = -inf
        ray.tfar = rtc_ray.tfar;
        rtc_ray.tfar == f32::NEG_INFINITY
    }

    fn interpolate(&self, hit: &Hit) -> SurfaceAttributes {
        interpolate_mesh(&self.surface(hit).mesh, hit)
    }

    fn material_for(&self, hit: &Hit) -> &Material {
        &self.surface(hit).material
    }
}

impl Drop for EmbreeScene {
    fn drop(&mut self) {
        unsafe {
            rtcReleaseScene(self.scene);
            rtcReleaseDevice(self.device);
        }
    }
}

// SAFETY: Embree scenes are safe to query from many threads once
// committed, and the shared buffers are never mutated after upload.
unsafe impl Send for EmbreeScene {}
unsafe impl Sync for EmbreeScene {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_scene::MeshScene;
    use ember_core::{Mesh, Shader};
    use std::sync::Arc;

    fn description() -> SceneDescription {
        let mut description = SceneDescription::new();
        description.add(Surface::new(
            "ball",
            Mesh::uv_sphere(Vec3::ZERO, 1.0, 24, 12),
            Arc::new(Material::new("ball", Shader::Lambert, Vec3::splat(0.8))),
        ));
        description.add(Surface::new(
            "floor",
            Mesh::quad(Vec3::new(-5.0, -5.0, -1.0), Vec3::X * 10.0, Vec3::Y * 10.0),
            Arc::new(Material::new("floor", Shader::Phong, Vec3::ONE)),
        ));
        description
    }

    #[test]
    fn test_embree_matches_mesh_scene() {
        let embree = EmbreeScene::new(description()).unwrap();
        let reference = MeshScene::new(description());

        for i in 0..32 {
            let t = i as f32 * 0.2;
            let origin = Vec3::new(4.0 * t.cos(), 4.0 * t.sin(), 2.0);
            let mut a = Ray::unbounded(origin, (Vec3::new(0.0, 0.0, -0.5) - origin).normalize(), 0.001);
            let mut b = a;

            let hit_a = embree.intersect(&mut a);
            let hit_b = reference.intersect(&mut b);
            assert_eq!(hit_a.map(|h| (h.geom_id, h.prim_id)), hit_b.map(|h| (h.geom_id, h.prim_id)));
            assert!((a.tfar - b.tfar).abs() < 1e-3);
        }
    }

    #[test]
    fn test_embree_occlusion() {
        let embree = EmbreeScene::new(description()).unwrap();

        let mut blocked = Ray::new(Vec3::new(0.0, 0.0, 5.0), -Vec3::Z, 0.1, 10.0);
        assert!(embree.occluded(&mut blocked));
        assert_eq!(blocked.tfar, f32::NEG_INFINITY);

        let mut clear = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Z, 0.1, 10.0);
        assert!(!embree.occluded(&mut clear));
    }
}
