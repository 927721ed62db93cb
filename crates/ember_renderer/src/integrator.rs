//! Recursive shading integrator.
//!
//! [`Integrator::shade`] intersects a ray with the scene and evaluates the
//! hit material's [`Shader`], recursing along reflected, refracted or
//! sampled rays until the depth budget runs out. Rays that escape the scene
//! pick up the background.

use std::f32::consts::PI;

use ember_core::color::{change_gamma, linear_to_srgb};
use ember_core::{Color, Material, Shader, IOR_AIR};
use ember_math::{Ray, Vec2, Vec3};
use rand::RngCore;

use crate::background::Background;
use crate::optics::{fresnel, reflect, Interface};
use crate::sampling::{sample_hemisphere, HEMISPHERE_PDF};
use crate::scene::Scene;

/// Near bound of shadow rays, clear of the surface they start on.
pub const SHADOW_TNEAR: f32 = 0.1;

/// Near bound of reflected, refracted and bounced rays.
pub const SECONDARY_TNEAR: f32 = 0.001;

/// Point light used when no other position is configured.
pub const DEFAULT_LIGHT_POSITION: Vec3 = Vec3::new(50.0, -50.0, 300.0);

/// A ray and the refractive index of the medium it travels through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayMedium {
    pub ray: Ray,
    pub ior: f32,
}

impl RayMedium {
    pub fn new(ray: Ray, ior: f32) -> Self {
        Self { ray, ior }
    }

    /// Primary rays start in air.
    pub fn in_air(ray: Ray) -> Self {
        Self::new(ray, IOR_AIR)
    }

    fn secondary(origin: Vec3, direction: Vec3, ior: f32) -> Self {
        Self::new(Ray::unbounded(origin, direction, SECONDARY_TNEAR), ior)
    }

    /// Index on the far side of `material`'s boundary.
    ///
    /// Dielectrics never nest, so a ray outside air is inside the material.
    fn far_side_ior(&self, material: &Material) -> f32 {
        if self.ior == IOR_AIR {
            material.ior
        } else {
            IOR_AIR
        }
    }
}

/// Everything a ray needs to be shaded: scene, background and light.
pub struct Integrator<'a> {
    scene: &'a dyn Scene,
    background: &'a Background,
    light_position: Vec3,
}

impl<'a> Integrator<'a> {
    pub fn new(scene: &'a dyn Scene, background: &'a Background, light_position: Vec3) -> Self {
        Self {
            scene,
            background,
            light_position,
        }
    }

    pub fn light_position(&self) -> Vec3 {
        self.light_position
    }

    /// Radiance carried back along `medium.ray`.
    ///
    /// At `depth <= 0` a hit yields the background instead of being shaded,
    /// so a call makes at most `depth` levels of recursion.
    pub fn shade(&self, medium: RayMedium, depth: i32, rng: &mut dyn RngCore) -> Color {
        let mut ray = medium.ray;
        let Some(hit) = self.scene.intersect(&mut ray) else {
            return self.background_term(ray.direction);
        };

        let attributes = self.scene.interpolate(&hit);
        let tex_coord = Vec2::new(attributes.tex_coord.x, 1.0 - attributes.tex_coord.y);
        let material = self.scene.material_for(&hit);

        let direction = ray.direction;
        let point = ray.end_point();
        let to_light = (self.light_position - point).normalize();
        let normal = if direction.dot(attributes.normal) > 0.0 {
            -attributes.normal
        } else {
            attributes.normal
        };

        if depth <= 0 {
            return self.background_term(direction);
        }

        match material.shader {
            // Un-oriented, so back faces show the stored normal
            Shader::Normal => Color::from_vec3(attributes.normal * 0.5 + 0.5),

            Shader::Lambert => {
                let albedo = material.diffuse_albedo(tex_coord);
                Color::from_vec3(normal.dot(to_light).max(0.0) * albedo)
            }

            Shader::Phong => {
                let view = -direction;
                let reflected = reflect(to_light, normal);
                let albedo = material.diffuse_albedo(tex_coord);

                let distance = (self.light_position - point).length();
                let lit = self.visibility(point, to_light, distance);

                let highlight =
                    material.specular * view.dot(reflected).max(0.0).powf(material.shininess);
                let radiance =
                    material.ambient + lit * (albedo * normal.dot(to_light) + highlight);
                Color::from_vec3(radiance * material.reflectivity)
            }

            Shader::Mirror => {
                let reflected = reflect(-direction, normal);
                let next = RayMedium::secondary(point, reflected, medium.far_side_ior(material));
                material.diffuse * self.shade(next, depth - 1, rng)
            }

            Shader::Glass => {
                let n1 = medium.ior;
                let n2 = medium.far_side_ior(material);

                match fresnel(direction, normal, n1, n2) {
                    Interface::TotalInternalReflection { reflected } => {
                        let next = RayMedium::secondary(point, reflected, n2);
                        material.diffuse * self.shade(next, depth - 1, rng)
                    }
                    Interface::Refraction {
                        reflected,
                        refracted,
                        reflectance,
                        transmittance,
                    } => {
                        let reflected = RayMedium::secondary(point, reflected, n2);
                        let refracted = RayMedium::secondary(point, refracted, n2);
                        material.diffuse * self.shade(reflected, depth - 1, rng) * reflectance
                            + material.diffuse
                                * self.shade(refracted, depth - 1, rng)
                                * transmittance
                    }
                }
            }

            Shader::ClearGlass => {
                let n1 = medium.ior;
                let n2 = medium.far_side_ior(material);

                match fresnel(direction, normal, n1, n2) {
                    Interface::Refraction { refracted, .. } => {
                        let next = RayMedium::secondary(point, refracted, n2);
                        material.diffuse * self.shade(next, depth - 1, rng)
                    }
                    // TODO: trace the internally reflected ray once renders
                    // no longer have to match the background fallback
                    Interface::TotalInternalReflection { .. } => {
                        self.raw_background_term(direction)
                    }
                }
            }

            Shader::Pathtracer => {
                if material.is_emissive() {
                    return Color::from_vec3(material.emission);
                }

                let omega = sample_hemisphere(normal, rng);
                let next = RayMedium::secondary(point, omega, IOR_AIR);
                let incoming = self.shade(next, depth - 1, rng);

                let brdf = material.diffuse / PI;
                brdf * incoming * (normal.dot(omega) / HEMISPHERE_PDF)
            }
        }
    }

    /// Background seen by escaping rays and at the depth limit:
    /// `linear_to_srgb(change_gamma(radiance))`.
    pub fn background_term(&self, direction: Vec3) -> Color {
        change_gamma(self.background.radiance(direction))
            .map_rgb(linear_to_srgb)
            .opaque()
    }

    /// Background without the gamma change, used when clear glass totally
    /// reflects.
    pub fn raw_background_term(&self, direction: Vec3) -> Color {
        self.background
            .radiance(direction)
            .map_rgb(linear_to_srgb)
            .opaque()
    }

    /// 1.0 when nothing lies between `origin` and the point `distance` along
    /// `direction_to_light`, otherwise 0.0.
    pub fn visibility(&self, origin: Vec3, direction_to_light: Vec3, distance: f32) -> f32 {
        let mut ray = Ray::new(origin, direction_to_light, SHADOW_TNEAR, distance);
        self.scene.occluded(&mut ray);

        if ray.tfar < distance {
            0.0
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_scene::MeshScene;
    use crate::scene::{Hit, SurfaceAttributes};
    use ember_core::{Mesh, SceneDescription, Surface, Texture};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// 4x2 environment with a distinct colour in every texel.
    fn gradient_background() -> Background {
        #[rustfmt::skip]
        let data = vec![
            200, 60, 10,   170, 90, 40,   140, 120, 70,   110, 150, 100,
            80, 180, 130,  50, 210, 160,  20, 240, 190,   250, 30, 220,
        ];
        Background::Image(Texture::new(4, 2, 12, 3, data).unwrap())
    }

    fn single_surface(mesh: Mesh, material: Material) -> MeshScene {
        let mut description = SceneDescription::new();
        description.add(Surface::new("surface", mesh, Arc::new(material)));
        MeshScene::new(description)
    }

    /// 20x20 quad in the z=0 plane facing +Z.
    fn floor(material: Material) -> MeshScene {
        single_surface(
            Mesh::quad(Vec3::new(-10.0, -10.0, 0.0), Vec3::X * 20.0, Vec3::Y * 20.0),
            material,
        )
    }

    fn assert_close(actual: Color, expected: Color, tolerance: f32) {
        let diff = (actual.to_vec3() - expected.to_vec3()).abs().max_element();
        assert!(
            diff <= tolerance && (actual.a - expected.a).abs() <= tolerance,
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    fn down_at(origin: Vec3, direction: Vec3) -> RayMedium {
        RayMedium::in_air(Ray::unbounded(origin, direction.normalize(), 0.001))
    }

    struct CountingScene {
        inner: MeshScene,
        intersections: AtomicUsize,
    }

    impl Scene for CountingScene {
        fn intersect(&self, ray: &mut Ray) -> Option<Hit> {
            self.intersections.fetch_add(1, Ordering::SeqCst);
            self.inner.intersect(ray)
        }

        fn occluded(&self, ray: &mut Ray) -> bool {
            self.inner.occluded(ray)
        }

        fn interpolate(&self, hit: &Hit) -> SurfaceAttributes {
            self.inner.interpolate(hit)
        }

        fn material_for(&self, hit: &Hit) -> &Material {
            self.inner.material_for(hit)
        }
    }

    #[test]
    fn test_miss_returns_background_term() {
        let scene = MeshScene::new(SceneDescription::new());
        let background = gradient_background();
        let integrator = Integrator::new(&scene, &background, DEFAULT_LIGHT_POSITION);
        let mut rng = StdRng::seed_from_u64(0);

        for direction in [Vec3::X, Vec3::new(0.3, -0.7, 0.2).normalize(), -Vec3::Z] {
            let ray = RayMedium::in_air(Ray::unbounded(Vec3::ZERO, direction, 0.001));
            let color = integrator.shade(ray, 4, &mut rng);

            assert_eq!(color, integrator.background_term(direction));
            assert!(color.max_channel() > 0.0);
            assert_eq!(color.a, 1.0);
        }
    }

    #[test]
    fn test_depth_zero_never_recurses() {
        let _ = env_logger::builder().is_test(true).try_init();
        let background = gradient_background();

        for shader in Shader::ALL {
            let scene = CountingScene {
                inner: floor(Material::new("m", shader, Vec3::ONE).with_emission(Vec3::ONE)),
                intersections: AtomicUsize::new(0),
            };
            let integrator = Integrator::new(&scene, &background, DEFAULT_LIGHT_POSITION);
            let mut rng = StdRng::seed_from_u64(1);

            let direction = Vec3::new(0.2, 0.1, -1.0);
            let color = integrator.shade(down_at(Vec3::new(0.0, 0.0, 3.0), direction), 0, &mut rng);

            assert_eq!(color, integrator.background_term(direction.normalize()));
            assert_eq!(scene.intersections.load(Ordering::SeqCst), 1, "{}", shader);
        }
    }

    #[test]
    fn test_lambert_sphere_facing_light() {
        let scene = single_surface(
            Mesh::uv_sphere(Vec3::ZERO, 1.0, 64, 32),
            Material::new("grey", Shader::Lambert, Vec3::splat(0.8)),
        );
        let background = Background::default();
        let integrator = Integrator::new(&scene, &background, DEFAULT_LIGHT_POSITION);
        let mut rng = StdRng::seed_from_u64(2);

        // Straight from the light to the centre: N and L coincide
        let ray = RayMedium::in_air(Ray::unbounded(
            DEFAULT_LIGHT_POSITION,
            -DEFAULT_LIGHT_POSITION.normalize(),
            0.001,
        ));
        let color = integrator.shade(ray, 4, &mut rng);

        assert_close(color, Color::rgb(0.8, 0.8, 0.8), 0.01);
    }

    #[test]
    fn test_lambert_ignores_shadowing() {
        let mut description = SceneDescription::new();
        let grey = Arc::new(Material::new("grey", Shader::Lambert, Vec3::splat(0.5)));
        description.add(Surface::new(
            "floor",
            Mesh::quad(Vec3::new(-10.0, -10.0, 0.0), Vec3::X * 20.0, Vec3::Y * 20.0),
            grey.clone(),
        ));
        description.add(Surface::new(
            "roof",
            Mesh::quad(Vec3::new(-20.0, -20.0, 10.0), Vec3::X * 40.0, Vec3::Y * 40.0),
            grey,
        ));
        let scene = MeshScene::new(description);
        let background = Background::default();
        let integrator = Integrator::new(&scene, &background, DEFAULT_LIGHT_POSITION);
        let mut rng = StdRng::seed_from_u64(3);

        let color = integrator.shade(down_at(Vec3::new(0.0, 0.0, 5.0), -Vec3::Z), 4, &mut rng);
        let n_dot_l = DEFAULT_LIGHT_POSITION.normalize().z;
        assert_close(color, Color::rgb(0.5 * n_dot_l, 0.5 * n_dot_l, 0.5 * n_dot_l), 1e-5);
    }

    #[test]
    fn test_normal_shader_uses_stored_normal() {
        let scene = floor(Material::new("debug", Shader::Normal, Vec3::ONE));
        let background = gradient_background();
        let integrator = Integrator::new(&scene, &background, DEFAULT_LIGHT_POSITION);
        let mut rng = StdRng::seed_from_u64(4);

        let expected = Color::rgb(0.5, 0.5, 1.0);
        let front = integrator.shade(down_at(Vec3::new(1.0, 2.0, 3.0), -Vec3::Z), 4, &mut rng);
        assert_close(front, expected, 1e-6);

        // Seen from below the colour does not flip
        let back = integrator.shade(down_at(Vec3::new(1.0, 2.0, -3.0), Vec3::Z), 4, &mut rng);
        assert_close(back, expected, 1e-6);
    }

    #[test]
    fn test_phong_lit_and_shadowed() {
        let phong = Material {
            ambient: Vec3::splat(0.1),
            reflectivity: 0.5,
            ..Material::new("phong", Shader::Phong, Vec3::splat(0.6))
        };
        let background = Background::default();
        let mut rng = StdRng::seed_from_u64(5);
        let ray = down_at(Vec3::new(0.0, 0.0, 5.0), -Vec3::Z);

        // Open sky: ambient plus diffuse
        let open = floor(phong.clone());
        let integrator = Integrator::new(&open, &background, DEFAULT_LIGHT_POSITION);
        let n_dot_l = DEFAULT_LIGHT_POSITION.normalize().z;
        let lit = (0.1 + 0.6 * n_dot_l) * 0.5;
        assert_close(integrator.shade(ray, 4, &mut rng), Color::rgb(lit, lit, lit), 1e-5);

        // A roof between the floor and the light leaves only ambient
        let mut description = SceneDescription::new();
        description.add(Surface::new(
            "floor",
            Mesh::quad(Vec3::new(-10.0, -10.0, 0.0), Vec3::X * 20.0, Vec3::Y * 20.0),
            Arc::new(phong),
        ));
        description.add(Surface::new(
            "roof",
            Mesh::quad(Vec3::new(-20.0, -20.0, 10.0), Vec3::X * 40.0, Vec3::Y * 40.0),
            Arc::new(Material::default()),
        ));
        let covered = MeshScene::new(description);
        let integrator = Integrator::new(&covered, &background, DEFAULT_LIGHT_POSITION);
        assert_close(integrator.shade(ray, 4, &mut rng), Color::rgb(0.05, 0.05, 0.05), 1e-6);
    }

    #[test]
    fn test_phong_highlight_towards_viewer() {
        let shiny = Material::new("shiny", Shader::Phong, Vec3::ZERO)
            .with_specular(Vec3::ONE, 8.0);
        let scene = floor(shiny);
        let background = Background::default();
        let integrator = Integrator::new(&scene, &background, DEFAULT_LIGHT_POSITION);
        let mut rng = StdRng::seed_from_u64(6);

        // Viewed along the mirror direction of the light
        let to_light = DEFAULT_LIGHT_POSITION.normalize();
        let mirrored = Vec3::new(-to_light.x, -to_light.y, to_light.z);
        let ray = down_at(mirrored * 10.0, -mirrored);

        let color = integrator.shade(ray, 4, &mut rng);
        assert_close(color, Color::WHITE, 1e-3);
    }

    #[test]
    fn test_mirror_matches_reflected_ray() {
        let scene = floor(Material::new("mirror", Shader::Mirror, Vec3::ONE));
        let background = gradient_background();
        let integrator = Integrator::new(&scene, &background, DEFAULT_LIGHT_POSITION);
        let mut rng = StdRng::seed_from_u64(7);

        let direction = Vec3::new(1.0, 0.5, -1.0).normalize();
        let origin = Vec3::new(0.0, 0.0, 5.0);
        let color = integrator.shade(down_at(origin, direction), 3, &mut rng);

        let hit_point = origin + direction * (5.0 / -direction.z);
        let reflected = Vec3::new(direction.x, direction.y, -direction.z);
        let next = RayMedium::new(Ray::unbounded(hit_point, reflected, SECONDARY_TNEAR), 1.5);
        let expected = integrator.shade(next, 2, &mut rng);

        assert_close(color, expected, 1e-5);
        assert_close(color, integrator.background_term(reflected), 1e-5);
    }

    #[test]
    fn test_mirror_tints_by_diffuse() {
        let scene = floor(Material::new("gold", Shader::Mirror, Vec3::new(1.0, 0.5, 0.0)));
        let background = Background::solid(Color::rgb(1.0, 1.0, 1.0));
        let integrator = Integrator::new(&scene, &background, DEFAULT_LIGHT_POSITION);
        let mut rng = StdRng::seed_from_u64(8);

        let color = integrator.shade(down_at(Vec3::new(0.0, 0.0, 5.0), -Vec3::Z), 4, &mut rng);
        assert_close(color, Color::rgb(1.0, 0.5, 0.0), 1e-5);
    }

    #[test]
    fn test_glass_without_index_change_is_transparent() {
        let scene = floor(Material::new("thin", Shader::Glass, Vec3::ONE).with_ior(1.0));
        let background = gradient_background();
        let integrator = Integrator::new(&scene, &background, DEFAULT_LIGHT_POSITION);
        let mut rng = StdRng::seed_from_u64(9);

        let direction = Vec3::new(0.4, -0.3, -1.0).normalize();
        let color = integrator.shade(down_at(Vec3::new(0.0, 0.0, 4.0), direction), 4, &mut rng);

        assert_close(color, integrator.background_term(direction), 1e-4);
    }

    #[test]
    fn test_glass_total_internal_reflection_follows_reflection() {
        let scene = floor(Material::new("glass", Shader::Glass, Vec3::ONE).with_ior(1.5));
        let background = gradient_background();
        let integrator = Integrator::new(&scene, &background, DEFAULT_LIGHT_POSITION);
        let mut rng = StdRng::seed_from_u64(10);

        // Inside the glass, 60 degrees from the normal
        let direction = Vec3::new(3f32.sqrt() / 2.0, 0.0, -0.5);
        let ray = RayMedium::new(Ray::unbounded(Vec3::new(0.0, 0.0, 1.0), direction, 0.001), 1.5);
        let color = integrator.shade(ray, 4, &mut rng);

        let reflected = Vec3::new(direction.x, direction.y, -direction.z);
        assert_close(color, integrator.background_term(reflected), 1e-4);
    }

    #[test]
    fn test_clear_glass_total_internal_reflection_uses_raw_background() {
        let scene = floor(Material::new("clear", Shader::ClearGlass, Vec3::ONE).with_ior(1.5));
        let background = gradient_background();
        let integrator = Integrator::new(&scene, &background, DEFAULT_LIGHT_POSITION);
        let mut rng = StdRng::seed_from_u64(11);

        let direction = Vec3::new(3f32.sqrt() / 2.0, 0.0, -0.5);
        let ray = RayMedium::new(Ray::unbounded(Vec3::new(0.0, 0.0, 1.0), direction, 0.001), 1.5);
        let color = integrator.shade(ray, 4, &mut rng);

        assert_eq!(color, integrator.raw_background_term(direction));
        assert_ne!(color, integrator.background_term(direction));
    }

    #[test]
    fn test_clear_glass_refracts_only() {
        let scene = floor(Material::new("clear", Shader::ClearGlass, Vec3::ONE).with_ior(1.0));
        let background = gradient_background();
        let integrator = Integrator::new(&scene, &background, DEFAULT_LIGHT_POSITION);
        let mut rng = StdRng::seed_from_u64(12);

        let direction = Vec3::new(-0.2, 0.6, -1.0).normalize();
        let color = integrator.shade(down_at(Vec3::new(0.0, 0.0, 4.0), direction), 4, &mut rng);

        assert_close(color, integrator.background_term(direction), 1e-4);
    }

    #[test]
    fn test_pathtracer_emitter_returns_emission() {
        let lamp = Material::new("lamp", Shader::Pathtracer, Vec3::splat(0.5))
            .with_emission(Vec3::new(2.0, 3.0, 4.0));
        let scene = floor(lamp);
        let background = gradient_background();
        let integrator = Integrator::new(&scene, &background, DEFAULT_LIGHT_POSITION);
        let mut rng = StdRng::seed_from_u64(13);

        let color = integrator.shade(down_at(Vec3::new(0.0, 0.0, 2.0), -Vec3::Z), 4, &mut rng);
        assert_eq!(color, Color::rgb(2.0, 3.0, 4.0));
    }

    #[test]
    fn test_pathtracer_partial_emitter_bounces() {
        // One zero channel: not treated as a light
        let surface = Material::new("magenta", Shader::Pathtracer, Vec3::splat(0.5))
            .with_emission(Vec3::new(5.0, 0.0, 5.0));
        let scene = floor(surface);
        let background = gradient_background();
        let integrator = Integrator::new(&scene, &background, DEFAULT_LIGHT_POSITION);

        let mut rng = StdRng::seed_from_u64(14);
        let color = integrator.shade(down_at(Vec3::new(0.0, 0.0, 2.0), -Vec3::Z), 1, &mut rng);

        // Replay the single hemisphere sample the bounce drew
        let mut replay = StdRng::seed_from_u64(14);
        let omega = sample_hemisphere(Vec3::Z, &mut replay);
        let expected = Vec3::splat(0.5 / PI)
            * integrator.background_term(omega)
            * (omega.z / HEMISPHERE_PDF);

        assert_close(color, expected, 1e-4);
        assert_ne!(color, Color::rgb(5.0, 0.0, 5.0));
    }

    #[test]
    fn test_visibility() {
        let scene = floor(Material::default());
        let background = Background::default();
        let integrator = Integrator::new(&scene, &background, DEFAULT_LIGHT_POSITION);

        let above = Vec3::new(0.0, 0.0, 5.0);
        assert_eq!(integrator.visibility(above, Vec3::Z, 100.0), 1.0);
        assert_eq!(integrator.visibility(above, -Vec3::Z, 100.0), 0.0);
        // Floor lies beyond the query distance
        assert_eq!(integrator.visibility(above, -Vec3::Z, 4.0), 1.0);
        // Starting on the surface does not shadow itself
        assert_eq!(integrator.visibility(Vec3::ZERO, Vec3::Z, 100.0), 1.0);
    }
}
