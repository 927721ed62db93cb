//! Reflection and Fresnel refraction at a dielectric interface.

use ember_math::Vec3;

/// Mirror `v` about `n`: `2(n·v)n - v`.
///
/// Both vectors point away from the surface.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    2.0 * n.dot(v) * n - v
}

/// Outcome of light meeting a dielectric boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interface {
    /// No transmitted ray exists; all light follows `reflected`.
    TotalInternalReflection { reflected: Vec3 },
    /// Light splits between the two directions.
    Refraction {
        reflected: Vec3,
        refracted: Vec3,
        /// Unpolarised Fresnel reflectance
        reflectance: f32,
        /// `1 - reflectance`
        transmittance: f32,
    },
}

impl Interface {
    pub fn reflected(&self) -> Vec3 {
        match *self {
            Interface::TotalInternalReflection { reflected } => reflected,
            Interface::Refraction { reflected, .. } => reflected,
        }
    }
}

/// Split an incoming ray at a boundary between media `n1` and `n2`.
///
/// `direction` is the unit incoming direction and `normal` the unit normal
/// oriented against it. A discriminant of exactly zero counts as total
/// internal reflection.
pub fn fresnel(direction: Vec3, normal: Vec3, n1: f32, n2: f32) -> Interface {
    let view = -direction;
    let cos1 = normal.dot(view);
    let reflected = 2.0 * cos1 * normal - view;

    let eta = n1 / n2;
    let k = 1.0 - eta * eta * (1.0 - cos1 * cos1);
    if k <= 0.0 {
        return Interface::TotalInternalReflection { reflected };
    }

    let cos2 = k.sqrt();
    let refracted = eta * direction + (eta * cos1 - cos2) * normal;

    let rs = ((n2 * cos2 - n1 * cos1) / (n2 * cos2 + n1 * cos1)).powi(2);
    let rp = ((n2 * cos1 - n1 * cos2) / (n2 * cos1 + n1 * cos2)).powi(2);
    let reflectance = (rs + rp) / 2.0;

    Interface::Refraction {
        reflected,
        refracted,
        reflectance,
        transmittance: 1.0 - reflectance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect() {
        let v = Vec3::new(1.0, 0.0, 1.0).normalize();
        let r = reflect(v, Vec3::Z);
        assert!((r - Vec3::new(-1.0, 0.0, 1.0).normalize()).length() < 1e-6);

        // Straight back along the normal
        assert_eq!(reflect(Vec3::Z, Vec3::Z), Vec3::Z);
    }

    #[test]
    fn test_matched_media_have_no_interface() {
        let direction = Vec3::new(0.3, -0.2, -1.0).normalize();
        match fresnel(direction, Vec3::Z, 1.5, 1.5) {
            Interface::Refraction {
                refracted,
                reflectance,
                transmittance,
                ..
            } => {
                assert!(reflectance.abs() < 1e-6);
                assert!((transmittance - 1.0).abs() < 1e-6);
                assert!((refracted - direction).length() < 1e-5);
            }
            other => panic!("expected refraction, got {:?}", other),
        }
    }

    #[test]
    fn test_normal_incidence_reflectance() {
        match fresnel(-Vec3::Z, Vec3::Z, 1.0, 1.5) {
            Interface::Refraction {
                reflected,
                refracted,
                reflectance,
                transmittance,
            } => {
                assert!((reflectance - 0.04).abs() < 1e-5);
                assert!((transmittance - 0.96).abs() < 1e-5);
                assert!((reflected - Vec3::Z).length() < 1e-6);
                assert!((refracted + Vec3::Z).length() < 1e-5);
            }
            other => panic!("expected refraction, got {:?}", other),
        }
    }

    #[test]
    fn test_refraction_bends_towards_normal() {
        let direction = Vec3::new(1.0, 0.0, -1.0).normalize();
        let Interface::Refraction { refracted, .. } = fresnel(direction, Vec3::Z, 1.0, 1.5)
        else {
            panic!("expected refraction");
        };

        // Snell: sin2 = sin1 / 1.5
        let sin2 = refracted.x / refracted.length();
        assert!((sin2 - (0.5f32.sqrt() / 1.5)).abs() < 1e-5);
        assert!(refracted.z < 0.0);
    }

    #[test]
    fn test_total_internal_reflection() {
        // 60 degrees from the normal, leaving glass into air
        let direction = Vec3::new(3f32.sqrt() / 2.0, 0.0, -0.5);
        let interface = fresnel(direction, Vec3::Z, 1.5, 1.0);

        assert!(matches!(
            interface,
            Interface::TotalInternalReflection { .. }
        ));
        let expected = Vec3::new(3f32.sqrt() / 2.0, 0.0, 0.5);
        assert!((interface.reflected() - expected).length() < 1e-5);
    }
}
