use nalgebra::{Point3, Vector3};

/// A single point light with a global ambient term.
///
/// Shading is ambient plus Lambert diffuse; there is no specular term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub ambient_strength: f32,
    pub ambient_color: Vector3<f32>,
    /// World-space light position.
    pub position: Point3<f32>,
    /// Diffuse light color.
    pub color: Vector3<f32>,
}

impl Light {
    pub fn new(
        ambient_strength: f32,
        ambient_color: Vector3<f32>,
        position: Point3<f32>,
        color: Vector3<f32>,
    ) -> Light {
        Light {
            ambient_strength,
            ambient_color,
            position,
            color,
        }
    }
}

impl Default for Light {
    /// A white light at the origin with no ambient contribution.
    fn default() -> Light {
        Light {
            ambient_strength: 0.0,
            ambient_color: Vector3::new(1.0, 1.0, 1.0),
            position: Point3::origin(),
            color: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}
