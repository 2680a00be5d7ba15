use nalgebra::{Vector2, Vector3, Vector4};
use smallvec::SmallVec;

use crate::interpolate::Interpolate;

/// Per-vertex surface datum, tagged by which buffers are bound to the
/// renderer. A polygon never mixes variants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Surface {
    /// Neither UVs nor colors are bound; shading falls back to white.
    White,
    /// Texture coordinates. Carried through interpolation but never sampled.
    Uv(Vector2<f32>),
    /// Per-vertex color.
    Color(Vector3<f32>),
}

impl Surface {
    #[inline]
    pub fn scale(self, s: f32) -> Surface {
        match self {
            Surface::White => Surface::White,
            Surface::Uv(uv) => Surface::Uv(uv * s),
            Surface::Color(c) => Surface::Color(c * s),
        }
    }
}

/// World-space shading attributes, present iff normals are bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadePoint {
    /// World-space normal (w = 0).
    pub normal: Vector4<f32>,
    /// World-space position (w = 1 before the reciprocal-W scale).
    pub world: Vector4<f32>,
}

impl ShadePoint {
    #[inline]
    pub fn scale(self, s: f32) -> ShadePoint {
        ShadePoint {
            normal: self.normal * s,
            world: self.world * s,
        }
    }
}

/// A vertex flowing through clipping and scanline conversion.
///
/// The perspective divide happens before clipping, so `position.w` holds the
/// reciprocal W and every attribute (including [`ShadePoint`]) is pre-scaled
/// by it; the rasterizer interpolates linearly and multiplies the recovered W
/// back per pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipVertex {
    pub position: Vector4<f32>,
    pub surface: Surface,
    pub shading: Option<ShadePoint>,
}

/// Clipping a triangle against six planes yields at most nine vertices. An
/// empty polygon marks a rejected triangle.
pub type ClipPolygon = SmallVec<[ClipVertex; 9]>;

impl Interpolate for Surface {
    #[inline]
    fn linear_interpolate(t: f32, x1: &Self, x2: &Self) -> Self {
        match (x1, x2) {
            (Surface::Uv(a), Surface::Uv(b)) => Surface::Uv(Interpolate::linear_interpolate(t, a, b)),
            (Surface::Color(a), Surface::Color(b)) => {
                Surface::Color(Interpolate::linear_interpolate(t, a, b))
            }
            _ => *x1,
        }
    }
}

impl Interpolate for ShadePoint {
    #[inline]
    fn linear_interpolate(t: f32, x1: &Self, x2: &Self) -> Self {
        ShadePoint {
            normal: Interpolate::linear_interpolate(t, &x1.normal, &x2.normal),
            world: Interpolate::linear_interpolate(t, &x1.world, &x2.world),
        }
    }
}

impl Interpolate for ClipVertex {
    #[inline]
    fn linear_interpolate(t: f32, x1: &Self, x2: &Self) -> Self {
        ClipVertex {
            position: Interpolate::linear_interpolate(t, &x1.position, &x2.position),
            surface: Interpolate::linear_interpolate(t, &x1.surface, &x2.surface),
            shading: match (&x1.shading, &x2.shading) {
                (Some(a), Some(b)) => Some(Interpolate::linear_interpolate(t, a, b)),
                _ => None,
            },
        }
    }
}
