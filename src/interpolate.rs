//! Linear interpolation across vertex attributes.

use nalgebra::{Vector2, Vector3, Vector4};

/// Describes a type that can be linearly blended between two samples.
///
/// Clipping blends along a polygon edge, scanline conversion blends along a
/// screen edge and then along a span; both go through this trait.
pub trait Interpolate {
    fn linear_interpolate(t: f32, x1: &Self, x2: &Self) -> Self;
}

/// Convenience function for linearly interpolating two values.
#[inline]
pub fn linear_interpolate<T: Interpolate>(t: f32, x1: &T, x2: &T) -> T {
    Interpolate::linear_interpolate(t, x1, x2)
}

impl Interpolate for f32 {
    #[inline(always)]
    fn linear_interpolate(t: f32, x1: &Self, x2: &Self) -> Self {
        (1.0 - t) * x1 + t * x2
    }
}

impl Interpolate for Vector2<f32> {
    #[inline]
    fn linear_interpolate(t: f32, x1: &Self, x2: &Self) -> Self {
        x1 * (1.0 - t) + x2 * t
    }
}

impl Interpolate for Vector3<f32> {
    #[inline]
    fn linear_interpolate(t: f32, x1: &Self, x2: &Self) -> Self {
        x1 * (1.0 - t) + x2 * t
    }
}

impl Interpolate for Vector4<f32> {
    #[inline]
    fn linear_interpolate(t: f32, x1: &Self, x2: &Self) -> Self {
        x1 * (1.0 - t) + x2 * t
    }
}
