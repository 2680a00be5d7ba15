//! Sutherland–Hodgman clipping against the NDC cube.
//!
//! Clipping runs after the perspective divide, so the planes are the fixed
//! faces of `[-1, 1]^3` rather than the `±w` half-spaces of clip space.

use crate::interpolate::Interpolate;

use super::vertex::{ClipPolygon, ClipVertex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipPlane {
    Left,
    Right,
    Bottom,
    Top,
    Near,
    Far,
}

/// All clipping planes, in the order the polygon is clipped against them.
pub const ALL_CLIP_PLANES: [ClipPlane; 6] = [
    ClipPlane::Left,
    ClipPlane::Right,
    ClipPlane::Bottom,
    ClipPlane::Top,
    ClipPlane::Near,
    ClipPlane::Far,
];

impl ClipPlane {
    /// Check if the plane has the given post-divide vertex inside of it.
    /// Points on the plane count as inside.
    #[inline]
    pub fn has_inside(self, v: &ClipVertex) -> bool {
        let p = &v.position;
        match self {
            ClipPlane::Left => p.x >= -1.0,
            ClipPlane::Right => p.x <= 1.0,
            ClipPlane::Bottom => p.y >= -1.0,
            ClipPlane::Top => p.y <= 1.0,
            ClipPlane::Near => p.z >= -1.0,
            ClipPlane::Far => p.z <= 1.0,
        }
    }

    /// Intersection of the edge `v1 → v2` with the plane. The parameter
    /// `t = a / (a - b)` blends the position and every attribute.
    #[inline]
    pub fn intersect(self, v1: &ClipVertex, v2: &ClipVertex) -> ClipVertex {
        let (p1, p2) = (&v1.position, &v2.position);

        let (a, b) = match self {
            ClipPlane::Left => (p1.x + 1.0, p2.x + 1.0),
            ClipPlane::Right => (1.0 - p1.x, 1.0 - p2.x),
            ClipPlane::Bottom => (p1.y + 1.0, p2.y + 1.0),
            ClipPlane::Top => (1.0 - p1.y, 1.0 - p2.y),
            ClipPlane::Near => (p1.z + 1.0, p2.z + 1.0),
            ClipPlane::Far => (1.0 - p1.z, 1.0 - p2.z),
        };

        let t = a / (a - b);

        Interpolate::linear_interpolate(t, v1, v2)
    }
}

/// Clips `poly` in place against all six NDC planes. An empty output means
/// the polygon lies wholly outside the frustum.
pub fn clip_polygon(poly: &mut ClipPolygon) {
    let mut input = ClipPolygon::new();

    for plane in ALL_CLIP_PLANES {
        input.clear();
        input.extend_from_slice(poly);
        poly.clear();

        let Some(&last) = input.last() else { return };

        let mut s = last;
        for &p in input.iter() {
            let s_in = plane.has_inside(&s);
            let p_in = plane.has_inside(&p);

            if s_in && p_in {
                poly.push(p);
            } else if s_in != p_in {
                poly.push(plane.intersect(&s, &p));
                if !s_in {
                    poly.push(p);
                }
            }

            s = p;
        }

        if poly.is_empty() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::{Vector3, Vector4};
    use smallvec::smallvec;

    use super::*;
    use crate::geometry::Surface;

    fn vertex(x: f32, y: f32, z: f32) -> ClipVertex {
        ClipVertex {
            position: Vector4::new(x, y, z, 1.0),
            surface: Surface::Color(Vector3::new(x, y, z)),
            shading: None,
        }
    }

    #[test]
    fn fully_inside_triangle_is_untouched() {
        let mut poly: ClipPolygon =
            smallvec![vertex(-0.5, -0.5, 0.0), vertex(0.5, -0.5, 0.0), vertex(0.0, 0.5, 0.0)];
        let before = poly.clone();

        clip_polygon(&mut poly);

        assert_eq!(poly.len(), 3);
        for (got, want) in poly.iter().zip(before.iter()) {
            assert!((got.position - want.position).norm() < 1e-6);
        }
    }

    #[test]
    fn fully_outside_triangle_is_rejected() {
        let mut poly: ClipPolygon =
            smallvec![vertex(2.0, 0.0, 0.0), vertex(3.0, 0.0, 0.0), vertex(2.5, 1.0, 0.0)];

        clip_polygon(&mut poly);

        assert!(poly.is_empty());
    }

    #[test]
    fn crossing_one_plane_adds_a_vertex() {
        // One vertex pokes out of the right plane; the quad-off corner makes
        // the output four vertices.
        let mut poly: ClipPolygon =
            smallvec![vertex(0.0, -0.5, 0.0), vertex(1.5, 0.0, 0.0), vertex(0.0, 0.5, 0.0)];

        clip_polygon(&mut poly);

        assert_eq!(poly.len(), 4);
        for v in &poly {
            assert!(v.position.x <= 1.0 + 1e-6);
        }
    }

    #[test]
    fn attributes_blend_at_the_crossing() {
        let mut poly: ClipPolygon =
            smallvec![vertex(0.0, 0.0, 0.0), vertex(2.0, 0.0, 0.0), vertex(0.0, 1.0, 0.0)];

        clip_polygon(&mut poly);

        // Every surviving color must interpolate the x coordinate it sits at.
        for v in &poly {
            match v.surface {
                Surface::Color(c) => assert!((c.x - v.position.x).abs() < 1e-6),
                _ => unreachable!(),
            }
        }
    }

    #[test]
    fn corner_cases_on_the_boundary_survive() {
        let mut poly: ClipPolygon =
            smallvec![vertex(-1.0, -1.0, 0.0), vertex(1.0, -1.0, 0.0), vertex(0.0, 1.0, 0.0)];

        clip_polygon(&mut poly);

        assert_eq!(poly.len(), 3);
    }
}
