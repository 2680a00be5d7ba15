//! The depth pyramid and its conservative occlusion query.

use nalgebra::{Matrix4, Vector2, Vector4};

use crate::geometry::Aabb;

use super::scanline::{push_screen_edges, EdgeNode, EdgeTable};

/// Number of pyramid levels. Level 0 is the working depth buffer; every
/// level above stores the farthest depth of its 2×2 children.
pub(crate) const LEVELS: usize = 6;

pub(crate) struct ZPyramid {
    dims: [Vector2<u32>; LEVELS],
    levels: [Vec<f32>; LEVELS],
}

impl ZPyramid {
    pub fn new() -> ZPyramid {
        ZPyramid {
            dims: [Vector2::new(0, 0); LEVELS],
            levels: Default::default(),
        }
    }

    /// Each level halves the previous one by truncation, never dropping
    /// below 1×1 so the coarse levels stay addressable on small targets.
    pub fn resize(&mut self, size: Vector2<u32>) {
        let mut dims = size;
        for level in 0..LEVELS {
            self.dims[level] = dims;
            self.levels[level] = vec![f32::INFINITY; dims.x as usize * dims.y as usize];
            dims = Vector2::new((dims.x / 2).max(1), (dims.y / 2).max(1));
        }
    }

    /// Resets every level to the empty depth.
    pub fn clear(&mut self) {
        for level in &mut self.levels {
            level.fill(f32::INFINITY);
        }
    }

    #[inline]
    pub fn dims(&self, level: u8) -> Vector2<u32> {
        self.dims[level as usize]
    }

    #[inline]
    pub fn depth(&self, level: u8, index: usize) -> f32 {
        self.levels[level as usize][index]
    }

    /// Writes a level-0 depth and refreshes the max chain above it.
    pub fn write(&mut self, x: u32, y: u32, depth: f32) {
        let stride = self.dims[0].x as usize;
        self.levels[0][y as usize * stride + x as usize] = depth;
        self.propagate(x, y);
    }

    fn propagate(&mut self, mut x: u32, mut y: u32) {
        for level in 0..LEVELS - 1 {
            let w = self.dims[level].x;
            let h = self.dims[level].y;
            let stride = w as usize;

            // The 2×2 block partner sits left of an odd column, right of an
            // even one, and likewise for rows; at the border the same pixel
            // is sampled again.
            let src = &self.levels[level];
            let mut idx = y as usize * stride + x as usize;
            let mut far = src[idx];
            if x & 0x1 != 0 {
                idx -= 1;
            } else if x < w - 1 {
                idx += 1;
            }
            far = far.max(src[idx]);
            if y & 0x1 != 0 {
                idx -= stride;
            } else if y < h - 1 {
                idx += stride;
            }
            far = far.max(src[idx]);
            if x & 0x1 != 0 {
                idx += 1;
            } else if x < w - 1 {
                idx -= 1;
            }
            far = far.max(src[idx]);

            let up = self.dims[level + 1];
            x = (x >> 1).min(up.x - 1);
            y = (y >> 1).min(up.y - 1);
            self.levels[level + 1][y as usize * up.x as usize + x as usize] = far;
        }
    }

    /// The coarsest level whose dimensions fit within the smaller extent of
    /// the screen box; level 0 when even level 1 is too coarse for it.
    pub fn level_for(&self, min: Vector2<u32>, max: Vector2<u32>) -> u8 {
        let m = (max.x.saturating_sub(min.x)).min(max.y.saturating_sub(min.y));
        for level in (1..LEVELS).rev() {
            let dims = self.dims[level];
            // The box must still span a whole cell after the shift, or the
            // any-pass fill would see no samples at all.
            if dims.x <= m && dims.y <= m && (1u32 << level) <= m {
                return level as u8;
            }
        }
        0
    }
}

/// Face list of the box corners for the occlusion query: two triangles per
/// quad, using the corner bit layout of [`Aabb::corner`].
const BOX_INDICES: [usize; 36] = [
    1, 0, 2, 2, 3, 1, // -z
    4, 5, 7, 7, 6, 4, // +z
    0, 1, 5, 5, 4, 0, // -y
    6, 7, 3, 3, 2, 6, // +y
    0, 4, 6, 6, 2, 0, // -x
    5, 1, 3, 3, 7, 5, // +x
];

/// Conservative visibility of a world-space box against the pyramid.
///
/// The eight corners are projected and divided, the front-facing box
/// triangles are scanline-sampled at the coarsest level each fits, and any
/// sample at or in front of the stored depth proves visibility. A triangle
/// too small for even level 1 counts as visible outright. Only the
/// edge-table scratch is touched; the pyramid itself is read-only here.
pub(crate) fn aabb_visible(
    pyramid: &ZPyramid,
    et: &mut EdgeTable,
    aabb: &Aabb,
    mvp: &Matrix4<f32>,
    screen: Vector2<u32>,
) -> bool {
    let mut corners = [Vector4::zeros(); 8];
    for (v, corner) in corners.iter_mut().enumerate() {
        let mut p = mvp * aabb.corner(v as u8).to_homogeneous();
        let rhw = 1.0 / p.w;
        p.x *= rhw;
        p.y *= rhw;
        p.z *= rhw;
        p.w = rhw;
        *corner = p;
    }

    for face in 0..6 {
        let i = face * 6;

        // Quads wound away from the camera cannot prove visibility;
        // boundary cases count as facing.
        let v01 = (corners[BOX_INDICES[i + 1]] - corners[BOX_INDICES[i]]).xyz();
        let v02 = (corners[BOX_INDICES[i + 2]] - corners[BOX_INDICES[i]]).xyz();
        if v01.cross(&v02).z < 0.0 {
            continue;
        }

        for tri in 0..2 {
            let at = i + tri * 3;
            let idx = [
                BOX_INDICES[at],
                BOX_INDICES[at + 1],
                BOX_INDICES[at + 2],
            ];

            let mut pts = [Vector2::new(0u32, 0u32); 3];
            let mut min = Vector2::new(u32::MAX, u32::MAX);
            let mut max = Vector2::new(0u32, 0u32);
            for v in 0..3 {
                let c = &corners[idx[v]];
                pts[v] = Vector2::new(
                    ((c.x + 1.0) * 0.5 * screen.x as f32).round() as u32,
                    ((c.y + 1.0) * 0.5 * screen.y as f32).round() as u32,
                );
                fold_clamped(&mut min, &mut max, pts[v], screen);
            }

            let level = pyramid.level_for(min, max);
            if level == 0 {
                return true;
            }

            let dims = pyramid.dims(level);
            min = Vector2::new(u32::MAX, u32::MAX);
            max = Vector2::new(0u32, 0u32);
            for pt in &mut pts {
                *pt = Vector2::new(pt.x >> level, pt.y >> level);
                fold_clamped(&mut min, &mut max, *pt, dims);
            }

            push_screen_edges(et, &pts, 0, dims);
            let pass = any_sample_passes(pyramid, et, level, &idx, &corners, min, max);
            et.clear_rows(min.y.min(max.y), max.y);
            if pass {
                return true;
            }
        }
    }

    false
}

fn fold_clamped(
    min: &mut Vector2<u32>,
    max: &mut Vector2<u32>,
    pt: Vector2<u32>,
    dims: Vector2<u32>,
) {
    min.x = min.x.min(pt.x);
    min.y = min.y.min(pt.y);
    max.x = max.x.max(pt.x);
    max.y = max.y.max(pt.y);
    if max.x >= dims.x && dims.x != 0 {
        max.x = dims.x - 1;
    }
    if max.y >= dims.y && dims.y != 0 {
        max.y = dims.y - 1;
    }
}

/// Any-pass sweep of one box triangle at the given level.
fn any_sample_passes(
    pyramid: &ZPyramid,
    et: &mut EdgeTable,
    level: u8,
    idx: &[usize; 3],
    corners: &[Vector4<f32>; 8],
    min: Vector2<u32>,
    max: Vector2<u32>,
) -> bool {
    if min.y > max.y {
        return false;
    }
    let dims = pyramid.dims(level);
    let depth_of = |e: &EdgeNode| {
        let bot = corners[idx[e.v_bot as usize]].z;
        let top = corners[idx[e.v_top as usize]].z;
        bot * (1.0 - e.coeff) + top * e.coeff
    };

    for y in min.y..=max.y {
        et.open_row(y);
        if et.active.is_empty() {
            continue;
        }
        if et.active.len() >= 2 {
            let l = et.active[0];
            let r = et.active[1];
            let dep = [depth_of(&l), depth_of(&r)];

            let lx = l.x.round() as u32;
            let mut rx = r.x.round() as u32;
            if rx >= max.x && max.x != 0 {
                rx = max.x - 1;
            }
            let dstep = if rx <= lx { 0.0 } else { 1.0 / (rx - lx) as f32 };
            let row = y as usize * dims.x as usize;

            let mut s = 0.0;
            let mut x = lx;
            while x <= rx {
                let depth = dep[0] * (1.0 - s) + dep[1] * s;
                if depth <= pyramid.depth(level, row + x as usize) {
                    return true;
                }
                s += dstep;
                x += 1;
            }
        }
        et.close_row(y);
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_halve_down_to_one() {
        let mut pyramid = ZPyramid::new();
        pyramid.resize(Vector2::new(64, 64));
        assert_eq!(pyramid.dims(0), Vector2::new(64, 64));
        assert_eq!(pyramid.dims(1), Vector2::new(32, 32));
        assert_eq!(pyramid.dims(5), Vector2::new(2, 2));

        pyramid.resize(Vector2::new(4, 4));
        assert_eq!(pyramid.dims(2), Vector2::new(1, 1));
        assert_eq!(pyramid.dims(5), Vector2::new(1, 1));
    }

    #[test]
    fn writes_propagate_the_farthest_depth() {
        let mut pyramid = ZPyramid::new();
        pyramid.resize(Vector2::new(8, 8));

        pyramid.write(0, 0, 0.25);
        pyramid.write(1, 0, 0.5);
        pyramid.write(0, 1, -0.5);
        pyramid.write(1, 1, 0.1);

        // The 2×2 block maxes into level 1 at (0, 0); the untouched
        // neighbors stay at infinity, so the chain above remains empty.
        assert_eq!(pyramid.depth(1, 0), 0.5);
        assert_eq!(pyramid.depth(2, 0), f32::INFINITY);
    }

    #[test]
    fn full_level_zero_makes_every_level_consistent() {
        let mut pyramid = ZPyramid::new();
        pyramid.resize(Vector2::new(8, 8));
        for y in 0..8 {
            for x in 0..8 {
                pyramid.write(x, y, (y * 8 + x) as f32 / 64.0);
            }
        }

        for level in 0..LEVELS as u8 - 1 {
            let dims = pyramid.dims(level);
            let up = pyramid.dims(level + 1);
            for y in 0..dims.y {
                for x in 0..dims.x {
                    let child = pyramid.depth(level, (y * dims.x + x) as usize);
                    let px = (x / 2).min(up.x - 1);
                    let py = (y / 2).min(up.y - 1);
                    let parent = pyramid.depth(level + 1, (py * up.x + px) as usize);
                    assert!(
                        parent >= child,
                        "level {} ({}, {}) not covered above",
                        level,
                        x,
                        y
                    );
                }
            }
        }
    }

    #[test]
    fn level_selection_needs_room_for_a_cell() {
        let mut pyramid = ZPyramid::new();
        pyramid.resize(Vector2::new(1024, 1024));

        // A screen-filling box picks the coarsest level.
        assert_eq!(
            pyramid.level_for(Vector2::new(0, 0), Vector2::new(1023, 1023)),
            5
        );
        // A 40-pixel box also fits level 5 (32×32 cells of 32 px).
        assert_eq!(
            pyramid.level_for(Vector2::new(0, 0), Vector2::new(40, 40)),
            5
        );
        // A 20-pixel box is smaller than every mip level, so the test runs
        // at the base level.
        assert_eq!(
            pyramid.level_for(Vector2::new(100, 100), Vector2::new(120, 120)),
            0
        );
    }

    #[test]
    fn empty_pyramid_never_occludes() {
        let mut pyramid = ZPyramid::new();
        pyramid.resize(Vector2::new(64, 64));
        let mut et = EdgeTable::new();
        et.resize(64);

        let aabb = Aabb::new(
            nalgebra::Point3::new(-0.5, -0.5, -0.5),
            nalgebra::Point3::new(0.5, 0.5, 0.5),
        );
        assert!(aabb_visible(
            &pyramid,
            &mut et,
            &aabb,
            &Matrix4::identity(),
            Vector2::new(64, 64),
        ));
        assert!(et.active.is_empty());
    }

    #[test]
    fn a_near_curtain_occludes_a_far_box() {
        let mut pyramid = ZPyramid::new();
        pyramid.resize(Vector2::new(64, 64));
        let mut et = EdgeTable::new();
        et.resize(64);

        // Under perspective the on-axis box shows exactly one front face;
        // the side faces are back-facing and cannot sneak a pass through.
        let proj =
            nalgebra::Perspective3::new(1.0, 90.0f32.to_radians(), 0.1, 100.0).to_homogeneous();

        // A full-screen curtain at the depth of the z = -1 plane.
        let curtain = {
            let p = proj * Vector4::new(0.0, 0.0, -1.0, 1.0);
            p.z / p.w
        };
        for y in 0..64 {
            for x in 0..64 {
                pyramid.write(x, y, curtain);
            }
        }

        let far_box = Aabb::new(
            nalgebra::Point3::new(-0.5, -0.5, -4.1),
            nalgebra::Point3::new(0.5, 0.5, -3.9),
        );
        assert!(!aabb_visible(
            &pyramid,
            &mut et,
            &far_box,
            &proj,
            Vector2::new(64, 64),
        ));

        // A box in front of the curtain passes.
        let near_box = Aabb::new(
            nalgebra::Point3::new(-0.5, -0.5, -0.5),
            nalgebra::Point3::new(0.5, 0.5, -0.3),
        );
        assert!(aabb_visible(
            &pyramid,
            &mut et,
            &near_box,
            &proj,
            Vector2::new(64, 64),
        ));
    }
}
