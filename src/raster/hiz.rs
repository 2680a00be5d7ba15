//! The simple hierarchical strategy and the pyramid-backed face fill.

use std::collections::HashSet;
use std::sync::Arc;

use nalgebra::{Point3, Vector2, Vector3};
use tracing::trace;

use super::scanline::{project_to_level, push_screen_edges, EdgeTable, Span};
use super::state::{shade_sample, RasterCore};
use super::zpyramid::ZPyramid;

/// Scanline fill gated by a depth pyramid, drawing last frame's visible
/// triangles first so the pyramid rejects as much of the rest as possible.
pub(crate) struct HierZBufferRasterizer {
    pub core: RasterCore,
    pyramid: ZPyramid,
    et: EdgeTable,
    /// Triangles that produced at least one pass in the previous frame.
    visible: HashSet<u32>,
}

impl HierZBufferRasterizer {
    pub fn new() -> HierZBufferRasterizer {
        HierZBufferRasterizer {
            core: RasterCore::new(),
            pyramid: ZPyramid::new(),
            et: EdgeTable::new(),
            visible: HashSet::new(),
        }
    }

    pub fn set_render_size(&mut self, width: u32, height: u32) {
        self.core.set_render_size(width, height);
        self.pyramid.resize(self.core.size);
        self.et.resize(height);
        self.visible.clear();
    }

    pub fn bind_vertex_data(
        &mut self,
        positions: Arc<Vec<Point3<f32>>>,
        colors: Option<Arc<Vec<Vector3<f32>>>>,
        indices: Arc<Vec<u32>>,
    ) {
        self.core.bind_vertex_data(positions, colors, indices);
        self.visible.clear();
    }

    pub fn render(&mut self) {
        self.core.run_pre_raster();
        self.raster();
    }

    fn raster(&mut self) {
        if self.core.resolution == 0 {
            return;
        }
        self.core.color.fill([0; 4]);
        self.pyramid.clear();

        // Take last frame's set, draw it first, rebuild from scratch. The
        // reject test reads the pyramid as it fills, so this ordering is
        // what makes the second phase cheap.
        let previous = std::mem::take(&mut self.visible);
        let mut next = HashSet::with_capacity(previous.len());

        for &tri in &previous {
            if draw_face(&mut self.core, &mut self.pyramid, &mut self.et, tri) {
                next.insert(tri);
            }
        }
        for tri in 0..self.core.triangle_count as u32 {
            if !previous.contains(&tri)
                && draw_face(&mut self.core, &mut self.pyramid, &mut self.et, tri)
            {
                next.insert(tri);
            }
        }

        trace!(
            drawn = next.len(),
            total = self.core.triangle_count,
            "hierarchical pass"
        );
        self.visible = next;
    }
}

/// Depth-tests one clipped triangle against the pyramid and rasterizes it
/// when it survives. Returns whether it was drawn.
fn draw_face(core: &mut RasterCore, pyramid: &mut ZPyramid, et: &mut EdgeTable, tri: u32) -> bool {
    if core.clipped[tri as usize].is_empty() {
        return false;
    }
    let (min, max) = core.screen_aabb(&core.clipped[tri as usize]);
    if !face_visible(core, pyramid, et, tri, min, max) {
        return false;
    }
    raster_face(core, pyramid, et, tri, min, max);
    true
}

/// Any-pass depth test of the polygon at the coarsest pyramid level its
/// screen box fits, exiting on the first sample at or in front of the
/// stored depth.
fn face_visible(
    core: &RasterCore,
    pyramid: &ZPyramid,
    et: &mut EdgeTable,
    tri: u32,
    min: Vector2<u32>,
    max: Vector2<u32>,
) -> bool {
    let poly = &core.clipped[tri as usize];
    let level = pyramid.level_for(min, max);
    let min = Vector2::new(min.x >> level, min.y >> level);
    let max = Vector2::new(max.x >> level, max.y >> level);
    let dims = pyramid.dims(level);

    push_screen_edges(et, &project_to_level(poly, level), 0, dims);

    let mut pass = false;
    'rows: for y in min.y..=max.y {
        et.open_row(y);
        if et.active.is_empty() {
            continue;
        }
        if et.active.len() >= 2 {
            let l = et.active[0];
            let r = et.active[1];
            let span = Span::between(poly, &l, &r, max.x);
            let dstep = span.dstep();
            let row = y as usize * dims.x as usize;

            let mut s = 0.0;
            let mut x = span.lx;
            while x <= span.rx {
                if span.depth_at(s) <= pyramid.depth(level, row + x as usize) {
                    pass = true;
                    break 'rows;
                }
                s += dstep;
                x += 1;
            }
        }
        et.close_row(y);
    }

    et.clear_rows(min.y, max.y);
    pass
}

/// Full-resolution fill of one clipped polygon, writing depth through the
/// pyramid so rejection tightens within the frame. Shared with the octree
/// strategy.
pub(crate) fn raster_face(
    core: &mut RasterCore,
    pyramid: &mut ZPyramid,
    et: &mut EdgeTable,
    tri: u32,
    min: Vector2<u32>,
    max: Vector2<u32>,
) {
    let dims = core.size;
    push_screen_edges(
        et,
        &project_to_level(&core.clipped[tri as usize], 0),
        0,
        dims,
    );

    for y in min.y..=max.y {
        et.open_row(y);
        if et.active.is_empty() {
            continue;
        }
        if et.active.len() >= 2 {
            let l = et.active[0];
            let r = et.active[1];
            let span = Span::between(&core.clipped[tri as usize], &l, &r, max.x);
            let dstep = span.dstep();
            let row = y as usize * dims.x as usize;

            let mut s = 0.0;
            let mut x = span.lx;
            while x <= span.rx {
                let index = row + x as usize;
                let depth = span.depth_at(s);
                if depth < pyramid.depth(0, index) {
                    pyramid.write(x, y, depth);
                    let (surface, shading) = span.attributes_at(s);
                    core.color[index] = shade_sample(&core.light, surface, shading);
                }
                s += dstep;
                x += 1;
            }
        }
        et.close_row(y);
    }
}
