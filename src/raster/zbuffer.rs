//! The baseline depth-buffered rasterizer.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use nalgebra::Vector2;

use super::scanline::{project_to_level, push_screen_edges, EdgeNode, EdgeTable, Span};
use super::state::{shade_sample, RasterCore};

/// Scanline fill over one merged edge table with a flat depth buffer.
///
/// Edges from every surviving triangle share the table; on each row the
/// left/right pair of a triangle is matched back up through a map keyed by
/// triangle index. A triangle contributes at most two edges per row, so
/// interleaving with other triangles cannot mispair.
pub(crate) struct ZBufferRasterizer {
    pub core: RasterCore,
    zbuffer: Vec<f32>,
    et: EdgeTable,
}

impl ZBufferRasterizer {
    pub fn new() -> ZBufferRasterizer {
        ZBufferRasterizer {
            core: RasterCore::new(),
            zbuffer: Vec::new(),
            et: EdgeTable::new(),
        }
    }

    pub fn set_render_size(&mut self, width: u32, height: u32) {
        self.core.set_render_size(width, height);
        self.zbuffer = vec![f32::INFINITY; self.core.resolution];
        self.et.resize(height);
    }

    pub fn render(&mut self) {
        self.core.run_pre_raster();
        self.raster();
    }

    fn raster(&mut self) {
        if self.core.resolution == 0 {
            return;
        }
        let dims = self.core.size;
        self.core.color.fill([0; 4]);
        self.zbuffer.fill(f32::INFINITY);

        // Screen boxes double as the per-triangle right-end span clamp.
        let boxes: Vec<Option<(Vector2<u32>, Vector2<u32>)>> = self
            .core
            .clipped
            .iter()
            .map(|poly| (!poly.is_empty()).then(|| self.core.screen_aabb(poly)))
            .collect();

        for (tri, poly) in self.core.clipped.iter().enumerate() {
            if !poly.is_empty() {
                push_screen_edges(&mut self.et, &project_to_level(poly, 0), tri as u32, dims);
            }
        }

        let mut pairs: HashMap<u32, EdgeNode> = HashMap::new();
        for y in 0..dims.y {
            self.et.open_row(y);
            if self.et.active.is_empty() {
                continue;
            }

            pairs.clear();
            for i in 0..self.et.active.len() {
                let right = self.et.active[i];
                let left = match pairs.entry(right.tri) {
                    Entry::Vacant(slot) => {
                        slot.insert(right);
                        continue;
                    }
                    Entry::Occupied(slot) => slot.remove(),
                };

                let Some((_, max)) = boxes[right.tri as usize] else {
                    continue;
                };
                let poly = &self.core.clipped[right.tri as usize];
                let span = Span::between(poly, &left, &right, max.x);
                let dstep = span.dstep();
                let row = y as usize * dims.x as usize;

                let mut s = 0.0;
                let mut x = span.lx;
                while x <= span.rx {
                    let index = row + x as usize;
                    let depth = span.depth_at(s);
                    if depth < self.zbuffer[index] {
                        self.zbuffer[index] = depth;
                        let (surface, shading) = span.attributes_at(s);
                        self.core.color[index] = shade_sample(&self.core.light, surface, shading);
                    }
                    s += dstep;
                    x += 1;
                }
            }

            self.et.close_row(y);
        }
    }
}
