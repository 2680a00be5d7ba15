//! The octree-accelerated hierarchical strategy.

use std::collections::HashSet;
use std::sync::Arc;

use nalgebra::{Point3, Vector3};
use tracing::{debug, trace};

use crate::geometry::Aabb;
use crate::octree::{NodeId, NodeKind, Octree};

use super::hiz::raster_face;
use super::scanline::EdgeTable;
use super::state::RasterCore;
use super::zpyramid::{aabb_visible, ZPyramid};

/// Hierarchical fill that rejects whole octree nodes against the pyramid
/// before looking at their triangles, with frame coherence over leaves.
pub(crate) struct OctreeHierZBufferRasterizer {
    pub core: RasterCore,
    pyramid: ZPyramid,
    et: EdgeTable,
    octree: Octree,
    /// Leaves whose triangles contributed in the previous frame.
    active_leaves: HashSet<NodeId>,
}

impl OctreeHierZBufferRasterizer {
    pub fn new() -> OctreeHierZBufferRasterizer {
        OctreeHierZBufferRasterizer {
            core: RasterCore::new(),
            pyramid: ZPyramid::new(),
            et: EdgeTable::new(),
            octree: Octree::new(),
            active_leaves: HashSet::new(),
        }
    }

    pub fn set_render_size(&mut self, width: u32, height: u32) {
        self.core.set_render_size(width, height);
        self.pyramid.resize(self.core.size);
        self.et.resize(height);
        self.active_leaves.clear();
    }

    pub fn bind_vertex_data(
        &mut self,
        positions: Arc<Vec<Point3<f32>>>,
        colors: Option<Arc<Vec<Vector3<f32>>>>,
        indices: Arc<Vec<u32>>,
    ) {
        self.core.bind_vertex_data(positions, colors, indices);
        // Node ids from the previous build would dangle into the new arena.
        self.active_leaves.clear();
        self.rebuild_octree();
    }

    fn rebuild_octree(&mut self) {
        let count = self.core.triangle_count;
        if count == 0 {
            self.octree.reset(Aabb::degenerate(Point3::origin()));
            return;
        }

        let positions = &self.core.positions;
        let indices = &self.core.indices;
        let mut aabbs = Vec::with_capacity(count);
        let mut ids = Vec::with_capacity(count);
        let mut scene = Aabb::empty();
        for tri in 0..count {
            let base = tri * 3;
            let mut aabb = Aabb::empty();
            for v in 0..3 {
                aabb.grow_point(&positions[indices[base + v] as usize]);
            }
            scene.grow(&aabb);
            aabbs.push(aabb);
            ids.push(tri as u32);
        }

        self.octree.reset(scene);
        self.octree.add(&aabbs, &ids);
        debug!(summary = ?self.octree.summary(), "octree rebuilt");
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

        let previous = std::mem::take(&mut self.active_leaves);
        let mut next = HashSet::with_capacity(previous.len());
        let mut drawn = 0usize;

        // Last frame's leaves first: they are the best guess at what seeds
        // the pyramid for the descent below.
        for &id in &previous {
            let loose = self.octree.node(id).loose_aabb;
            if aabb_visible(
                &self.pyramid,
                &mut self.et,
                &loose,
                &self.core.mvp,
                self.core.size,
            ) {
                drawn += self.draw_leaf(id);
                next.insert(id);
            }
        }

        let mut stack = vec![self.octree.root()];
        while let Some(id) = stack.pop() {
            if previous.contains(&id) {
                continue;
            }
            if let NodeKind::Leaf { entries } = &self.octree.node(id).kind {
                if entries.is_empty() {
                    continue;
                }
            }

            let loose = self.octree.node(id).loose_aabb;
            if !aabb_visible(
                &self.pyramid,
                &mut self.et,
                &loose,
                &self.core.mvp,
                self.core.size,
            ) {
                continue;
            }

            match &self.octree.node(id).kind {
                NodeKind::Leaf { .. } => {
                    drawn += self.draw_leaf(id);
                    next.insert(id);
                }
                NodeKind::Internal { children } => stack.extend(children.iter().copied()),
            }
        }

        trace!(leaves = next.len(), faces = drawn, "octree pass");
        self.active_leaves = next;
    }

    /// Rasterizes every surviving triangle of a leaf; returns how many.
    fn draw_leaf(&mut self, id: NodeId) -> usize {
        let NodeKind::Leaf { entries } = &self.octree.node(id).kind else {
            return 0;
        };
        let mut drawn = 0;
        for entry in entries {
            let tri = entry.id;
            if self.core.clipped[tri as usize].is_empty() {
                continue;
            }
            let (min, max) = self.core.screen_aabb(&self.core.clipped[tri as usize]);
            raster_face(&mut self.core, &mut self.pyramid, &mut self.et, tri, min, max);
            drawn += 1;
        }
        drawn
    }
}
