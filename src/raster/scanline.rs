//! Edge-table / active-edge-list scanline machinery.
//!
//! Every fill in the crate — full-resolution rasterization, the coarse
//! any-pass depth tests and the occlusion query's box triangles — walks the
//! same structures: edges bucketed by their starting row, spliced into an
//! active list as the sweep reaches them, and retired at their top row.

use std::cmp::Ordering;

use nalgebra::Vector2;
use smallvec::SmallVec;

use crate::geometry::{ClipPolygon, ShadePoint, Surface};
use crate::interpolate::Interpolate;

#[derive(Debug, Clone, Copy)]
pub(crate) struct EdgeNode {
    /// Bottom and top vertex indices into the originating polygon.
    pub v_bot: u8,
    pub v_top: u8,
    /// Originating triangle; only the baseline's merged table reads it.
    pub tri: u32,
    /// Last row this edge crosses, clamped into the target.
    pub ymax: u32,
    /// Current crossing x, stepped by `dx` per row.
    pub x: f32,
    pub dx: f32,
    /// Parameter along the edge from bottom to top, stepped by `dcoeff`.
    pub coeff: f32,
    pub dcoeff: f32,
}

impl EdgeNode {
    /// `(x, dx)` lexicographic order.
    #[inline]
    fn precedes(&self, other: &EdgeNode) -> bool {
        self.x < other.x || (self.x == other.x && self.dx < other.dx)
    }

    #[inline]
    fn order(a: &EdgeNode, b: &EdgeNode) -> Ordering {
        a.x.partial_cmp(&b.x)
            .unwrap_or(Ordering::Equal)
            .then(a.dx.partial_cmp(&b.dx).unwrap_or(Ordering::Equal))
    }
}

pub(crate) struct EdgeTable {
    rows: Vec<Vec<EdgeNode>>,
    pub active: Vec<EdgeNode>,
}

impl EdgeTable {
    pub fn new() -> EdgeTable {
        EdgeTable {
            rows: Vec::new(),
            active: Vec::new(),
        }
    }

    /// One bucket per scanline of the full-resolution target; fills at
    /// coarser pyramid levels index a prefix of the same buckets.
    pub fn resize(&mut self, height: u32) {
        self.rows.clear();
        self.rows.resize(height as usize, Vec::new());
        self.active.clear();
    }

    /// Ordered insertion into the bucket of the row the edge starts on.
    pub fn insert(&mut self, ymin: u32, node: EdgeNode) {
        let row = &mut self.rows[ymin as usize];
        let at = row.partition_point(|e| e.precedes(&node));
        row.insert(at, node);
    }

    /// Advances every active edge one row, then splices in the edges
    /// starting at `y` and restores `(x, dx)` order.
    pub fn open_row(&mut self, y: u32) {
        for edge in &mut self.active {
            edge.x += edge.dx;
            edge.coeff += edge.dcoeff;
        }
        let row = &mut self.rows[y as usize];
        if !row.is_empty() {
            let mut incoming = std::mem::take(row);
            incoming.append(&mut self.active);
            self.active = incoming;
        }
        self.active.sort_by(EdgeNode::order);
    }

    /// Retires edges ending on row `y`.
    pub fn close_row(&mut self, y: u32) {
        self.active.retain(|edge| edge.ymax != y);
    }

    /// Clears the active list and any buckets still holding unspliced
    /// edges, after an early-exit fill.
    pub fn clear_rows(&mut self, from: u32, to: u32) {
        self.active.clear();
        if self.rows.is_empty() {
            return;
        }
        let to = (to as usize).min(self.rows.len() - 1);
        for y in from as usize..=to {
            self.rows[y].clear();
        }
    }
}

/// Rounds a polygon's screen vertices and shifts them to a pyramid level.
pub(crate) fn project_to_level(poly: &ClipPolygon, level: u8) -> SmallVec<[Vector2<u32>; 9]> {
    poly.iter()
        .map(|v| {
            Vector2::new(
                (v.position.x.round() as u32) >> level,
                (v.position.y.round() as u32) >> level,
            )
        })
        .collect()
}

/// Emits the polygon's non-horizontal edges into the table, bucketed by
/// their starting row.
pub(crate) fn push_screen_edges(
    et: &mut EdgeTable,
    pts: &[Vector2<u32>],
    tri: u32,
    dims: Vector2<u32>,
) {
    let n = pts.len();
    for curr in 0..n {
        let next = (curr + 1) % n;
        let a = pts[curr];
        let b = pts[next];
        if a.y == b.y {
            continue;
        }

        let (bot, top, v_bot, v_top) = if a.y > b.y {
            (b, a, next as u8, curr as u8)
        } else {
            (a, b, curr as u8, next as u8)
        };
        let dy = (top.y - bot.y) as f32;

        let mut ymax = top.y;
        if ymax >= dims.y {
            ymax = dims.y - 1;
        }
        let node = EdgeNode {
            v_bot,
            v_top,
            tri,
            ymax,
            x: bot.x as f32,
            dx: (top.x as f32 - bot.x as f32) / dy,
            coeff: 0.0,
            dcoeff: 1.0 / dy,
        };

        // Where two rising edges meet in a vertex, the apex row must be
        // counted once, not twice, or the span through it runs to the
        // opposite edge of the polygon.
        let mut ymin = bot.y;
        if pts[(curr + 2) % n].y < ymin {
            ymin += 1;
        }
        if ymin >= dims.y {
            ymin = dims.y - 1;
        }
        et.insert(ymin, node);
    }
}

/// Endpoint-interpolated values for the span between a left and a right
/// edge on one row.
pub(crate) struct Span {
    pub lx: u32,
    pub rx: u32,
    dep: [f32; 2],
    rhw: [f32; 2],
    surface: [Surface; 2],
    shading: [Option<ShadePoint>; 2],
}

impl Span {
    /// Interpolates both edges at their current row parameter. The right
    /// end is clamped into the polygon's own screen box, which keeps span
    /// coverage identical across strategies.
    pub fn between(poly: &ClipPolygon, l: &EdgeNode, r: &EdgeNode, max_x: u32) -> Span {
        let end = |e: &EdgeNode| {
            let bot = &poly[e.v_bot as usize];
            let top = &poly[e.v_top as usize];
            let t = e.coeff;
            (
                Interpolate::linear_interpolate(t, &bot.position.z, &top.position.z),
                Interpolate::linear_interpolate(t, &bot.position.w, &top.position.w),
                Interpolate::linear_interpolate(t, &bot.surface, &top.surface),
                match (&bot.shading, &top.shading) {
                    (Some(a), Some(b)) => Some(Interpolate::linear_interpolate(t, a, b)),
                    _ => None,
                },
            )
        };
        let (ld, lw, ls, lsh) = end(l);
        let (rd, rw, rs, rsh) = end(r);

        let lx = l.x.round() as u32;
        let mut rx = r.x.round() as u32;
        if rx >= max_x && max_x != 0 {
            rx = max_x - 1;
        }

        Span {
            lx,
            rx,
            dep: [ld, rd],
            rhw: [lw, rw],
            surface: [ls, rs],
            shading: [lsh, rsh],
        }
    }

    /// Step of the span parameter per pixel; zero for degenerate spans.
    #[inline]
    pub fn dstep(&self) -> f32 {
        if self.rx <= self.lx {
            0.0
        } else {
            1.0 / (self.rx - self.lx) as f32
        }
    }

    #[inline]
    pub fn depth_at(&self, s: f32) -> f32 {
        self.dep[0] * (1.0 - s) + self.dep[1] * s
    }

    /// Perspective-corrected attributes at span parameter `s`: interpolate
    /// the reciprocal W, invert it, and scale the pre-divided attributes
    /// back up.
    pub fn attributes_at(&self, s: f32) -> (Surface, Option<ShadePoint>) {
        let w = 1.0 / Interpolate::linear_interpolate(s, &self.rhw[0], &self.rhw[1]);
        let surface =
            Interpolate::linear_interpolate(s, &self.surface[0], &self.surface[1]).scale(w);
        let shading = match (&self.shading[0], &self.shading[1]) {
            (Some(a), Some(b)) => Some(Interpolate::linear_interpolate(s, a, b).scale(w)),
            _ => None,
        };
        (surface, shading)
    }
}
