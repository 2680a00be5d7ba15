//! The renderer driver and its three visibility strategies.
//!
//! Shared per-frame state (matrices, bound buffers, clipped polygons, color
//! output) lives in one struct that every strategy composes; the public
//! [`Renderer`] dispatches to a strategy through a tagged variant.

mod hiz;
mod octree_hiz;
mod scanline;
mod state;
mod zbuffer;
mod zpyramid;

use std::sync::Arc;

use nalgebra::{Matrix4, Point3, Vector2, Vector3};

use crate::light::Light;

pub use self::state::Rgba8;

use self::hiz::HierZBufferRasterizer;
use self::octree_hiz::OctreeHierZBufferRasterizer;
use self::state::RasterCore;
use self::zbuffer::ZBufferRasterizer;

/// Visibility strategy backing a [`Renderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Scanline fill over a flat depth buffer.
    ZBuffer,
    /// Depth pyramid with frame-coherent per-triangle rejection.
    HierZBuffer,
    /// Depth pyramid plus loose-octree node rejection.
    OctreeHierZBuffer,
}

pub struct Renderer {
    inner: Inner,
}

enum Inner {
    ZBuffer(ZBufferRasterizer),
    Hier(HierZBufferRasterizer),
    Octree(OctreeHierZBufferRasterizer),
}

impl Renderer {
    pub fn new(strategy: Strategy) -> Renderer {
        let inner = match strategy {
            Strategy::ZBuffer => Inner::ZBuffer(ZBufferRasterizer::new()),
            Strategy::HierZBuffer => Inner::Hier(HierZBufferRasterizer::new()),
            Strategy::OctreeHierZBuffer => Inner::Octree(OctreeHierZBufferRasterizer::new()),
        };
        Renderer { inner }
    }

    pub fn strategy(&self) -> Strategy {
        match &self.inner {
            Inner::ZBuffer(_) => Strategy::ZBuffer,
            Inner::Hier(_) => Strategy::HierZBuffer,
            Inner::Octree(_) => Strategy::OctreeHierZBuffer,
        }
    }

    fn core(&self) -> &RasterCore {
        match &self.inner {
            Inner::ZBuffer(r) => &r.core,
            Inner::Hier(r) => &r.core,
            Inner::Octree(r) => &r.core,
        }
    }

    fn core_mut(&mut self) -> &mut RasterCore {
        match &mut self.inner {
            Inner::ZBuffer(r) => &mut r.core,
            Inner::Hier(r) => &mut r.core,
            Inner::Octree(r) => &mut r.core,
        }
    }

    /// Reallocates every size-dependent buffer and clears the coherence
    /// state.
    pub fn set_render_size(&mut self, width: u32, height: u32) {
        match &mut self.inner {
            Inner::ZBuffer(r) => r.set_render_size(width, height),
            Inner::Hier(r) => r.set_render_size(width, height),
            Inner::Octree(r) => r.set_render_size(width, height),
        }
    }

    /// Binds positions, optional per-vertex colors and flat triangle
    /// indices. The triangle count is `indices.len() / 3`, silently ignoring
    /// a trailing remainder. The octree strategy also rebuilds its spatial
    /// index, and frame-coherence state is dropped.
    pub fn set_vertex_data(
        &mut self,
        positions: Arc<Vec<Point3<f32>>>,
        colors: Option<Arc<Vec<Vector3<f32>>>>,
        indices: Arc<Vec<u32>>,
    ) {
        match &mut self.inner {
            Inner::ZBuffer(r) => r.core.bind_vertex_data(positions, colors, indices),
            Inner::Hier(r) => r.bind_vertex_data(positions, colors, indices),
            Inner::Octree(r) => r.bind_vertex_data(positions, colors, indices),
        }
    }

    /// Alternate bind used by textured meshes: positions and indices plus
    /// optional UV streams instead of colors.
    pub fn set_vertex_data_textured(
        &mut self,
        positions: Arc<Vec<Point3<f32>>>,
        indices: Arc<Vec<u32>>,
        uvs: Option<Arc<Vec<Vector2<f32>>>>,
        uv_indices: Option<Arc<Vec<u32>>>,
    ) {
        self.set_vertex_data(positions, None, indices);
        self.core_mut().set_uv_streams(uvs, uv_indices);
    }

    /// Attaches shading attribute streams. Normals switch the shader to
    /// ambient plus diffuse; UVs are interpolated but never sampled.
    pub fn set_texture_data(
        &mut self,
        uvs: Option<Arc<Vec<Vector2<f32>>>>,
        uv_indices: Option<Arc<Vec<u32>>>,
        normals: Option<Arc<Vec<Vector3<f32>>>>,
        normal_indices: Option<Arc<Vec<u32>>>,
    ) {
        self.core_mut()
            .bind_texture_data(uvs, uv_indices, normals, normal_indices);
    }

    pub fn set_model(&mut self, model: &Matrix4<f32>) {
        self.core_mut().set_model(model);
    }

    pub fn set_view(&mut self, view: &Matrix4<f32>) {
        self.core_mut().set_view(view);
    }

    pub fn set_projection(&mut self, proj: &Matrix4<f32>) {
        self.core_mut().set_projection(proj);
    }

    pub fn set_light(&mut self, light: &Light) {
        self.core_mut().light = *light;
    }

    /// Back-face culling is on by default.
    pub fn set_backface_culling(&mut self, enabled: bool) {
        self.core_mut().cull_backfaces = enabled;
    }

    /// Renders a frame. Infallible; the output buffer stays valid until the
    /// next call.
    pub fn render(&mut self) {
        match &mut self.inner {
            Inner::ZBuffer(r) => r.render(),
            Inner::Hier(r) => r.render(),
            Inner::Octree(r) => r.render(),
        }
    }

    /// The RGBA8 color buffer of the last frame, `width · height` pixels,
    /// row-major with y increasing upward.
    pub fn color_output(&self) -> &[Rgba8] {
        &self.core().color
    }
}
