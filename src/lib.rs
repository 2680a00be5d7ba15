//! A CPU software rasterizer for indexed triangle meshes.
//!
//! Triangles are projected into screen space, clipped against the NDC cube,
//! filled with a scanline algorithm under a per-pixel depth test, and shaded
//! with a single point light. Three visibility strategies share that
//! pipeline:
//!
//! * [`Strategy::ZBuffer`] — plain depth-buffered scanline fill.
//! * [`Strategy::HierZBuffer`] — adds a 6-level depth pyramid used to reject
//!   whole triangles, seeded each frame with the triangles that were visible
//!   in the previous one.
//! * [`Strategy::OctreeHierZBuffer`] — additionally groups triangles into a
//!   loose octree so entire nodes can be rejected against the pyramid.
//!
//! All three produce identical images for identical inputs; they differ only
//! in how much work they skip.

pub mod error;
pub mod geometry;
pub mod interpolate;
pub mod light;
pub mod mesh;
pub mod octree;
pub mod raster;

pub use self::light::Light;
pub use self::mesh::{Mesh, MeshBuffers};
pub use self::raster::{Renderer, Rgba8, Strategy};
