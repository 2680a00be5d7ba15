//! Geometry shared by the vertex pipeline and the spatial index.

pub mod aabb;
pub mod clip;
pub mod vertex;

pub use self::aabb::Aabb;
pub use self::clip::{clip_polygon, ClipPlane, ALL_CLIP_PLANES};
pub use self::vertex::{ClipPolygon, ClipVertex, ShadePoint, Surface};
