//! State and pipeline stages shared by every strategy.

use std::sync::Arc;

use nalgebra::{Matrix4, Point3, Vector2, Vector3};
use tracing::trace;

use crate::geometry::{clip_polygon, ClipPolygon, ClipVertex, ShadePoint, Surface};
use crate::light::Light;

/// One output pixel.
pub type Rgba8 = [u8; 4];

/// Matrices, light, bound mesh buffers and the per-triangle clip results.
///
/// Each strategy composes this struct and adds its own visibility state; the
/// pre-raster stage and the shader live here because they are identical for
/// all of them.
pub(crate) struct RasterCore {
    pub size: Vector2<u32>,
    pub resolution: usize,
    pub triangle_count: usize,

    model: Matrix4<f32>,
    view: Matrix4<f32>,
    proj: Matrix4<f32>,
    /// Always `proj · view · model` for the last set matrices.
    pub mvp: Matrix4<f32>,

    pub light: Light,
    pub cull_backfaces: bool,

    pub positions: Arc<Vec<Point3<f32>>>,
    pub indices: Arc<Vec<u32>>,
    colors: Option<Arc<Vec<Vector3<f32>>>>,
    uvs: Option<Arc<Vec<Vector2<f32>>>>,
    uv_indices: Option<Arc<Vec<u32>>>,
    normals: Option<Arc<Vec<Vector3<f32>>>>,
    normal_indices: Option<Arc<Vec<u32>>>,

    /// One clipped polygon per triangle; empty means rejected.
    pub clipped: Vec<ClipPolygon>,
    pub color: Vec<Rgba8>,
}

impl RasterCore {
    pub fn new() -> RasterCore {
        RasterCore {
            size: Vector2::new(0, 0),
            resolution: 0,
            triangle_count: 0,
            model: Matrix4::identity(),
            view: Matrix4::identity(),
            proj: Matrix4::identity(),
            mvp: Matrix4::identity(),
            light: Light::default(),
            cull_backfaces: true,
            positions: Arc::new(Vec::new()),
            indices: Arc::new(Vec::new()),
            colors: None,
            uvs: None,
            uv_indices: None,
            normals: None,
            normal_indices: None,
            clipped: Vec::new(),
            color: Vec::new(),
        }
    }

    pub fn set_render_size(&mut self, width: u32, height: u32) {
        self.size = Vector2::new(width, height);
        self.resolution = width as usize * height as usize;
        self.color = vec![[0; 4]; self.resolution];
    }

    pub fn bind_vertex_data(
        &mut self,
        positions: Arc<Vec<Point3<f32>>>,
        colors: Option<Arc<Vec<Vector3<f32>>>>,
        indices: Arc<Vec<u32>>,
    ) {
        self.triangle_count = indices.len() / 3;
        self.positions = positions;
        self.colors = colors;
        self.indices = indices;
        self.clipped = vec![ClipPolygon::new(); self.triangle_count];
    }

    pub fn bind_texture_data(
        &mut self,
        uvs: Option<Arc<Vec<Vector2<f32>>>>,
        uv_indices: Option<Arc<Vec<u32>>>,
        normals: Option<Arc<Vec<Vector3<f32>>>>,
        normal_indices: Option<Arc<Vec<u32>>>,
    ) {
        self.uvs = uvs;
        self.uv_indices = uv_indices;
        self.normals = normals;
        self.normal_indices = normal_indices;
    }

    pub fn set_uv_streams(
        &mut self,
        uvs: Option<Arc<Vec<Vector2<f32>>>>,
        uv_indices: Option<Arc<Vec<u32>>>,
    ) {
        self.uvs = uvs;
        self.uv_indices = uv_indices;
    }

    pub fn set_model(&mut self, model: &Matrix4<f32>) {
        self.model = *model;
        self.mvp = self.proj * self.view * self.model;
    }

    pub fn set_view(&mut self, view: &Matrix4<f32>) {
        self.view = *view;
        self.mvp = self.proj * self.view * self.model;
    }

    pub fn set_projection(&mut self, proj: &Matrix4<f32>) {
        self.proj = *proj;
        self.mvp = self.proj * self.view * self.model;
    }

    /// Transforms, rejects, clips and viewport-maps every triangle, leaving
    /// `clipped[t]` either empty or a convex screen-space polygon whose
    /// attributes are pre-scaled by the reciprocal W.
    pub fn run_pre_raster(&mut self) {
        let mvp = self.mvp;
        let model = self.model;
        let cull = self.cull_backfaces;
        let width = self.size.x as f32;
        let height = self.size.y as f32;

        let positions = &self.positions;
        let indices = &self.indices;
        let colors = self.colors.as_deref();
        let uvs = self.uvs.as_deref();
        let uv_indices = self.uv_indices.as_deref();
        let normals = self.normals.as_deref();
        let normal_indices = self.normal_indices.as_deref();

        let mut clipped_count = 0usize;

        for tri in 0..self.triangle_count {
            let out = &mut self.clipped[tri];
            out.clear();

            let base = tri * 3;
            let mut poly = ClipPolygon::new();
            let mut behind_eye = false;

            for v in 0..3 {
                let vi = indices[base + v] as usize;
                let mut position = mvp * positions[vi].to_homogeneous();

                // A vertex at or behind the eye plane rejects the whole
                // triangle; there is no per-vertex near clip.
                if position.w <= 0.0 {
                    behind_eye = true;
                    break;
                }

                let rhw = 1.0 / position.w;
                position.x *= rhw;
                position.y *= rhw;
                position.z *= rhw;
                position.w = rhw;

                let surface = match (uvs, uv_indices, colors) {
                    (Some(uvs), Some(uv_indices), _) => {
                        Surface::Uv(uvs[uv_indices[base + v] as usize] * rhw)
                    }
                    (_, _, Some(colors)) => Surface::Color(colors[vi] * rhw),
                    _ => Surface::White,
                };

                let shading = match (normals, normal_indices) {
                    (Some(normals), Some(normal_indices)) => {
                        let normal = model * normals[normal_indices[base + v] as usize].to_homogeneous();
                        let world = model * positions[vi].to_homogeneous();
                        Some(ShadePoint {
                            normal: normal * rhw,
                            world: world * rhw,
                        })
                    }
                    _ => None,
                };

                poly.push(ClipVertex {
                    position,
                    surface,
                    shading,
                });
            }

            if behind_eye {
                continue;
            }

            if cull {
                let a = (poly[1].position - poly[0].position).xyz();
                let b = (poly[2].position - poly[0].position).xyz();
                if a.cross(&b).z < 0.0 {
                    continue;
                }
            }

            *out = poly;
            clip_polygon(out);
            if out.is_empty() {
                continue;
            }

            for v in out.iter_mut() {
                v.position.x = (v.position.x + 1.0) * 0.5 * width;
                v.position.y = (v.position.y + 1.0) * 0.5 * height;
            }
            clipped_count += 1;
        }

        trace!(
            surviving = clipped_count,
            total = self.triangle_count,
            "pre-raster"
        );
    }

    /// Rounded screen bounding box of a clipped polygon, clamped into the
    /// render target.
    pub fn screen_aabb(&self, poly: &ClipPolygon) -> (Vector2<u32>, Vector2<u32>) {
        let mut min = Vector2::new(u32::MAX, u32::MAX);
        let mut max = Vector2::new(0u32, 0u32);
        for v in poly {
            let x = v.position.x.round() as u32;
            let y = v.position.y.round() as u32;
            min.x = min.x.min(x);
            min.y = min.y.min(y);
            max.x = max.x.max(x);
            max.y = max.y.max(y);
        }
        for i in 0..2 {
            if min[i] >= self.size[i] {
                min[i] = self.size[i] - 1;
            }
            if max[i] >= self.size[i] {
                max[i] = self.size[i] - 1;
            }
        }
        (min, max)
    }
}

/// Ambient plus Lambert diffuse when shading attributes are present, the
/// plain base color otherwise.
pub(crate) fn shade_sample(light: &Light, surface: Surface, shading: Option<ShadePoint>) -> Rgba8 {
    let base = match surface {
        Surface::Color(c) => c,
        Surface::Uv(_) | Surface::White => Vector3::new(1.0, 1.0, 1.0),
    };
    let rgb = match shading {
        Some(point) => {
            let ambient = light.ambient_strength * light.ambient_color;
            let normal = point.normal.xyz().normalize();
            let dir = (light.position.coords - point.world.xyz()).normalize();
            let diffuse = normal.dot(&dir).max(0.0) * light.color;
            (ambient + diffuse).component_mul(&base)
        }
        None => base,
    };
    rgb_to_rgba8(&rgb)
}

pub(crate) fn rgb_to_rgba8(rgb: &Vector3<f32>) -> Rgba8 {
    [
        (rgb.x * 255.0).clamp(0.0, 255.0) as u8,
        (rgb.y * 255.0).clamp(0.0, 255.0) as u8,
        (rgb.z * 255.0).clamp(0.0, 255.0) as u8,
        255,
    ]
}
