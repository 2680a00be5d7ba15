//! Wavefront OBJ loading and the shared buffers the renderer binds.

use std::path::Path;
use std::sync::Arc;

use nalgebra::{Point3, Vector2, Vector3};
use tracing::debug;

use crate::error::{MeshError, MeshResult};

/// A triangle mesh as loaded from disk.
///
/// Positions, UVs and normals each keep their own flat index array of
/// `3 · face_count` entries, as OBJ faces index them independently.
#[derive(Debug, Default, Clone)]
pub struct Mesh {
    pub positions: Vec<Point3<f32>>,
    pub indices: Vec<u32>,
    pub uvs: Vec<Vector2<f32>>,
    pub uv_indices: Vec<u32>,
    pub normals: Vec<Vector3<f32>>,
    pub normal_indices: Vec<u32>,
}

/// Reference-counted mesh buffers, shareable between renderers. None of the
/// renderers mutate them.
#[derive(Debug, Clone)]
pub struct MeshBuffers {
    pub positions: Arc<Vec<Point3<f32>>>,
    pub indices: Arc<Vec<u32>>,
    pub uvs: Option<Arc<Vec<Vector2<f32>>>>,
    pub uv_indices: Option<Arc<Vec<u32>>>,
    pub normals: Option<Arc<Vec<Vector3<f32>>>>,
    pub normal_indices: Option<Arc<Vec<u32>>>,
}

impl Mesh {
    /// Loads a triangulated mesh from a Wavefront OBJ file.
    ///
    /// Quads are split into two triangles, 1-based file indices arrive
    /// already decremented, and per-face normals are generated when the file
    /// carries none. Fails on unreadable files and on meshes with no
    /// vertices or no faces.
    pub fn load_obj<P: AsRef<Path>>(path: P) -> MeshResult<Mesh> {
        let path = path.as_ref();
        let (models, _materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: false,
                ..Default::default()
            },
        )
        .map_err(|source| MeshError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        // UVs and normals are kept only when every model provides them, so
        // the merged index arrays stay aligned with the position indices.
        let with_uvs = !models.is_empty()
            && models.iter().all(|m| !m.mesh.texcoord_indices.is_empty());
        let with_normals = !models.is_empty()
            && models.iter().all(|m| !m.mesh.normal_indices.is_empty());

        let mut mesh = Mesh::default();
        for model in &models {
            let m = &model.mesh;

            let pos_base = mesh.positions.len() as u32;
            mesh.positions.extend(
                m.positions
                    .chunks_exact(3)
                    .map(|p| Point3::new(p[0], p[1], p[2])),
            );
            mesh.indices.extend(m.indices.iter().map(|i| i + pos_base));

            if with_uvs {
                let uv_base = mesh.uvs.len() as u32;
                mesh.uvs
                    .extend(m.texcoords.chunks_exact(2).map(|t| Vector2::new(t[0], t[1])));
                mesh.uv_indices
                    .extend(m.texcoord_indices.iter().map(|i| i + uv_base));
            }
            if with_normals {
                let n_base = mesh.normals.len() as u32;
                mesh.normals.extend(
                    m.normals
                        .chunks_exact(3)
                        .map(|n| Vector3::new(n[0], n[1], n[2])),
                );
                mesh.normal_indices
                    .extend(m.normal_indices.iter().map(|i| i + n_base));
            }
        }

        if mesh.positions.is_empty() || mesh.indices.is_empty() {
            return Err(MeshError::Empty);
        }

        if mesh.normal_indices.is_empty() {
            mesh.generate_normals();
        }

        mesh.validate()?;

        debug!(
            path = %path.display(),
            vertices = mesh.positions.len(),
            faces = mesh.indices.len() / 3,
            uvs = mesh.uvs.len(),
            normals = mesh.normals.len(),
            "loaded mesh"
        );

        Ok(mesh)
    }

    /// One flat, unnormalized normal per face; shading normalizes per pixel.
    fn generate_normals(&mut self) {
        let faces = self.indices.len() / 3;
        self.normals.reserve(faces);
        self.normal_indices.reserve(faces * 3);
        for face in 0..faces {
            let i = face * 3;
            let v0 = &self.positions[self.indices[i] as usize];
            let v1 = &self.positions[self.indices[i + 1] as usize];
            let v2 = &self.positions[self.indices[i + 2] as usize];
            self.normals.push((v1 - v0).cross(&(v2 - v0)));
            let f = face as u32;
            self.normal_indices.extend_from_slice(&[f, f, f]);
        }
    }

    /// Every present index array must pair each position index triple.
    pub fn validate(&self) -> MeshResult<()> {
        let expected = self.indices.len();
        if !self.uv_indices.is_empty() && self.uv_indices.len() != expected {
            return Err(MeshError::IndexMismatch {
                buffer: "uv",
                got: self.uv_indices.len(),
                expected,
            });
        }
        if !self.normal_indices.is_empty() && self.normal_indices.len() != expected {
            return Err(MeshError::IndexMismatch {
                buffer: "normal",
                got: self.normal_indices.len(),
                expected,
            });
        }
        Ok(())
    }

    /// Wraps the arrays in shared buffers ready to bind to a renderer.
    pub fn into_buffers(self) -> MeshBuffers {
        let uvs = (!self.uvs.is_empty()).then(|| Arc::new(self.uvs));
        let uv_indices = (!self.uv_indices.is_empty()).then(|| Arc::new(self.uv_indices));
        let normals = (!self.normals.is_empty()).then(|| Arc::new(self.normals));
        let normal_indices =
            (!self.normal_indices.is_empty()).then(|| Arc::new(self.normal_indices));
        MeshBuffers {
            positions: Arc::new(self.positions),
            indices: Arc::new(self.indices),
            uvs,
            uv_indices,
            normals,
            normal_indices,
        }
    }
}
