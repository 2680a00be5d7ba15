use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("failed to read {path}")]
    Parse {
        path: String,
        #[source]
        source: tobj::LoadError,
    },
    #[error("mesh has no vertices or no faces")]
    Empty,
    #[error("{buffer} index count {got} does not match {expected}")]
    IndexMismatch {
        buffer: &'static str,
        got: usize,
        expected: usize,
    },
}

pub type MeshResult<T> = Result<T, MeshError>;
