use thiserror::Error;

/// Errors that can occur while loading or storing geometry.
#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported cache version {0}")]
    UnsupportedVersion(u32),

    #[error("malformed geometry data: {0}")]
    Malformed(String),
}

/// Result type for geometry operations.
pub type GeometryResult<T> = Result<T, GeometryError>;
