use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing a package manifest
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to serialize manifest: {0}")]
    Serialize(String),

    #[error("No package.json found at or above {}", .0.display())]
    NotFound(PathBuf),

    #[error("{} does not contain a JSON object", .0.display())]
    NotAnObject(PathBuf),

    #[error("Field '{field}' in {} is not an object", path.display())]
    InvalidField { field: String, path: PathBuf },

    #[error("{} was modified by another process since it was read; refusing to overwrite", .0.display())]
    ConcurrentModification(PathBuf),
}
