//! Error types for scene loading and image output.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for ctray operations.
///
/// Geometric degeneracies are not errors; intersectors report them as misses.
#[derive(Error, Debug)]
pub enum Error {
    /// A file could not be read or written
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// CT metadata is missing a key or holds an unusable value
    #[error("Invalid volume metadata: {0}")]
    InvalidMetadata(String),

    /// Raw voxel data does not match the declared resolution
    #[error("Voxel count mismatch: expected {expected} bytes, got {actual}")]
    VoxelCountMismatch {
        /// nx * ny * nz
        expected: usize,
        /// Bytes actually supplied
        actual: usize,
    },

    /// Scene file is not valid TOML for the scene schema
    #[error("Scene parse error: {0}")]
    Scene(#[from] toml::de::Error),

    /// Scene file parsed but describes an unusable scene
    #[error("Invalid scene: {0}")]
    InvalidScene(String),

    /// PNG encoding failed
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// EXR encoding failed
    #[error("EXR error: {0}")]
    Exr(#[from] exr::error::Error),

    /// Output path has an extension we cannot write
    #[error("Unsupported output format '{0}' (expected .png or .exr)")]
    UnsupportedOutput(String),
}

impl Error {
    /// Wrap an I/O error with the path that caused it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// Result type for ctray operations.
pub type Result<T> = std::result::Result<T, Error>;
