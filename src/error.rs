use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the cropper engine.
#[derive(Debug, Error)]
pub enum CropperError {
    /// The source image could not be resolved or decoded.
    #[error("failed to load image '{source_id}': {source}")]
    ImageLoad {
        source_id: String,
        #[source]
        source: image::ImageError,
    },
    /// An engine operation was issued before a render pass established the surface.
    #[error("surface has not been established; call render() first")]
    SurfaceNotEstablished,
    /// A drag event referenced a vertex outside the current polygon.
    #[error("vertex {index} does not exist (polygon has {count} vertices)")]
    UnknownVertex { index: usize, count: usize },
    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid JSON for [`CropperConfig`](crate::CropperConfig).
    #[error("invalid configuration at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// Writing an exported polygon failed.
    #[error("failed to export polygon to {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = CropperError> = std::result::Result<T, E>;
