//! Error type shared by every pipeline stage.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("input image not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("failed to decode input image {}: {source}", .path.display())]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Classification marked every pixel as water, so there is nothing to
    /// normalize elevation against.
    #[error("classification produced no land pixels ({water_pixels} water pixels)")]
    EmptyLandSet { water_pixels: usize },

    #[error("invalid raster dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read config {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to serialize map info: {0}")]
    Metadata(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TerrainError>;
