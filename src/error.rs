//! # Error Types
//!
//! A single error enum covers every stage of the pipeline. Nothing is retried:
//! any variant returned from a stage aborts the run.

use thiserror::Error;

use crate::projection::ProjectionError;
use crate::timeaxis::TimeAxisError;

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, Nc2GifError>;

/// Errors that can occur while loading inputs, rendering frames or writing the animation.
#[derive(Error, Debug)]
pub enum Nc2GifError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON configuration error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML configuration error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Variable '{variable}' not found in {path}")]
    MissingVariable { variable: String, path: String },

    #[error("Attribute '{attribute}' missing on variable '{variable}'")]
    MissingAttribute { variable: String, attribute: String },

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Invalid time axis: {0}")]
    TimeAxis(#[from] TimeAxisError),

    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Output '{0}' already exists (use --force to overwrite)")]
    OutputExists(String),
}
