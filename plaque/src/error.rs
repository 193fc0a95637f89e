//! Error types for plaque detection and measurement.

use std::path::PathBuf;

use common::ShapeError;
use thiserror::Error;

/// Errors raised by the detection and measurement pipeline.
///
/// Degenerate geometry (zero perimeter, tiny ellipses) is never an error;
/// those cases produce documented fallback values instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid array shape: {0}")]
    Shape(#[from] ShapeError),

    #[error("{what} must be non-empty, got {width}x{height}")]
    EmptyImage {
        what: &'static str,
        width: usize,
        height: usize,
    },

    #[error("size mismatch: image is {image:?}, mask is {mask:?} (width, height)")]
    SizeMismatch {
        image: (usize, usize),
        mask: (usize, usize),
    },

    #[error("{field} must contain only finite numbers, got {values:?}")]
    NonNumeric { field: &'static str, values: Vec<f64> },

    #[error("parameter '{key}' must be a number")]
    NonNumericParameter { key: String },

    #[error("connectivity must be 4 or 8, got {0}")]
    InvalidConnectivity(u32),

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("either a mask or a fixed threshold must be provided")]
    MissingMask,

    #[error("failed to load parameters from '{path}': {source}")]
    ConfigLoad {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("malformed parameters: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
