//! Custom error types for orientcrop.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the orientcrop library.
#[derive(Error, Debug)]
pub enum Error {
    /// The crop half of a method token is not a known crop method.
    #[error("invalid crop method {name:?}, expected one of none, center, random, center_full, random_full")]
    InvalidCropMethod { name: String },

    /// The interpolation half of a method token has no resampling kernel.
    #[error("unsupported interpolation {name:?}, expected one of nearest, bilinear, bicubic, lanczos, box, hamming")]
    UnsupportedInterpolation { name: String },

    /// Failed to read or decode an image file.
    #[error("failed to load image from {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Failed to save an image file.
    #[error("failed to save image to {path}: {source}")]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Shape mismatch between a batch and what the model returned for it.
    #[error("tensor shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// No records were supplied and the model cannot report its output shape.
    #[error("no records to predict and the model output shape is unknown")]
    EmptyDataset,

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Failed to load an ONNX model.
    #[error("failed to load ONNX model {name}: {source}")]
    ModelLoad {
        name: String,
        #[source]
        source: ort::Error,
    },

    /// Model inference failed.
    #[error("model inference failed: {source}")]
    Inference {
        #[source]
        source: ort::Error,
    },

    /// A manifest file is not valid JSON or has the wrong layout.
    #[error("failed to parse manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for orientcrop operations.
pub type Result<T> = std::result::Result<T, Error>;
