use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for the vision application.
///
/// Each variant captures context specific to its error domain (filesystem,
/// image processing, parameter validation) so callers get usable diagnostics
/// without parsing error strings. thiserror generates the Display
/// implementations from the format strings.
#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image processing error: {operation} failed (file: {path})")]
    ImageProcessing {
        path: String,
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {field} {reason}")]
    Validation { field: String, reason: String },

    #[error("Batch error: {failed} of {total} frames failed")]
    Batch { failed: usize, total: usize },
}

pub type Result<T> = std::result::Result<T, VisionError>;

/// Convert anyhow errors to configuration errors.
///
/// Some boundaries hand us an anyhow::Error with no structure left. Rather
/// than threading the generic type through the crate, we flatten it into the
/// configuration category at the point of entry.
impl From<anyhow::Error> for VisionError {
    fn from(err: anyhow::Error) -> Self {
        VisionError::Configuration {
            message: err.to_string(),
        }
    }
}

/// Convert I/O errors to filesystem errors.
///
/// This conversion is a fallback for I/O errors that surface without path
/// context. Code that knows the path and operation should construct
/// VisionError::FileSystem directly.
impl From<std::io::Error> for VisionError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

/// Convert image crate errors to image processing errors.
impl From<image::ImageError> for VisionError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageProcessing {
            path: "unknown".to_string(),
            operation: "image processing".to_string(),
            source: Box::new(err),
        }
    }
}

/// Convert JSON errors to configuration errors. JSON only appears in the
/// parameter file and the report output, both configuration-adjacent.
impl From<serde_json::Error> for VisionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Configuration {
            message: err.to_string(),
        }
    }
}
