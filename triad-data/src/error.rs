//! Error types for data loading.

use thiserror::Error;

/// Errors that can occur while loading snapshots or camera metadata.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PLY parsing error: {0}")]
    Ply(String),

    #[error("Missing '{field}' at vertex {index}")]
    MissingField { field: &'static str, index: usize },

    #[error("Frame {frame} lists {found} cameras, expected {expected}")]
    CameraCountMismatch {
        frame: usize,
        expected: usize,
        found: usize,
    },
}
