//! Error types for motion tracking.

use thiserror::Error;

/// Boxed error returned by estimator implementations.
pub type EstimatorError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while scheduling, filtering or compensating motion.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("Camera {camera} frame {frame}: {field} differs from the first frame")]
    ViewMismatch {
        camera: usize,
        frame: usize,
        field: &'static str,
    },

    #[error("View {view} has {found} frames, expected {expected}")]
    SequenceLengthMismatch {
        view: usize,
        expected: usize,
        found: usize,
    },

    #[error("Dataset has no cameras or no frames")]
    EmptyDataset,

    #[error("Batch size must be at least 2, got {0}")]
    BatchSizeTooSmall(usize),

    #[error("Batch size {batch_size} exceeds sequence length {length}")]
    BatchExceedsSequence { batch_size: usize, length: usize },

    #[error("k = {k} neighbors requested but the frame has {points} points")]
    TooManyNeighbors { k: usize, points: usize },

    #[error("Estimator returned {got} motions for a window, expected {expected}")]
    EstimatorContract { expected: usize, got: usize },

    #[error("Motion mask is required for filtering")]
    MissingMotionMask,

    #[error("{what} has {found} entries, expected {expected}")]
    PointCountMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Frame index {index} out of range for sequence of length {length}")]
    FrameIndexOutOfRange { index: usize, length: usize },

    #[error("Invalid frame range {start}..{end} for sequence of length {length}")]
    InvalidFrameRange {
        start: usize,
        end: usize,
        length: usize,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Estimator error: {0}")]
    Estimator(#[source] EstimatorError),

    #[error("Data error: {0}")]
    Data(#[from] triad_data::DataError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
