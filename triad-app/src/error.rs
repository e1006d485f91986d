//! Error types for the tracking command.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Data loading error: {0}")]
    Data(#[from] triad_data::DataError),

    #[error("Tracking error: {0}")]
    Track(#[from] triad_track::TrackError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
