//! Triad Tracking Crate
//!
//! Tracks a dynamic Gaussian point cloud through a multi-view video sequence.
//! Motions between consecutive frames are estimated in windows of frames by a
//! pluggable estimator, then applied to a base frame that is replaced at the
//! end of every window.
//!
//! ## Modules
//!
//! - [`view`]: Fixed-camera frame sequences and their slicing
//! - [`scheduler`]: Window placement and per-transition motion streaming
//! - [`neighbors`]: k-nearest-neighbor graph over a base frame
//! - [`filter`]: Weighted median filtering of motion fields
//! - [`compensator`]: Applying motions and swapping base frames
//! - [`pipeline`]: The end-to-end [`Tracker`]

pub mod compensator;
pub mod config;
pub mod error;
pub mod estimator;
pub mod filter;
pub mod motion;
pub mod neighbors;
pub mod pipeline;
pub mod scheduler;
pub mod view;

pub use compensator::{FilteredMotion, MotionApplier, MotionCompensator, RawMotion, apply_motion};
pub use config::{CompensationMode, TrackerConfig};
pub use error::{EstimatorError, TrackError};
pub use estimator::{BatchMotionEstimator, ReplayMotionEstimator};
pub use filter::SpatialMotionFilter;
pub use motion::Motion;
pub use neighbors::NeighborGraph;
pub use pipeline::{TrackedFrame, Tracker};
pub use scheduler::{WindowPlan, WindowedMotionScheduler};
pub use view::{FrameSequenceView, ViewCollection};
