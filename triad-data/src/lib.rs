//! Triad Data Crate
//!
//! Data loading utilities for Gaussian snapshots and fixed-camera metadata.
//! This crate is GPU-agnostic and focuses on data parsing.

pub mod camera;
pub mod error;
pub mod ply;
pub mod types;

pub use camera::{CameraDataset, CameraFrameMeta, CameraManifest};
pub use error::DataError;
pub use ply::load_gaussians_from_ply;
pub use types::{Gaussian, GaussianCloud};
