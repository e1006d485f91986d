//! Per-frame camera metadata for fixed-camera video datasets.

use crate::error::DataError;
use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Metadata of one camera at one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraFrameMeta {
    pub image_height: u32,
    pub image_width: u32,
    /// Horizontal field of view in radians.
    pub fov_x: f64,
    /// Vertical field of view in radians.
    pub fov_y: f64,
    /// World-to-camera rotation (column-major when serialized).
    pub rotation: DMat3,
    pub translation: DVec3,
    /// Observation reference, usually the image path for this frame.
    pub image_path: PathBuf,
}

/// Source of camera metadata for a multi-camera video sequence.
pub trait CameraDataset {
    /// Camera metadata laid out frame-major: `metas[frame][camera]`.
    fn camera_metas(&self) -> Vec<Vec<CameraFrameMeta>>;
}

/// JSON camera manifest.
///
/// ```json
/// { "frames": [ [ { "image_height": 480, ... }, ... ], ... ] }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CameraManifest {
    pub frames: Vec<Vec<CameraFrameMeta>>,
}

impl CameraManifest {
    /// Load a manifest from a JSON file.
    ///
    /// Every frame must list the same number of cameras. Relative image paths are
    /// resolved against the manifest's directory.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut manifest: CameraManifest = serde_json::from_reader(BufReader::new(file))?;

        if let Some(root) = path.parent() {
            for meta in manifest.frames.iter_mut().flatten() {
                if meta.image_path.is_relative() {
                    meta.image_path = root.join(&meta.image_path);
                }
            }
        }

        manifest.validate()?;
        info!(
            "Loaded camera manifest: {} frames, {} cameras",
            manifest.frames.len(),
            manifest.camera_count()
        );
        Ok(manifest)
    }

    /// Number of cameras per frame (0 for an empty manifest).
    pub fn camera_count(&self) -> usize {
        self.frames.first().map_or(0, Vec::len)
    }

    fn validate(&self) -> Result<(), DataError> {
        let expected = self.camera_count();
        for (frame, cameras) in self.frames.iter().enumerate() {
            if cameras.len() != expected {
                return Err(DataError::CameraCountMismatch {
                    frame,
                    expected,
                    found: cameras.len(),
                });
            }
        }
        debug!("Manifest camera rows consistent");
        Ok(())
    }
}

impl CameraDataset for CameraManifest {
    fn camera_metas(&self) -> Vec<Vec<CameraFrameMeta>> {
        self.frames.clone()
    }
}
