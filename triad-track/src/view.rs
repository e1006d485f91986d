//! Fixed-camera frame sequences.
//!
//! A [`FrameSequenceView`] describes one physical camera that never moves, plus
//! the ordered observation references it recorded. All views of a dataset share
//! the same timeline, which [`ViewCollection`] enforces.

use crate::error::TrackError;
use glam::{DMat3, DVec3};
use std::ops::{Bound, Range, RangeBounds};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use triad_data::{CameraDataset, CameraFrameMeta};

/// Tolerance for the field-of-view comparison across frames.
const FOV_TOLERANCE: f64 = 1e-8;
const REL_TOLERANCE: f64 = 1e-5;
const ABS_TOLERANCE: f64 = 1e-8;

fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= ABS_TOLERANCE + REL_TOLERANCE * b.abs()
}

fn all_close(a: &[f64], b: &[f64]) -> bool {
    a.iter().zip(b).all(|(&x, &y)| is_close(x, y))
}

/// One fixed camera and its ordered frame references.
///
/// Cloning and slicing share the underlying reference list; a slice only narrows
/// the visible index range.
#[derive(Debug, Clone)]
pub struct FrameSequenceView {
    pub image_height: u32,
    pub image_width: u32,
    pub fov_x: f64,
    pub fov_y: f64,
    pub rotation: DMat3,
    pub translation: DVec3,
    frame_refs: Arc<[PathBuf]>,
    range: Range<usize>,
}

impl FrameSequenceView {
    /// Build a view from the per-frame metadata of a single camera.
    ///
    /// Fails if any frame disagrees with the first one on intrinsics or extrinsics,
    /// since the camera is assumed not to move.
    pub fn from_camera_frames(camera: usize, frames: &[CameraFrameMeta]) -> Result<Self, TrackError> {
        let first = frames.first().ok_or(TrackError::EmptyDataset)?;

        for (frame, meta) in frames.iter().enumerate().skip(1) {
            let mismatch = |field| TrackError::ViewMismatch {
                camera,
                frame,
                field,
            };
            if meta.image_height != first.image_height {
                return Err(mismatch("image_height"));
            }
            if meta.image_width != first.image_width {
                return Err(mismatch("image_width"));
            }
            if (meta.fov_x - first.fov_x).abs() >= FOV_TOLERANCE {
                return Err(mismatch("fov_x"));
            }
            if (meta.fov_y - first.fov_y).abs() >= FOV_TOLERANCE {
                return Err(mismatch("fov_y"));
            }
            if !all_close(&meta.rotation.to_cols_array(), &first.rotation.to_cols_array()) {
                return Err(mismatch("rotation"));
            }
            if !all_close(&meta.translation.to_array(), &first.translation.to_array()) {
                return Err(mismatch("translation"));
            }
        }

        let frame_refs: Arc<[PathBuf]> = frames.iter().map(|m| m.image_path.clone()).collect();
        Ok(Self {
            image_height: first.image_height,
            image_width: first.image_width,
            fov_x: first.fov_x,
            fov_y: first.fov_y,
            rotation: first.rotation,
            translation: first.translation,
            range: 0..frame_refs.len(),
            frame_refs,
        })
    }

    /// Observation references visible through this view.
    pub fn frame_refs(&self) -> &[PathBuf] {
        &self.frame_refs[self.range.clone()]
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// A copy of this view narrowed to `range` (relative to this view).
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Result<Self, TrackError> {
        let length = self.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => length,
        };
        if start > end || end > length {
            return Err(TrackError::InvalidFrameRange { start, end, length });
        }
        Ok(Self {
            range: self.range.start + start..self.range.start + end,
            ..self.clone()
        })
    }

    /// A copy of this view holding only frame `index`.
    pub fn frame(&self, index: usize) -> Result<Self, TrackError> {
        if index >= self.len() {
            return Err(TrackError::FrameIndexOutOfRange {
                index,
                length: self.len(),
            });
        }
        self.slice(index..index + 1)
    }
}

/// All fixed views of one dataset, sharing a single timeline.
#[derive(Debug, Clone)]
pub struct ViewCollection {
    views: Vec<FrameSequenceView>,
    sequence_len: usize,
}

impl ViewCollection {
    /// Wrap already-built views. All views must have the same length.
    pub fn new(views: Vec<FrameSequenceView>) -> Result<Self, TrackError> {
        let sequence_len = views.first().ok_or(TrackError::EmptyDataset)?.len();
        for (view, v) in views.iter().enumerate() {
            if v.len() != sequence_len {
                return Err(TrackError::SequenceLengthMismatch {
                    view,
                    expected: sequence_len,
                    found: v.len(),
                });
            }
        }
        if sequence_len == 0 {
            return Err(TrackError::EmptyDataset);
        }
        Ok(Self {
            views,
            sequence_len,
        })
    }

    /// Build views from frame-major dataset metadata (`metas[frame][camera]`).
    pub fn from_dataset(dataset: &impl CameraDataset) -> Result<Self, TrackError> {
        Self::from_frame_major(&dataset.camera_metas())
    }

    pub fn from_frame_major(metas: &[Vec<CameraFrameMeta>]) -> Result<Self, TrackError> {
        let cameras = metas.iter().map(Vec::len).max().unwrap_or(0);
        if cameras == 0 {
            return Err(TrackError::EmptyDataset);
        }

        let views = (0..cameras)
            .map(|camera| {
                let frames: Vec<CameraFrameMeta> = metas
                    .iter()
                    .filter_map(|row| row.get(camera).cloned())
                    .collect();
                if frames.len() != metas.len() {
                    return Err(TrackError::SequenceLengthMismatch {
                        view: camera,
                        expected: metas.len(),
                        found: frames.len(),
                    });
                }
                FrameSequenceView::from_camera_frames(camera, &frames)
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "Built {} fixed views over {} frames",
            views.len(),
            metas.len()
        );
        Self::new(views)
    }

    pub fn views(&self) -> &[FrameSequenceView] {
        &self.views
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    /// Shared number of frames across all views.
    pub fn sequence_len(&self) -> usize {
        self.sequence_len
    }

    /// Every view narrowed to frame `index`.
    pub fn frame(&self, index: usize) -> Result<Vec<FrameSequenceView>, TrackError> {
        self.views.iter().map(|v| v.frame(index)).collect()
    }

    /// Every view narrowed to `range`.
    pub fn slice(
        &self,
        range: impl RangeBounds<usize> + Clone,
    ) -> Result<Vec<FrameSequenceView>, TrackError> {
        self.views.iter().map(|v| v.slice(range.clone())).collect()
    }
}
