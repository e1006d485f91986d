//! Batch motion estimation interface.

use crate::error::{EstimatorError, TrackError};
use crate::motion::Motion;
use crate::view::{FrameSequenceView, ViewCollection};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use triad_data::GaussianCloud;

/// Estimates the motion of the current base frame over a window of frames.
///
/// Implementations may keep internal state tied to the base frame, which is why
/// the compensator reports every base-frame replacement through
/// [`BatchMotionEstimator::update_baseframe`].
pub trait BatchMotionEstimator {
    /// Estimate `batch_size - 1` motions, one per consecutive frame pair of the window.
    ///
    /// Every view in `views` is narrowed to the same `batch_size` frames.
    fn estimate(
        &mut self,
        views: &[FrameSequenceView],
        batch_size: usize,
    ) -> Result<Vec<Motion>, EstimatorError>;

    /// Called after the base frame has been replaced by `frame`.
    fn update_baseframe(&mut self, frame: &GaussianCloud) -> Result<(), EstimatorError>;
}

impl<E: BatchMotionEstimator + ?Sized> BatchMotionEstimator for Box<E> {
    fn estimate(
        &mut self,
        views: &[FrameSequenceView],
        batch_size: usize,
    ) -> Result<Vec<Motion>, EstimatorError> {
        (**self).estimate(views, batch_size)
    }

    fn update_baseframe(&mut self, frame: &GaussianCloud) -> Result<(), EstimatorError> {
        (**self).update_baseframe(frame)
    }
}

/// Serves precomputed motions, one per frame transition.
///
/// Windows are located by the first frame reference of the first view, so the
/// estimator works with any window placement.
#[derive(Debug, Clone)]
pub struct ReplayMotionEstimator {
    frame_refs: Vec<PathBuf>,
    motions: Vec<Motion>,
    baseframe_updates: usize,
}

impl ReplayMotionEstimator {
    /// `frame_refs` is the full reference list of one view; `motions[t]` moves
    /// frame `t` to frame `t + 1`.
    pub fn new(frame_refs: Vec<PathBuf>, motions: Vec<Motion>) -> Result<Self, TrackError> {
        if motions.len() + 1 != frame_refs.len() {
            return Err(TrackError::PointCountMismatch {
                what: "replay motion list",
                expected: frame_refs.len().saturating_sub(1),
                found: motions.len(),
            });
        }
        Ok(Self {
            frame_refs,
            motions,
            baseframe_updates: 0,
        })
    }

    /// Load motions from a JSON array, keyed by the first view of `views`.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>, views: &ViewCollection) -> Result<Self, TrackError> {
        let file = File::open(path.as_ref())?;
        let motions: Vec<Motion> = serde_json::from_reader(BufReader::new(file))?;
        info!("Loaded {} replay motions", motions.len());
        let frame_refs = views.views()[0].frame_refs().to_vec();
        Self::new(frame_refs, motions)
    }

    /// How many base-frame updates have been reported so far.
    pub fn baseframe_updates(&self) -> usize {
        self.baseframe_updates
    }
}

impl BatchMotionEstimator for ReplayMotionEstimator {
    fn estimate(
        &mut self,
        views: &[FrameSequenceView],
        batch_size: usize,
    ) -> Result<Vec<Motion>, EstimatorError> {
        let first = views
            .first()
            .and_then(|v| v.frame_refs().first())
            .ok_or("empty estimation window")?;
        let start = self
            .frame_refs
            .iter()
            .position(|r| r == first)
            .ok_or_else(|| format!("unknown frame reference {}", first.display()))?;
        let end = start + batch_size.saturating_sub(1);
        if end > self.motions.len() {
            return Err(Box::new(TrackError::InvalidFrameRange {
                start,
                end,
                length: self.motions.len(),
            }));
        }

        debug!("Replaying motions {}..{}", start, end);
        Ok(self.motions[start..end]
            .iter()
            .cloned()
            .map(|m| Motion {
                update_baseframe: false,
                ..m
            })
            .collect())
    }

    fn update_baseframe(&mut self, frame: &GaussianCloud) -> Result<(), EstimatorError> {
        self.baseframe_updates += 1;
        debug!("Replay estimator saw base frame with {} points", frame.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::tests::frame_major;
    use glam::Vec3;

    fn replay(frames: usize) -> (ViewCollection, ReplayMotionEstimator) {
        let views = ViewCollection::from_frame_major(&frame_major(1, frames)).unwrap();
        let motions = (0..frames - 1)
            .map(|t| Motion::from_translation(vec![Vec3::splat(t as f32)]))
            .collect();
        let estimator =
            ReplayMotionEstimator::new(views.views()[0].frame_refs().to_vec(), motions).unwrap();
        (views, estimator)
    }

    #[test]
    fn test_replay_window() {
        let (views, mut estimator) = replay(6);
        let window = views.slice(2..5).unwrap();
        let motions = estimator.estimate(&window, 3).unwrap();
        assert_eq!(motions.len(), 2);
        assert_eq!(motions[0].translation_vector[0], Vec3::splat(2.0));
        assert_eq!(motions[1].translation_vector[0], Vec3::splat(3.0));
    }

    #[test]
    fn test_replay_unknown_frame() {
        let (_, mut estimator) = replay(4);
        let other = ViewCollection::from_frame_major(&frame_major(3, 4)).unwrap();
        // camera 2 references are not part of the replay list
        let window = vec![other.views()[2].slice(0..2).unwrap()];
        assert!(estimator.estimate(&window, 2).is_err());
    }

    #[test]
    fn test_replay_length_checked() {
        let refs = vec![PathBuf::from("a"), PathBuf::from("b")];
        assert!(ReplayMotionEstimator::new(refs, Vec::new()).is_err());
    }

    #[test]
    fn test_replay_counts_updates() {
        let (_, mut estimator) = replay(3);
        estimator
            .update_baseframe(&GaussianCloud::from_positions(&[Vec3::ZERO]))
            .unwrap();
        assert_eq!(estimator.baseframe_updates(), 1);
    }
}
