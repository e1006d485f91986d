//! Windowed scheduling of batch motion estimation.
//!
//! The frame sequence is cut into windows of `batch_size` frames that share one
//! frame at each boundary. Each window is estimated once and its motions are
//! handed out one transition at a time.

use crate::error::TrackError;
use crate::estimator::BatchMotionEstimator;
use crate::motion::Motion;
use crate::view::{FrameSequenceView, ViewCollection};
use std::ops::{Range, RangeBounds};
use tracing::{debug, info};
use triad_data::GaussianCloud;

/// Window placement over a sequence of `sequence_len` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlan {
    batch_size: usize,
    sequence_len: usize,
}

impl WindowPlan {
    pub fn new(batch_size: usize, sequence_len: usize) -> Result<Self, TrackError> {
        if batch_size < 2 {
            return Err(TrackError::BatchSizeTooSmall(batch_size));
        }
        if batch_size > sequence_len {
            return Err(TrackError::BatchExceedsSequence {
                batch_size,
                length: sequence_len,
            });
        }
        Ok(Self {
            batch_size,
            sequence_len,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn sequence_len(&self) -> usize {
        self.sequence_len
    }

    /// Number of frame transitions, i.e. motions produced over a full pass.
    pub fn transition_count(&self) -> usize {
        self.sequence_len - 1
    }

    /// Number of distinct windows, i.e. estimator invocations per pass.
    pub fn window_count(&self) -> usize {
        self.transition_count().div_ceil(self.batch_size - 1)
    }

    /// First frame of the window that covers transition `t -> t + 1`.
    ///
    /// Windows are laid back to back with one shared frame; the last window is
    /// shifted left so it ends exactly at the final frame.
    pub fn window_start(&self, transition: usize) -> usize {
        let step = self.batch_size - 1;
        let start = (transition / step) * step;
        if start + self.batch_size > self.sequence_len {
            self.sequence_len - self.batch_size
        } else {
            start
        }
    }

    /// Frames covered by the window that covers `transition`.
    pub fn window(&self, transition: usize) -> Range<usize> {
        let start = self.window_start(transition);
        start..start + self.batch_size
    }
}

/// Motions of the window currently being handed out.
#[derive(Debug, Default)]
struct WindowCache {
    start: Option<usize>,
    motions: Vec<Motion>,
}

/// Forward-only stream of per-transition motions backed by a batch estimator.
///
/// The estimator is only invoked when a transition falls into a window other
/// than the cached one. The last motion of every window is flagged with
/// `update_baseframe`.
pub struct WindowedMotionScheduler<E> {
    views: ViewCollection,
    estimator: E,
    plan: WindowPlan,
    next_transition: usize,
    cache: WindowCache,
    invocations: usize,
}

impl<E: BatchMotionEstimator> WindowedMotionScheduler<E> {
    pub fn new(views: ViewCollection, estimator: E, batch_size: usize) -> Result<Self, TrackError> {
        let plan = WindowPlan::new(batch_size, views.sequence_len())?;
        info!(
            "Scheduler over {} views, {} frames, batch size {} ({} windows)",
            views.view_count(),
            plan.sequence_len(),
            batch_size,
            plan.window_count()
        );
        Ok(Self {
            views,
            estimator,
            plan,
            next_transition: 0,
            cache: WindowCache::default(),
            invocations: 0,
        })
    }

    pub fn plan(&self) -> WindowPlan {
        self.plan
    }

    pub fn views(&self) -> &ViewCollection {
        &self.views
    }

    /// Every view narrowed to `range`, for inspection.
    pub fn frames(
        &self,
        range: impl RangeBounds<usize> + Clone,
    ) -> Result<Vec<FrameSequenceView>, TrackError> {
        self.views.slice(range)
    }

    /// Every view narrowed to frame `index`, for inspection.
    pub fn frame(&self, index: usize) -> Result<Vec<FrameSequenceView>, TrackError> {
        self.views.frame(index)
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    pub fn estimator_mut(&mut self) -> &mut E {
        &mut self.estimator
    }

    /// Number of estimator invocations since construction.
    pub fn invocations(&self) -> usize {
        self.invocations
    }

    /// Index of the transition the next call to [`Self::next_motion`] yields.
    pub fn position(&self) -> usize {
        self.next_transition
    }

    /// Restart from the first transition and drop the cached window.
    pub fn rewind(&mut self) -> &mut Self {
        self.next_transition = 0;
        self.cache = WindowCache::default();
        self
    }

    /// Forward a base-frame replacement to the estimator.
    pub fn update_baseframe(&mut self, frame: &GaussianCloud) -> Result<(), TrackError> {
        self.estimator
            .update_baseframe(frame)
            .map_err(TrackError::Estimator)
    }

    /// Motion for the next transition, or `None` once the sequence is exhausted.
    pub fn next_motion(&mut self) -> Result<Option<Motion>, TrackError> {
        let transition = self.next_transition;
        if transition >= self.plan.transition_count() {
            return Ok(None);
        }

        let start = self.plan.window_start(transition);
        if self.cache.start != Some(start) {
            self.cache = self.estimate_window(start)?;
        }

        // each cached motion is handed out exactly once per pass
        let motion = std::mem::take(&mut self.cache.motions[transition - start]);
        self.next_transition += 1;
        Ok(Some(motion))
    }

    fn estimate_window(&mut self, start: usize) -> Result<WindowCache, TrackError> {
        let batch_size = self.plan.batch_size();
        let window = self.views.slice(start..start + batch_size)?;
        debug!("Estimating window {}..{}", start, start + batch_size);

        let mut motions = self
            .estimator
            .estimate(&window, batch_size)
            .map_err(TrackError::Estimator)?;
        self.invocations += 1;

        if motions.len() != batch_size - 1 {
            return Err(TrackError::EstimatorContract {
                expected: batch_size - 1,
                got: motions.len(),
            });
        }
        if let Some(last) = motions.last_mut() {
            last.update_baseframe = true;
        }
        Ok(WindowCache {
            start: Some(start),
            motions,
        })
    }
}

impl<E: BatchMotionEstimator> Iterator for WindowedMotionScheduler<E> {
    type Item = Result<Motion, TrackError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_motion().transpose()
    }
}
