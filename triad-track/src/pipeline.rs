//! End-to-end tracking loop.

use crate::compensator::{MotionApplier, MotionCompensator};
use crate::config::TrackerConfig;
use crate::error::TrackError;
use crate::estimator::BatchMotionEstimator;
use crate::scheduler::WindowedMotionScheduler;
use crate::view::ViewCollection;
use tracing::{debug, info};
use triad_data::GaussianCloud;

/// One reconstructed snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedFrame {
    /// Index of the frame this snapshot corresponds to (1-based over transitions).
    pub index: usize,
    pub frame: GaussianCloud,
    /// Whether this snapshot replaced the base frame.
    pub baseframe_updated: bool,
}

/// Drives a scheduler and a compensator in lock step.
///
/// Each step pulls one motion and applies it, so the tracker yields one
/// snapshot per frame transition.
pub struct Tracker<E, A> {
    scheduler: WindowedMotionScheduler<E>,
    compensator: MotionCompensator<A>,
}

impl<E, A> Tracker<E, A>
where
    E: BatchMotionEstimator,
    A: MotionApplier,
{
    /// Pair `scheduler` with `compensator`; the estimator is told about the
    /// compensator's initial base frame.
    pub fn new(
        mut scheduler: WindowedMotionScheduler<E>,
        compensator: MotionCompensator<A>,
    ) -> Result<Self, TrackError> {
        scheduler.update_baseframe(compensator.baseframe())?;
        Ok(Self {
            scheduler,
            compensator,
        })
    }

    pub fn scheduler(&self) -> &WindowedMotionScheduler<E> {
        &self.scheduler
    }

    pub fn compensator(&self) -> &MotionCompensator<A> {
        &self.compensator
    }

    pub fn estimator(&self) -> &E {
        self.scheduler.estimator()
    }

    /// Reconstruct the next snapshot, or `None` at the end of the sequence.
    pub fn step(&mut self) -> Result<Option<TrackedFrame>, TrackError> {
        let index = self.scheduler.position() + 1;
        let Some(motion) = self.scheduler.next_motion()? else {
            info!("Tracking finished after {} frames", index - 1);
            return Ok(None);
        };

        let frame = self
            .compensator
            .compensate(&motion, self.scheduler.estimator_mut())?;
        debug!(
            "Frame {}: {} points{}",
            index,
            frame.len(),
            if motion.update_baseframe { " (new base frame)" } else { "" }
        );
        Ok(Some(TrackedFrame {
            index,
            frame,
            baseframe_updated: motion.update_baseframe,
        }))
    }
}

impl<E: BatchMotionEstimator> Tracker<E, Box<dyn MotionApplier>> {
    /// Build a tracker from `config`, starting at `baseframe`.
    pub fn from_config(
        views: ViewCollection,
        estimator: E,
        baseframe: GaussianCloud,
        config: &TrackerConfig,
    ) -> Result<Self, TrackError> {
        config.validate()?;
        let scheduler = WindowedMotionScheduler::new(views, estimator, config.batch_size)?;
        let compensator = MotionCompensator::new(baseframe, config.neighbors, config.applier())?;
        Self::new(scheduler, compensator)
    }
}

impl<E, A> Iterator for Tracker<E, A>
where
    E: BatchMotionEstimator,
    A: MotionApplier,
{
    type Item = Result<TrackedFrame, TrackError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.step().transpose()
    }
}
