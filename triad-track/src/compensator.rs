//! Applying motions to base frames.
//!
//! How a motion is turned into a new snapshot is a [`MotionApplier`] strategy:
//! [`RawMotion`] applies it as estimated, [`FilteredMotion`] median-filters the
//! translation field over the neighbor graph first. [`MotionCompensator`] owns
//! the base frame and its graph, and swaps both whenever a motion carries the
//! `update_baseframe` flag.

use crate::error::TrackError;
use crate::estimator::BatchMotionEstimator;
use crate::filter::SpatialMotionFilter;
use crate::motion::Motion;
use crate::neighbors::NeighborGraph;
use tracing::{debug, info};
use triad_data::GaussianCloud;

fn check_len(what: &'static str, expected: usize, found: usize) -> Result<(), TrackError> {
    if expected != found {
        return Err(TrackError::PointCountMismatch {
            what,
            expected,
            found,
        });
    }
    Ok(())
}

/// Apply `motion` to `frame` in place.
///
/// Positions are translated, orientations are left-multiplied by the rotation
/// delta and renormalized, scales are multiplied by the scaling modifier.
pub fn apply_motion(frame: &mut GaussianCloud, motion: &Motion) -> Result<(), TrackError> {
    let n = frame.len();
    check_len("translation field", n, motion.translation_vector.len())?;
    if let Some(rotation) = &motion.rotation_quaternion {
        check_len("rotation field", n, rotation.len())?;
    }
    if let Some(scaling) = &motion.scaling_modifier {
        check_len("scaling field", n, scaling.len())?;
    }

    for (i, g) in frame.gaussians.iter_mut().enumerate() {
        g.position += motion.translation_vector[i];
        if let Some(rotation) = &motion.rotation_quaternion {
            g.set_orientation((rotation[i] * g.orientation()).normalize());
        }
        if let Some(scaling) = &motion.scaling_modifier {
            g.scale *= scaling[i];
        }
    }
    Ok(())
}

/// Strategy for turning a motion into the next snapshot.
pub trait MotionApplier {
    /// Produce the snapshot reached by applying `motion` to `base`.
    ///
    /// `base` must not be modified; `graph` describes `base`.
    fn apply(
        &self,
        base: &GaussianCloud,
        graph: &NeighborGraph,
        motion: &Motion,
    ) -> Result<GaussianCloud, TrackError>;
}

/// Applies motions exactly as estimated.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawMotion;

impl MotionApplier for RawMotion {
    fn apply(
        &self,
        base: &GaussianCloud,
        _graph: &NeighborGraph,
        motion: &Motion,
    ) -> Result<GaussianCloud, TrackError> {
        let mut frame = base.clone();
        apply_motion(&mut frame, motion)?;
        Ok(frame)
    }
}

/// Median-filters the translation field before applying it.
#[derive(Debug, Clone, Copy)]
pub struct FilteredMotion {
    filter: SpatialMotionFilter,
}

impl FilteredMotion {
    pub fn new(filter: SpatialMotionFilter) -> Self {
        Self { filter }
    }
}

impl MotionApplier for FilteredMotion {
    fn apply(
        &self,
        base: &GaussianCloud,
        graph: &NeighborGraph,
        motion: &Motion,
    ) -> Result<GaussianCloud, TrackError> {
        let filtered = self.filter.filter_motion(motion, graph)?;
        RawMotion.apply(base, graph, &filtered)
    }
}

impl<A: MotionApplier + ?Sized> MotionApplier for Box<A> {
    fn apply(
        &self,
        base: &GaussianCloud,
        graph: &NeighborGraph,
        motion: &Motion,
    ) -> Result<GaussianCloud, TrackError> {
        (**self).apply(base, graph, motion)
    }
}

/// Owner of the current base frame and its neighbor graph.
pub struct MotionCompensator<A> {
    applier: A,
    k: usize,
    baseframe: GaussianCloud,
    graph: NeighborGraph,
    rebuilds: usize,
}

impl<A: MotionApplier> MotionCompensator<A> {
    /// Start from `baseframe`, building its graph with `k` neighbors per point.
    pub fn new(baseframe: GaussianCloud, k: usize, applier: A) -> Result<Self, TrackError> {
        let graph = NeighborGraph::build(&baseframe, k)?;
        Ok(Self {
            applier,
            k,
            baseframe,
            graph,
            rebuilds: 1,
        })
    }

    pub fn baseframe(&self) -> &GaussianCloud {
        &self.baseframe
    }

    pub fn graph(&self) -> &NeighborGraph {
        &self.graph
    }

    /// Number of neighbor graph builds so far, including the initial one.
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    /// Apply `motion` to the base frame and return the resulting snapshot.
    ///
    /// If the motion is flagged with `update_baseframe`, the result becomes the
    /// new base frame, the graph is rebuilt from it, and `estimator` is notified
    /// once the swap is complete.
    pub fn compensate<E>(&mut self, motion: &Motion, estimator: &mut E) -> Result<GaussianCloud, TrackError>
    where
        E: BatchMotionEstimator + ?Sized,
    {
        let frame = self.applier.apply(&self.baseframe, &self.graph, motion)?;
        if motion.update_baseframe {
            self.update_baseframe(frame.clone(), estimator)?;
        }
        Ok(frame)
    }

    /// Adopt `frame` as the base frame.
    pub fn update_baseframe<E>(&mut self, frame: GaussianCloud, estimator: &mut E) -> Result<(), TrackError>
    where
        E: BatchMotionEstimator + ?Sized,
    {
        // build first so a failed rebuild leaves the previous pair intact
        let graph = NeighborGraph::build(&frame, self.k)?;
        self.baseframe = frame;
        self.graph = graph;
        self.rebuilds += 1;
        debug!("Base frame replaced ({} points)", self.baseframe.len());

        estimator
            .update_baseframe(&self.baseframe)
            .map_err(TrackError::Estimator)?;
        info!("Base frame update #{} propagated", self.rebuilds - 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EstimatorError;
    use crate::view::FrameSequenceView;
    use glam::{Quat, Vec3};

    /// Records the base frames it is notified about.
    #[derive(Default)]
    struct Recorder {
        seen: Vec<GaussianCloud>,
    }

    impl BatchMotionEstimator for Recorder {
        fn estimate(
            &mut self,
            _views: &[FrameSequenceView],
            _batch_size: usize,
        ) -> Result<Vec<Motion>, EstimatorError> {
            Ok(Vec::new())
        }

        fn update_baseframe(&mut self, frame: &GaussianCloud) -> Result<(), EstimatorError> {
            self.seen.push(frame.clone());
            Ok(())
        }
    }

    fn cloud() -> GaussianCloud {
        GaussianCloud::from_positions(&[
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
            Vec3::Z,
            Vec3::ONE,
        ])
    }

    #[test]
    fn test_apply_motion_all_fields() {
        let mut frame = GaussianCloud::from_positions(&[Vec3::ZERO]);
        let q = Quat::from_rotation_x(0.3);
        let motion = Motion::from_translation(vec![Vec3::new(1.0, 2.0, 3.0)])
            .with_rotation(vec![q])
            .with_scaling(vec![Vec3::splat(2.0)]);
        apply_motion(&mut frame, &motion).unwrap();
        let g = frame.gaussians[0];
        assert_eq!(g.position, Vec3::new(1.0, 2.0, 3.0));
        assert!(g.orientation().abs_diff_eq(q, 1e-6));
        assert_eq!(g.scale, Vec3::splat(0.02));
    }

    #[test]
    fn test_apply_motion_length_checked() {
        let mut frame = cloud();
        let motion = Motion::from_translation(vec![Vec3::ZERO; 2]);
        assert!(matches!(
            apply_motion(&mut frame, &motion),
            Err(TrackError::PointCountMismatch { expected: 5, found: 2, .. })
        ));
    }

    #[test]
    fn test_compensate_without_update_keeps_state() {
        let mut compensator = MotionCompensator::new(cloud(), 2, RawMotion).unwrap();
        let mut recorder = Recorder::default();
        let base_before = compensator.baseframe().clone();
        let graph_before = compensator.graph().clone();

        let motion = Motion::from_translation(vec![Vec3::X; 5]);
        let frame = compensator.compensate(&motion, &mut recorder).unwrap();

        assert_eq!(frame.gaussians[0].position, Vec3::X);
        assert_eq!(compensator.baseframe(), &base_before);
        assert_eq!(compensator.graph(), &graph_before);
        assert_eq!(compensator.rebuilds(), 1);
        assert!(recorder.seen.is_empty());
    }

    #[test]
    fn test_compensate_with_update_swaps_and_notifies() {
        let mut compensator = MotionCompensator::new(cloud(), 2, RawMotion).unwrap();
        let mut recorder = Recorder::default();

        let motion = Motion {
            update_baseframe: true,
            ..Motion::from_translation(vec![Vec3::splat(0.5); 5])
        };
        let frame = compensator.compensate(&motion, &mut recorder).unwrap();

        assert_eq!(compensator.baseframe(), &frame);
        assert_eq!(compensator.graph().len(), frame.len());
        assert_eq!(compensator.rebuilds(), 2);
        assert_eq!(recorder.seen, vec![frame.clone()]);
        assert_eq!(
            compensator.graph(),
            &NeighborGraph::build(&frame, 2).unwrap()
        );
    }

    #[test]
    fn test_compensate_never_mutates_input_frame() {
        let base = cloud();
        let graph = NeighborGraph::build(&base, 2).unwrap();
        let motion = Motion::from_translation(vec![Vec3::ONE; 5]).with_mask(vec![0.5; 5]);
        let filtered = FilteredMotion::new(SpatialMotionFilter::new(2));
        let next = filtered.apply(&base, &graph, &motion).unwrap();
        assert_eq!(base, cloud());
        // uniform motion is unchanged by the median filter
        for (a, b) in next.gaussians.iter().zip(&base.gaussians) {
            assert!((a.position - b.position).abs_diff_eq(Vec3::ONE, 1e-6));
        }
    }

    #[test]
    fn test_filtered_requires_mask() {
        let mut compensator =
            MotionCompensator::new(cloud(), 2, FilteredMotion::new(SpatialMotionFilter::new(2)))
                .unwrap();
        let motion = Motion::from_translation(vec![Vec3::ONE; 5]);
        assert!(matches!(
            compensator.compensate(&motion, &mut Recorder::default()),
            Err(TrackError::MissingMotionMask)
        ));
    }

    #[test]
    fn test_failed_rebuild_keeps_previous_base() {
        let mut compensator = MotionCompensator::new(cloud(), 4, RawMotion).unwrap();
        let mut recorder = Recorder::default();
        let err = compensator
            .update_baseframe(GaussianCloud::from_positions(&[Vec3::ZERO; 3]), &mut recorder)
            .unwrap_err();
        assert!(matches!(err, TrackError::TooManyNeighbors { k: 4, points: 3 }));
        assert_eq!(compensator.baseframe(), &cloud());
        assert!(recorder.seen.is_empty());
    }

    #[test]
    fn test_boxed_applier() {
        let applier: Box<dyn MotionApplier> = Box::new(RawMotion);
        let mut compensator = MotionCompensator::new(cloud(), 1, applier).unwrap();
        let frame = compensator
            .compensate(&Motion::from_translation(vec![Vec3::Y; 5]), &mut Recorder::default())
            .unwrap();
        assert_eq!(frame.gaussians[1].position, Vec3::X + Vec3::Y);
    }
}
