//! Neighborhood median filtering of motion fields.
//!
//! The median is taken per component (x, y and z independently). Each neighbor
//! contributes with its graph weight scaled by its own mask confidence, and the
//! result is blended with the raw translation by the point's mask:
//! `out = lerp(median, raw, mask)`.

use crate::error::TrackError;
use crate::motion::Motion;
use crate::neighbors::NeighborGraph;
use glam::Vec3;
use ordered_float::OrderedFloat;
use tracing::debug;

/// Keeps neighbors with zero confidence from vanishing out of the median.
const CONFIDENCE_FLOOR: f32 = 1e-3;

/// Weighted median of `(value, weight)` pairs.
///
/// Returns the smallest value at which the cumulative weight reaches half of
/// the total weight.
pub fn weighted_median(samples: &mut [(f32, f32)]) -> Option<f32> {
    samples.sort_by_key(|&(v, _)| OrderedFloat(v));
    let total: f32 = samples.iter().map(|&(_, w)| w).sum();
    let half = total * 0.5;
    let mut acc = 0.0;
    for &(v, w) in samples.iter() {
        acc += w;
        if acc >= half {
            return Some(v);
        }
    }
    samples.last().map(|&(v, _)| v)
}

/// Weighted median filter over the neighbor graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialMotionFilter {
    k: usize,
}

impl SpatialMotionFilter {
    /// `k` is the number of nearest neighbors taken from each graph row.
    pub fn new(k: usize) -> Self {
        Self { k }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Filter a translation field.
    ///
    /// `motion_mask_mean` is required: points with confidence 1 keep their raw
    /// translation, points with confidence 0 take the neighborhood median.
    /// Inputs are never modified.
    pub fn filter(
        &self,
        translation: &[Vec3],
        motion_mask_mean: Option<&[f32]>,
        graph: &NeighborGraph,
    ) -> Result<Vec<Vec3>, TrackError> {
        let mask = motion_mask_mean.ok_or(TrackError::MissingMotionMask)?;
        if translation.len() != graph.len() {
            return Err(TrackError::PointCountMismatch {
                what: "translation field",
                expected: graph.len(),
                found: translation.len(),
            });
        }
        if mask.len() != graph.len() {
            return Err(TrackError::PointCountMismatch {
                what: "motion mask",
                expected: graph.len(),
                found: mask.len(),
            });
        }
        if self.k > graph.k() {
            return Err(TrackError::Config(format!(
                "filter uses {} neighbors but the graph only has {}",
                self.k,
                graph.k()
            )));
        }

        debug!("Filtering {} translations over {} neighbors", translation.len(), self.k);

        let mut samples = Vec::with_capacity(self.k);
        let filtered = (0..translation.len())
            .map(|i| {
                let neighbors = &graph.neighbor_indices(i)[..self.k];
                let weights = &graph.neighbor_weights(i)[..self.k];
                let mut median = [0.0f32; 3];
                for (axis, slot) in median.iter_mut().enumerate() {
                    samples.clear();
                    samples.extend(neighbors.iter().zip(weights).map(|(&j, &w)| {
                        let confidence = mask[j].clamp(0.0, 1.0) + CONFIDENCE_FLOOR;
                        (translation[j][axis], w * confidence)
                    }));
                    match weighted_median(&mut samples) {
                        Some(v) => *slot = v,
                        None => return translation[i],
                    }
                }
                Vec3::from_array(median).lerp(translation[i], mask[i].clamp(0.0, 1.0))
            })
            .collect();
        Ok(filtered)
    }

    /// A copy of `motion` with its translation field filtered.
    pub fn filter_motion(
        &self,
        motion: &Motion,
        graph: &NeighborGraph,
    ) -> Result<Motion, TrackError> {
        let translation_vector = self.filter(
            &motion.translation_vector,
            motion.motion_mask_mean.as_deref(),
            graph,
        )?;
        Ok(Motion {
            translation_vector,
            ..motion.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triad_data::GaussianCloud;

    fn line(n: usize) -> GaussianCloud {
        GaussianCloud::from_positions(
            &(0..n)
                .map(|i| Vec3::new(i as f32, 0.0, 0.0))
                .collect::<Vec<_>>(),
        )
    }

    fn noisy_field(n: usize) -> Vec<Vec3> {
        (0..n)
            .map(|i| Vec3::new(1.0, (i % 3) as f32 * 0.1, -(i as f32) * 0.01))
            .collect()
    }

    #[test]
    fn test_weighted_median() {
        let mut samples = vec![(3.0, 1.0), (1.0, 1.0), (2.0, 1.0)];
        assert_eq!(weighted_median(&mut samples), Some(2.0));

        let mut heavy = vec![(0.0, 1.0), (10.0, 5.0), (1.0, 1.0)];
        assert_eq!(weighted_median(&mut heavy), Some(10.0));

        assert_eq!(weighted_median(&mut []), None);
    }

    #[test]
    fn test_full_confidence_keeps_raw() {
        let frame = line(10);
        let graph = NeighborGraph::build(&frame, 4).unwrap();
        let raw = noisy_field(10);
        let mask = vec![1.0; 10];
        let out = SpatialMotionFilter::new(4)
            .filter(&raw, Some(mask.as_slice()), &graph)
            .unwrap();
        for (a, b) in out.iter().zip(&raw) {
            assert!(a.abs_diff_eq(*b, 1e-6));
        }
    }

    #[test]
    fn test_zero_confidence_takes_neighborhood_median() {
        let frame = line(9);
        let graph = NeighborGraph::build(&frame, 2).unwrap();
        let mut raw = vec![Vec3::new(0.5, 0.0, 0.0); 9];
        // a single outlier is replaced by what its neighbors agree on
        raw[4] = Vec3::new(50.0, -3.0, 7.0);
        let mask = vec![0.0; 9];
        let out = SpatialMotionFilter::new(2)
            .filter(&raw, Some(mask.as_slice()), &graph)
            .unwrap();
        assert!(out[4].abs_diff_eq(Vec3::new(0.5, 0.0, 0.0), 1e-6));
        assert!(out[0].abs_diff_eq(Vec3::new(0.5, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn test_zero_confidence_ignores_own_value() {
        let frame = line(6);
        let graph = NeighborGraph::build(&frame, 2).unwrap();
        let mask = vec![0.0; 6];
        let mut a = vec![Vec3::ONE; 6];
        let mut b = a.clone();
        a[2] = Vec3::splat(-4.0);
        b[2] = Vec3::splat(9.0);
        let filter = SpatialMotionFilter::new(2);
        let out_a = filter.filter(&a, Some(mask.as_slice()), &graph).unwrap();
        let out_b = filter.filter(&b, Some(mask.as_slice()), &graph).unwrap();
        assert_eq!(out_a[2], out_b[2]);
    }

    #[test]
    fn test_partial_confidence_interpolates() {
        let frame = line(5);
        let graph = NeighborGraph::build(&frame, 2).unwrap();
        let mut raw = vec![Vec3::ZERO; 5];
        raw[2] = Vec3::new(4.0, 0.0, 0.0);
        let filter = SpatialMotionFilter::new(2);

        let mut previous = -1.0;
        for step in 0..=4 {
            let mut mask = vec![1.0; 5];
            mask[2] = step as f32 / 4.0;
            let out = filter.filter(&raw, Some(mask.as_slice()), &graph).unwrap();
            assert!(out[2].x >= previous);
            previous = out[2].x;
        }
        assert!((previous - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_filter_does_not_mutate_inputs() {
        let frame = line(8);
        let graph = NeighborGraph::build(&frame, 3).unwrap();
        let motion = Motion::from_translation(noisy_field(8)).with_mask(vec![0.3; 8]);
        let before = motion.clone();
        let graph_before = graph.clone();
        let filtered = SpatialMotionFilter::new(3).filter_motion(&motion, &graph).unwrap();
        assert_eq!(motion, before);
        assert_eq!(graph, graph_before);
        assert_eq!(filtered.motion_mask_mean, before.motion_mask_mean);
        assert_ne!(filtered.translation_vector, before.translation_vector);
    }

    #[test]
    fn test_missing_mask_is_fatal() {
        let frame = line(4);
        let graph = NeighborGraph::build(&frame, 2).unwrap();
        let motion = Motion::from_translation(vec![Vec3::ZERO; 4]);
        assert!(matches!(
            SpatialMotionFilter::new(2).filter_motion(&motion, &graph),
            Err(TrackError::MissingMotionMask)
        ));
    }

    #[test]
    fn test_length_mismatch() {
        let frame = line(4);
        let graph = NeighborGraph::build(&frame, 2).unwrap();
        let err = SpatialMotionFilter::new(2)
            .filter(&[Vec3::ZERO; 3], Some(&[1.0; 3][..]), &graph)
            .unwrap_err();
        assert!(matches!(err, TrackError::PointCountMismatch { expected: 4, found: 3, .. }));
    }

    #[test]
    fn test_filter_k_bounded_by_graph() {
        let frame = line(4);
        let graph = NeighborGraph::build(&frame, 2).unwrap();
        assert!(SpatialMotionFilter::new(3)
            .filter(&[Vec3::ZERO; 4], Some(&[1.0; 4][..]), &graph)
            .is_err());
    }
}
