//! k-nearest-neighbor graph over a base frame.

use crate::error::TrackError;
use glam::{Mat3, Vec3};
use rstar::RTree;
use rstar::primitives::PointWithData;
use tracing::debug;
use triad_data::GaussianCloud;

type IndexedPoint = PointWithData<usize, [f32; 3]>;

/// Per-point neighborhoods of one base-frame snapshot.
///
/// All per-neighbor data is stored row-major with `k` entries per point. The
/// graph describes exactly the snapshot it was built from and has to be rebuilt
/// whenever the base frame is replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborGraph {
    k: usize,
    indices: Vec<usize>,
    distances: Vec<f32>,
    weights: Vec<f32>,
    offsets_world: Vec<Vec3>,
    offsets_local: Vec<Vec3>,
    rotations: Vec<Mat3>,
    rotations_inv: Vec<Mat3>,
}

impl NeighborGraph {
    /// Build the graph for `frame` with `k` neighbors per point (self excluded).
    #[tracing::instrument(skip(frame), fields(points = frame.len()))]
    pub fn build(frame: &GaussianCloud, k: usize) -> Result<Self, TrackError> {
        let n = frame.len();
        if k > 0 && k >= n {
            return Err(TrackError::TooManyNeighbors { k, points: n });
        }

        let positions = frame.positions();
        let tree = RTree::bulk_load(
            positions
                .iter()
                .enumerate()
                .map(|(i, p)| IndexedPoint::new(i, p.to_array()))
                .collect(),
        );

        let mut indices = Vec::with_capacity(n * k);
        let mut distances = Vec::with_capacity(n * k);
        for (i, p) in positions.iter().enumerate() {
            let query = p.to_array();
            for neighbor in tree
                .nearest_neighbor_iter(&query)
                .filter(|q| q.data != i)
                .take(k)
            {
                indices.push(neighbor.data);
                distances.push(positions[neighbor.data].distance(*p));
            }
        }

        // each row is scaled to unit norm so weights only reflect relative proximity
        let weights = distances
            .chunks(k.max(1))
            .flat_map(|row| {
                let norm = row.iter().map(|d| d * d).sum::<f32>().sqrt().max(1e-12);
                row.iter().map(move |d| (-d / norm).exp())
            })
            .collect();

        let offsets_world: Vec<Vec3> = indices
            .iter()
            .enumerate()
            .map(|(slot, &j)| positions[j] - positions[slot / k])
            .collect();

        let rotations: Vec<Mat3> = frame
            .orientations()
            .into_iter()
            .map(Mat3::from_quat)
            .collect();
        let rotations_inv: Vec<Mat3> = rotations.iter().map(|r| r.transpose()).collect();

        let offsets_local = offsets_world
            .iter()
            .enumerate()
            .map(|(slot, &offset)| rotations_inv[slot / k] * offset)
            .collect();

        debug!("Built neighbor graph: {} points, k = {}", n, k);
        Ok(Self {
            k,
            indices,
            distances,
            weights,
            offsets_world,
            offsets_local,
            rotations,
            rotations_inv,
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of points the graph was built for.
    pub fn len(&self) -> usize {
        self.rotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rotations.is_empty()
    }

    fn row(&self, i: usize) -> std::ops::Range<usize> {
        i * self.k..(i + 1) * self.k
    }

    /// Indices of the `k` nearest neighbors of point `i`, closest first.
    pub fn neighbor_indices(&self, i: usize) -> &[usize] {
        &self.indices[self.row(i)]
    }

    /// Euclidean distances to the neighbors of point `i`.
    pub fn neighbor_distances(&self, i: usize) -> &[f32] {
        &self.distances[self.row(i)]
    }

    /// Similarity weights `exp(-d / |d|)` of the neighbors of point `i`.
    pub fn neighbor_weights(&self, i: usize) -> &[f32] {
        &self.weights[self.row(i)]
    }

    /// `position[neighbor] - position[i]` in world coordinates.
    pub fn neighbor_offsets_world(&self, i: usize) -> &[Vec3] {
        &self.offsets_world[self.row(i)]
    }

    /// Neighbor offsets expressed in point `i`'s own orientation frame.
    pub fn neighbor_offsets_local(&self, i: usize) -> &[Vec3] {
        &self.offsets_local[self.row(i)]
    }

    pub fn rotation_matrix(&self, i: usize) -> Mat3 {
        self.rotations[i]
    }

    pub fn rotation_matrix_inverse(&self, i: usize) -> Mat3 {
        self.rotations_inv[i]
    }
}
