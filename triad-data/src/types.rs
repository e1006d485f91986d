//! Core data types for Gaussian snapshots.
//!
//! These are CPU-side representations used throughout the triad ecosystem.

use glam::{Quat, Vec3};

/// A 3D Gaussian splat (CPU representation).
///
/// This represents an anisotropic Gaussian with position, orientation, scale, color, and opacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gaussian {
    /// Center position in world space.
    pub position: Vec3,
    /// Rotation quaternion (x, y, z, w).
    pub rotation: [f32; 4],
    /// Per-axis scale (x, y, z).
    pub scale: Vec3,
    /// RGB color (linear, 0-1 range).
    pub color: Vec3,
    /// Opacity (0-1).
    pub opacity: f32,
}

impl Gaussian {
    /// Create a new Gaussian with all parameters.
    pub fn new(position: Vec3, rotation: [f32; 4], scale: Vec3, color: Vec3, opacity: f32) -> Self {
        Self {
            position,
            rotation,
            scale,
            color,
            opacity,
        }
    }

    /// Create a spherical Gaussian (uniform scale, identity rotation).
    pub fn spherical(position: Vec3, radius: f32, color: Vec3, opacity: f32) -> Self {
        Self {
            position,
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: Vec3::splat(radius),
            color,
            opacity,
        }
    }

    /// Orientation as a normalized quaternion.
    ///
    /// Degenerate (zero-length) rotations fall back to identity.
    pub fn orientation(&self) -> Quat {
        let [x, y, z, w] = self.rotation;
        let q = Quat::from_xyzw(x, y, z, w);
        if q.length_squared() > f32::EPSILON {
            q.normalize()
        } else {
            Quat::IDENTITY
        }
    }

    /// Replace the orientation, storing it as (x, y, z, w).
    pub fn set_orientation(&mut self, q: Quat) {
        self.rotation = [q.x, q.y, q.z, q.w];
    }
}

impl Default for Gaussian {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: Vec3::splat(0.01),
            color: Vec3::splat(0.8),
            opacity: 1.0,
        }
    }
}

/// A full snapshot of a Gaussian scene at one time step.
///
/// Cloning produces an independent copy; nothing is shared between snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GaussianCloud {
    pub gaussians: Vec<Gaussian>,
}

impl GaussianCloud {
    pub fn new(gaussians: Vec<Gaussian>) -> Self {
        Self { gaussians }
    }

    /// Build a cloud of identity-oriented Gaussians at the given positions.
    pub fn from_positions(positions: &[Vec3]) -> Self {
        Self {
            gaussians: positions
                .iter()
                .map(|&p| Gaussian::spherical(p, 0.01, Vec3::splat(0.8), 1.0))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.gaussians.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gaussians.is_empty()
    }

    /// Point positions (N x 3).
    pub fn positions(&self) -> Vec<Vec3> {
        self.gaussians.iter().map(|g| g.position).collect()
    }

    /// Point orientations (N normalized quaternions).
    pub fn orientations(&self) -> Vec<Quat> {
        self.gaussians.iter().map(Gaussian::orientation).collect()
    }
}

impl From<Vec<Gaussian>> for GaussianCloud {
    fn from(gaussians: Vec<Gaussian>) -> Self {
        Self::new(gaussians)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaussian_orientation_normalized() {
        let g = Gaussian::new(Vec3::ZERO, [0.0, 0.0, 0.0, 2.0], Vec3::ONE, Vec3::ONE, 1.0);
        let q = g.orientation();
        assert!((q.length() - 1.0).abs() < 1e-6);
        assert!(q.abs_diff_eq(Quat::IDENTITY, 1e-6));
    }

    #[test]
    fn test_gaussian_degenerate_orientation() {
        let g = Gaussian::new(Vec3::ZERO, [0.0; 4], Vec3::ONE, Vec3::ONE, 1.0);
        assert_eq!(g.orientation(), Quat::IDENTITY);
    }

    #[test]
    fn test_set_orientation_roundtrip() {
        let mut g = Gaussian::default();
        let q = Quat::from_rotation_z(0.5);
        g.set_orientation(q);
        assert!(g.orientation().abs_diff_eq(q, 1e-6));
    }

    #[test]
    fn test_cloud_clone_is_independent() {
        let cloud = GaussianCloud::from_positions(&[Vec3::ZERO, Vec3::X]);
        let mut copy = cloud.clone();
        copy.gaussians[0].position = Vec3::splat(5.0);
        assert_eq!(cloud.gaussians[0].position, Vec3::ZERO);
        assert_eq!(copy.len(), 2);
    }

    #[test]
    fn test_cloud_positions() {
        let cloud = GaussianCloud::from_positions(&[Vec3::new(1.0, 2.0, 3.0)]);
        assert_eq!(cloud.positions(), vec![Vec3::new(1.0, 2.0, 3.0)]);
        assert_eq!(cloud.orientations(), vec![Quat::IDENTITY]);
    }
}
