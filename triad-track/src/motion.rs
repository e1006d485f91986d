//! Per-point motion between consecutive frames.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Motion of every point of a base frame for one frame transition.
///
/// Only `translation_vector` is mandatory. The optional per-point fields must
/// have the same length as the translation field when present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    pub translation_vector: Vec<Vec3>,
    /// Rotation delta applied on the left of each point's orientation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_quaternion: Option<Vec<Quat>>,
    /// Multiplicative per-axis scale change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaling_modifier: Option<Vec<Vec3>>,
    /// Estimation confidence per point, in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion_mask_mean: Option<Vec<f32>>,
    /// Set on the last motion of each estimation window; the base frame is
    /// replaced after this motion is applied.
    #[serde(default)]
    pub update_baseframe: bool,
}

impl Motion {
    pub fn from_translation(translation_vector: Vec<Vec3>) -> Self {
        Self {
            translation_vector,
            ..Default::default()
        }
    }

    pub fn with_mask(mut self, mask: Vec<f32>) -> Self {
        self.motion_mask_mean = Some(mask);
        self
    }

    pub fn with_rotation(mut self, rotation: Vec<Quat>) -> Self {
        self.rotation_quaternion = Some(rotation);
        self
    }

    pub fn with_scaling(mut self, scaling: Vec<Vec3>) -> Self {
        self.scaling_modifier = Some(scaling);
        self
    }

    /// Number of points this motion describes.
    pub fn len(&self) -> usize {
        self.translation_vector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translation_vector.is_empty()
    }
}
