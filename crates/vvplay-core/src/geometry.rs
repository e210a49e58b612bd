//! Placement of a point cloud in the scene.

use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Default uniform scale for captured clips (millimetre units to scene units).
pub const DEFAULT_SCALE: f32 = 0.002;

/// Object transform handed to the renderer.
///
/// Rotation is stored as Euler angles in degrees, applied Y, then X, then Z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub offset: Vec3,
    pub rotation_deg: Vec3,
    pub scale: Vec3,
}

impl Transform {
    /// Identity transform (unit scale, no rotation or offset).
    pub const IDENTITY: Self = Self {
        offset: Vec3::ZERO,
        rotation_deg: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    /// Default placement with the given offset.
    pub fn at(offset: Vec3) -> Self {
        Self {
            offset,
            ..Self::default()
        }
    }

    /// Replace the rotation (degrees).
    pub fn with_rotation(mut self, rotation_deg: Vec3) -> Self {
        self.rotation_deg = rotation_deg;
        self
    }

    /// Replace the scale with a uniform one.
    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// Rotation as a quaternion.
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(
            EulerRot::YXZ,
            self.rotation_deg.y.to_radians(),
            self.rotation_deg.x.to_radians(),
            self.rotation_deg.z.to_radians(),
        )
    }

    /// Model matrix for GPU upload.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation(), self.offset)
    }

    /// Transform a single point.
    #[inline]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.to_matrix().transform_point3(point)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            offset: Vec3::ZERO,
            rotation_deg: Vec3::ZERO,
            scale: Vec3::splat(DEFAULT_SCALE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scale() {
        let t = Transform::default();
        let p = t.transform_point(Vec3::new(500.0, 1000.0, 0.0));
        assert!((p.x - 1.0).abs() < 1e-5);
        assert!((p.y - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_offset_applied_after_scale() {
        let t = Transform::at(Vec3::new(1.0, 0.0, -2.0)).with_uniform_scale(2.0);
        let p = t.transform_point(Vec3::new(1.0, 1.0, 1.0));
        assert!((p - Vec3::new(3.0, 2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_rotation_degrees() {
        let t = Transform::IDENTITY.with_rotation(Vec3::new(0.0, 90.0, 0.0));
        let p = t.transform_point(Vec3::X);
        // +X rotated 90 degrees about Y lands on -Z
        assert!((p - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn test_serde_defaults() {
        let t: Transform = serde_json::from_str("{}").unwrap();
        assert_eq!(t, Transform::default());
    }
}
