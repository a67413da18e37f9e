//! Math utilities and types
//!
//! Block-grid and world-space types used by the simulation.

use serde::{Deserialize, Serialize};

pub use nalgebra::{Quaternion, Unit, UnitQuaternion, Vector3};

/// 3D vector type (world space)
pub type Vec3 = Vector3<f32>;

/// Integer 3D vector type (block-grid space)
pub type Vec3i = Vector3<i32>;

/// Quaternion type for rotations
pub type Quat = UnitQuaternion<f32>;

/// Convert a block-grid coordinate into a world position
///
/// The world position of a block is its grid coordinate scaled by the block
/// size.
#[inline]
pub fn block_to_world(block: &Vec3i, block_size: f32) -> Vec3 {
    block.map(|c| c as f32) * block_size
}

/// Linear interpolation between two values
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Move `current` toward `target` by `rate` of the remaining distance
#[inline]
pub fn ease_toward(current: &Vec3, target: &Vec3, rate: f32) -> Vec3 {
    current + (target - current) * rate
}

/// Linear RGB color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red channel (0.0 - 1.0)
    pub r: f32,
    /// Green channel (0.0 - 1.0)
    pub g: f32,
    /// Blue channel (0.0 - 1.0)
    pub b: f32,
}

impl Color {
    /// White
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);

    /// Create a color from its channels
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Gray with all channels set to `value`
    pub const fn gray(value: f32) -> Self {
        Self::new(value, value, value)
    }

    /// Channel-wise product, used for tinting
    pub fn tint(self, other: Self) -> Self {
        Self::new(self.r * other.r, self.g * other.g, self.b * other.b)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_block_to_world() {
        let world = block_to_world(&Vec3i::new(2, -1, 3), 0.5);
        assert_relative_eq!(world, Vec3::new(1.0, -0.5, 1.5));
    }

    #[test]
    fn test_color_tint() {
        let tinted = Color::gray(0.8).tint(Color::new(1.0, 0.0, 0.0));
        assert_eq!(tinted, Color::new(0.8, 0.0, 0.0));
    }

    #[test]
    fn test_ease_toward() {
        let eased = ease_toward(&Vec3::zeros(), &Vec3::new(10.0, 0.0, -10.0), 0.1);
        assert_relative_eq!(eased, Vec3::new(1.0, 0.0, -1.0));
    }
}
