//! Lateral grip correction
//!
//! Bleeds off sideways sliding after the solver step. Velocity is split
//! into components along the vehicle's forward and right axes; the lateral
//! part is scaled by the retention factor, the forward part and the
//! vertical component pass through unchanged.

use nalgebra::Vector3;

use super::controller::{forward_axis, right_axis};
use crate::config::VehicleConfig;
use crate::error::ConfigError;

/// Scales the lateral velocity component by a fixed retention factor
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LateralGripCorrector {
    lateral_retention: f32,
}

impl LateralGripCorrector {
    pub fn new(lateral_retention: f32) -> Result<Self, ConfigError> {
        ConfigError::check_range("lateral_retention", lateral_retention, 0.0, 1.0)?;
        Ok(Self { lateral_retention })
    }

    pub fn from_config(config: &VehicleConfig) -> Result<Self, ConfigError> {
        Self::new(config.lateral_retention)
    }

    pub fn lateral_retention(&self) -> f32 {
        self.lateral_retention
    }

    pub fn correct(&self, yaw: f32, velocity: Vector3<f32>) -> Vector3<f32> {
        let forward = forward_axis(yaw);
        let right = right_axis(yaw);

        let forward_speed = velocity.dot(&forward);
        let lateral_speed = velocity.dot(&right);

        let mut corrected =
            forward * forward_speed + right * (lateral_speed * self.lateral_retention);
        corrected.y = velocity.y;
        corrected
    }
}

impl Default for LateralGripCorrector {
    fn default() -> Self {
        Self {
            lateral_retention: VehicleConfig::default().lateral_retention,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pure_lateral_velocity_is_damped() {
        let grip = LateralGripCorrector::default();
        let corrected = grip.correct(0.0, Vector3::new(5.0, 0.0, 0.0));
        assert_relative_eq!(corrected, Vector3::new(4.75, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_forward_velocity_passes_through() {
        let grip = LateralGripCorrector::default();
        let yaw = 0.8;
        let velocity = forward_axis(yaw) * 12.0;
        assert_relative_eq!(grip.correct(yaw, velocity), velocity, epsilon = 1e-5);
    }

    #[test]
    fn test_vertical_component_preserved() {
        let grip = LateralGripCorrector::default();
        let corrected = grip.correct(-1.1, Vector3::new(3.0, -7.5, 2.0));
        assert_eq!(corrected.y, -7.5);
    }

    #[test]
    fn test_rotated_heading() {
        // Facing +X: world X is forward, world Z is lateral
        let grip = LateralGripCorrector::new(0.5).unwrap();
        let corrected = grip.correct(std::f32::consts::FRAC_PI_2, Vector3::new(4.0, 0.0, 2.0));
        assert_relative_eq!(corrected, Vector3::new(4.0, 0.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_retention_is_validated() {
        assert!(LateralGripCorrector::new(1.5).is_err());
        assert!(LateralGripCorrector::new(-0.1).is_err());
        assert!(LateralGripCorrector::new(1.0).is_ok());
    }
}
