//! Tunable constants for the vehicle controller and structural lattice
//!
//! Every struct deserializes with missing fields falling back to the
//! reference values, so a config file only needs the fields it changes.

use std::f32::consts::PI;
use std::path::Path;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{BeamDriveError, ConfigError, Result};
use crate::vehicle::debug::DebugOptions;

/// Bicycle-model controller and chassis body configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    /// Distance between front and rear axle (meters)
    pub wheel_base: f32,
    /// Maximum front-wheel angle (radians)
    pub max_steer_angle: f32,
    /// Distance moved per reference frame at full throttle
    pub speed_per_unit_throttle: f32,
    /// Frame rate the per-frame speed is expressed against (Hz)
    pub reference_rate: f32,
    /// Velocity fraction removed per tick at full brake
    pub brake_strength: f32,
    /// Fraction of lateral velocity kept per tick
    pub lateral_retention: f32,
    /// Below this front-wheel angle (radians) yaw is not integrated
    pub steer_epsilon: f32,
    /// Below this per-frame speed yaw is not integrated
    pub speed_epsilon: f32,
    /// Chassis body mass
    pub chassis_mass: f32,
    /// Chassis box half extents (x, y, z)
    pub chassis_half_extents: [f32; 3],
    /// Where the chassis spawns and returns on reset
    pub spawn_position: [f32; 3],
    /// Chassis height below which it is lifted back up
    pub ride_height_floor: f32,
    /// Height the chassis is lifted to
    pub ride_height_reset: f32,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            wheel_base: 2.6,
            max_steer_angle: PI / 6.0, // 30 degrees
            speed_per_unit_throttle: 0.2,
            reference_rate: 60.0,
            brake_strength: 0.4,
            lateral_retention: 0.95,
            steer_epsilon: 0.001,
            speed_epsilon: 0.01,
            chassis_mass: 1000.0,
            chassis_half_extents: [0.9, 0.6, 2.0],
            spawn_position: [0.0, 2.0, 0.0],
            ride_height_floor: 0.5,
            ride_height_reset: 1.0,
        }
    }
}

impl VehicleConfig {
    pub fn with_wheel_base(mut self, wheel_base: f32) -> Self {
        self.wheel_base = wheel_base;
        self
    }

    pub fn with_max_steer_angle(mut self, max_steer_angle: f32) -> Self {
        self.max_steer_angle = max_steer_angle;
        self
    }

    pub fn with_speed_per_unit_throttle(mut self, speed: f32) -> Self {
        self.speed_per_unit_throttle = speed;
        self
    }

    pub fn with_brake_strength(mut self, brake_strength: f32) -> Self {
        self.brake_strength = brake_strength;
        self
    }

    pub fn with_lateral_retention(mut self, lateral_retention: f32) -> Self {
        self.lateral_retention = lateral_retention;
        self
    }

    pub fn with_spawn_position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.spawn_position = [x, y, z];
        self
    }

    pub fn with_chassis(mut self, mass: f32, half_extents: [f32; 3]) -> Self {
        self.chassis_mass = mass;
        self.chassis_half_extents = half_extents;
        self
    }

    pub fn spawn_position(&self) -> Vector3<f32> {
        Vector3::from(self.spawn_position)
    }

    pub fn chassis_half_extents(&self) -> Vector3<f32> {
        Vector3::from(self.chassis_half_extents)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        ConfigError::check_positive("wheel_base", self.wheel_base)?;
        ConfigError::check_positive("max_steer_angle", self.max_steer_angle)?;
        ConfigError::check_non_negative("speed_per_unit_throttle", self.speed_per_unit_throttle)?;
        ConfigError::check_positive("reference_rate", self.reference_rate)?;
        ConfigError::check_range("brake_strength", self.brake_strength, 0.0, 1.0)?;
        ConfigError::check_range("lateral_retention", self.lateral_retention, 0.0, 1.0)?;
        ConfigError::check_non_negative("steer_epsilon", self.steer_epsilon)?;
        ConfigError::check_non_negative("speed_epsilon", self.speed_epsilon)?;
        ConfigError::check_positive("chassis_mass", self.chassis_mass)?;
        for half_extent in self.chassis_half_extents {
            ConfigError::check_positive("chassis_half_extents", half_extent)?;
        }
        for coordinate in self.spawn_position {
            if !coordinate.is_finite() {
                return Err(ConfigError::NotFinite {
                    field: "spawn_position",
                    value: coordinate,
                });
            }
        }
        ConfigError::check_non_negative("ride_height_floor", self.ride_height_floor)?;
        ConfigError::check_non_negative("ride_height_reset", self.ride_height_reset)?;
        Ok(())
    }
}

/// Node-beam lattice configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatticeConfig {
    /// Stress at 100% strain
    pub max_stress: f32,
    /// Stress above which a beam fails
    pub break_threshold: f32,
    /// Upper bound of the aggregate damage metric
    pub max_damage_cap: f32,
    /// Per-beam stress that maps to one unit of damage
    pub damage_scale: f32,
    /// Stiffness of the beam distance constraints
    pub beam_stiffness: f32,
    /// Collision radius of each node body
    pub node_radius: f32,
    /// Factor applied to both endpoint masses when a beam fails
    pub mass_loss_factor: f32,
    /// Node mass never drops below this
    pub min_node_mass: f32,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            max_stress: 10_000.0,
            break_threshold: 15_000.0,
            max_damage_cap: 100.0,
            damage_scale: 1_000.0,
            beam_stiffness: 1e6,
            node_radius: 0.05,
            mass_loss_factor: 0.5,
            min_node_mass: 0.05,
        }
    }
}

impl LatticeConfig {
    pub fn with_stress_limits(mut self, max_stress: f32, break_threshold: f32) -> Self {
        self.max_stress = max_stress;
        self.break_threshold = break_threshold;
        self
    }

    pub fn with_max_damage_cap(mut self, cap: f32) -> Self {
        self.max_damage_cap = cap;
        self
    }

    pub fn with_beam_stiffness(mut self, stiffness: f32) -> Self {
        self.beam_stiffness = stiffness;
        self
    }

    pub fn with_min_node_mass(mut self, min_node_mass: f32) -> Self {
        self.min_node_mass = min_node_mass;
        self
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        ConfigError::check_positive("max_stress", self.max_stress)?;
        ConfigError::check_positive("break_threshold", self.break_threshold)?;
        ConfigError::check_positive("max_damage_cap", self.max_damage_cap)?;
        ConfigError::check_positive("damage_scale", self.damage_scale)?;
        ConfigError::check_positive("beam_stiffness", self.beam_stiffness)?;
        ConfigError::check_positive("node_radius", self.node_radius)?;
        ConfigError::check_positive("mass_loss_factor", self.mass_loss_factor)?;
        ConfigError::check_range("mass_loss_factor", self.mass_loss_factor, 0.0, 1.0)?;
        ConfigError::check_non_negative("min_node_mass", self.min_node_mass)?;
        Ok(())
    }
}

/// Complete configuration of one simulated vehicle
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub vehicle: VehicleConfig,
    pub lattice: LatticeConfig,
    pub debug: DebugOptions,
}

impl SimulationConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.vehicle.validate()?;
        self.lattice.validate()
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.toml`, `.yaml` or `.yml` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| BeamDriveError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text),
            other => Err(BeamDriveError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }
}
